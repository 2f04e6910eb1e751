//! Manifest Store
//!
//! The manifest is the single source of truth for "have we seen this before".
//! It holds two record kinds:
//!
//! - [`FileRecord`]: one per `file_id`, remembering the content signature the
//!   file had when it was last processed successfully.
//! - [`FingerprintRecord`]: one per text fingerprint, remembering the labels
//!   the content was first accepted under. First acceptance wins.
//!
//! # Thread Safety
//!
//! All methods take `&self`; implementations must be internally synchronized.
//! Share a store as `Arc<dyn ManifestStore>`.
//!
//! # Uniqueness
//!
//! Fingerprint uniqueness must be enforced by the store's write path, not only
//! by the caller's `is_duplicate_fingerprint` check. Two workers racing on the
//! same content must see one insert succeed and the other fail with
//! [`ManifestError::DuplicateFingerprint`].

mod error;
mod memory;

pub use error::{ManifestError, ManifestResult};
pub use memory::InMemoryManifestStore;

use crate::fingerprint::Fingerprint;
use crate::signature::ContentSignature;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing state of one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: String,
    pub language: String,
    pub category: String,
    pub content_signature: ContentSignature,
    pub last_processed_at: DateTime<Utc>,
}

/// Dedup record for one accepted text unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub fingerprint: Fingerprint,
    pub language: String,
    pub category: String,
}

impl FingerprintRecord {
    pub fn new(
        fingerprint: Fingerprint,
        language: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            fingerprint,
            language: language.into(),
            category: category.into(),
        }
    }
}

/// Aggregate counts over the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestStats {
    /// Number of file records
    pub files: u64,
    /// Number of fingerprint records
    pub fingerprints: u64,
    /// Fingerprint counts per label pair, ordered by language then category
    pub by_label: Vec<LabelCount>,
}

/// Number of fingerprints accepted under one `(language, category)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub language: String,
    pub category: String,
    pub fingerprints: u64,
}

/// Durable storage for file and fingerprint records
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// True iff a file record exists for `file_id` with exactly this signature
    async fn has_unchanged_file(
        &self,
        file_id: &str,
        content_signature: &ContentSignature,
    ) -> ManifestResult<bool>;

    /// Write or overwrite the file record for `file_id`
    ///
    /// Idempotent: repeated calls with the same arguments leave exactly one
    /// record. `last_processed_at` is set to the current time.
    async fn upsert_file(
        &self,
        file_id: &str,
        language: &str,
        category: &str,
        content_signature: &ContentSignature,
    ) -> ManifestResult<()>;

    /// True iff a fingerprint record exists
    async fn is_duplicate_fingerprint(&self, fingerprint: Fingerprint) -> ManifestResult<bool>;

    /// Insert new fingerprint records
    ///
    /// All-or-nothing: if any record is already present (or appears twice in
    /// the batch) nothing is inserted and
    /// [`ManifestError::DuplicateFingerprint`] is returned.
    ///
    /// Callers await this to completion, so implementations must bound their
    /// own waits, and nothing may be committed once an error is returned.
    async fn record_fingerprints(&self, records: &[FingerprintRecord]) -> ManifestResult<()>;

    /// Look up the file record for `file_id`
    async fn get_file(&self, file_id: &str) -> ManifestResult<Option<FileRecord>>;

    /// Aggregate counts, used for status reporting
    async fn stats(&self) -> ManifestResult<ManifestStats>;
}
