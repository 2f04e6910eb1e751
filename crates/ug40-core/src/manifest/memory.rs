//! In-memory manifest store
//!
//! Useful for tests and dry runs. All data is lost when the last clone is
//! dropped.

use super::{
    FileRecord, FingerprintRecord, LabelCount, ManifestError, ManifestResult, ManifestStats,
    ManifestStore,
};
use crate::fingerprint::Fingerprint;
use crate::signature::ContentSignature;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct ManifestState {
    files: HashMap<String, FileRecord>,
    fingerprints: HashMap<Fingerprint, FingerprintRecord>,
}

/// In-memory implementation of [`ManifestStore`]
///
/// Uses `Arc<RwLock<...>>` internally, so clones share the same storage.
/// Batch inserts check uniqueness and insert under a single write lock, which
/// gives the same all-or-nothing behaviour as a unique index.
///
/// ```rust
/// use ug40_core::fingerprint::fingerprint;
/// use ug40_core::manifest::{FingerprintRecord, InMemoryManifestStore, ManifestStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryManifestStore::new();
/// let fp = fingerprint("Hello.");
///
/// store
///     .record_fingerprints(&[FingerprintRecord::new(fp, "lug", "general_text")])
///     .await?;
/// assert!(store.is_duplicate_fingerprint(fp).await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryManifestStore {
    state: Arc<RwLock<ManifestState>>,
}

impl InMemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored file records
    pub async fn file_count(&self) -> usize {
        self.state.read().await.files.len()
    }

    /// Number of stored fingerprint records
    pub async fn fingerprint_count(&self) -> usize {
        self.state.read().await.fingerprints.len()
    }
}

#[async_trait]
impl ManifestStore for InMemoryManifestStore {
    async fn has_unchanged_file(
        &self,
        file_id: &str,
        content_signature: &ContentSignature,
    ) -> ManifestResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .files
            .get(file_id)
            .is_some_and(|rec| &rec.content_signature == content_signature))
    }

    async fn upsert_file(
        &self,
        file_id: &str,
        language: &str,
        category: &str,
        content_signature: &ContentSignature,
    ) -> ManifestResult<()> {
        let record = FileRecord {
            file_id: file_id.to_string(),
            language: language.to_string(),
            category: category.to_string(),
            content_signature: content_signature.clone(),
            last_processed_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .files
            .insert(file_id.to_string(), record);
        Ok(())
    }

    async fn is_duplicate_fingerprint(&self, fingerprint: Fingerprint) -> ManifestResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .fingerprints
            .contains_key(&fingerprint))
    }

    async fn record_fingerprints(&self, records: &[FingerprintRecord]) -> ManifestResult<()> {
        let mut state = self.state.write().await;

        let mut batch = HashSet::with_capacity(records.len());
        for record in records {
            if state.fingerprints.contains_key(&record.fingerprint)
                || !batch.insert(record.fingerprint)
            {
                return Err(ManifestError::DuplicateFingerprint(record.fingerprint));
            }
        }

        for record in records {
            state
                .fingerprints
                .insert(record.fingerprint, record.clone());
        }
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> ManifestResult<Option<FileRecord>> {
        Ok(self.state.read().await.files.get(file_id).cloned())
    }

    async fn stats(&self) -> ManifestResult<ManifestStats> {
        let state = self.state.read().await;

        let mut by_label: BTreeMap<(String, String), u64> = BTreeMap::new();
        for record in state.fingerprints.values() {
            *by_label
                .entry((record.language.clone(), record.category.clone()))
                .or_default() += 1;
        }

        Ok(ManifestStats {
            files: state.files.len() as u64,
            fingerprints: state.fingerprints.len() as u64,
            by_label: by_label
                .into_iter()
                .map(|((language, category), fingerprints)| LabelCount {
                    language,
                    category,
                    fingerprints,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;

    fn record(text: &str) -> FingerprintRecord {
        FingerprintRecord::new(fingerprint(text), "lug", "general_text")
    }

    #[tokio::test]
    async fn test_unknown_file_is_not_unchanged() {
        let store = InMemoryManifestStore::new();
        let unchanged = store
            .has_unchanged_file("lug/general_text/a.txt", &"s1".into())
            .await
            .unwrap();
        assert!(!unchanged);
    }

    #[tokio::test]
    async fn test_signature_equality_decides_unchanged() {
        let store = InMemoryManifestStore::new();
        let file_id = "lug/general_text/a.txt";

        store
            .upsert_file(file_id, "lug", "general_text", &"s1".into())
            .await
            .unwrap();

        assert!(store.has_unchanged_file(file_id, &"s1".into()).await.unwrap());
        assert!(!store.has_unchanged_file(file_id, &"s2".into()).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_instead_of_duplicating() {
        let store = InMemoryManifestStore::new();
        let file_id = "ach/language_guides/guide.md";

        for _ in 0..3 {
            store
                .upsert_file(file_id, "ach", "language_guides", &"s1".into())
                .await
                .unwrap();
        }
        store
            .upsert_file(file_id, "ach", "language_guides", &"s2".into())
            .await
            .unwrap();

        assert_eq!(store.file_count().await, 1);
        let rec = store.get_file(file_id).await.unwrap().unwrap();
        assert_eq!(rec.content_signature.as_str(), "s2");
    }

    #[tokio::test]
    async fn test_record_and_query_fingerprints() {
        let store = InMemoryManifestStore::new();
        let fp = fingerprint("Hello.");

        assert!(!store.is_duplicate_fingerprint(fp).await.unwrap());
        store.record_fingerprints(&[record("Hello.")]).await.unwrap();
        assert!(store.is_duplicate_fingerprint(fp).await.unwrap());
    }

    #[tokio::test]
    async fn test_batch_with_known_fingerprint_inserts_nothing() {
        let store = InMemoryManifestStore::new();
        store.record_fingerprints(&[record("Hello.")]).await.unwrap();

        let err = store
            .record_fingerprints(&[record("World."), record("Hello.")])
            .await
            .unwrap_err();

        assert_eq!(err, ManifestError::DuplicateFingerprint(fingerprint("Hello.")));
        assert!(!store
            .is_duplicate_fingerprint(fingerprint("World."))
            .await
            .unwrap());
        assert_eq!(store.fingerprint_count().await, 1);
    }

    #[tokio::test]
    async fn test_batch_with_internal_duplicate_inserts_nothing() {
        let store = InMemoryManifestStore::new();

        let err = store
            .record_fingerprints(&[record("A"), record("B"), record("A")])
            .await
            .unwrap_err();

        assert!(matches!(err, ManifestError::DuplicateFingerprint(_)));
        assert_eq!(store.fingerprint_count().await, 0);
    }

    #[tokio::test]
    async fn test_stats_group_by_label() {
        let store = InMemoryManifestStore::new();
        store
            .record_fingerprints(&[
                FingerprintRecord::new(fingerprint("a"), "lug", "general_text"),
                FingerprintRecord::new(fingerprint("b"), "lug", "general_text"),
                FingerprintRecord::new(fingerprint("c"), "ach", "language_guides"),
            ])
            .await
            .unwrap();
        store
            .upsert_file("lug/general_text/a.txt", "lug", "general_text", &"s".into())
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.fingerprints, 3);
        assert_eq!(
            stats.by_label,
            vec![
                LabelCount {
                    language: "ach".into(),
                    category: "language_guides".into(),
                    fingerprints: 1,
                },
                LabelCount {
                    language: "lug".into(),
                    category: "general_text".into(),
                    fingerprints: 2,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_clone_shares_storage() {
        let store1 = InMemoryManifestStore::new();
        let store2 = store1.clone();

        store1.record_fingerprints(&[record("shared")]).await.unwrap();
        assert!(store2
            .is_duplicate_fingerprint(fingerprint("shared"))
            .await
            .unwrap());
    }
}
