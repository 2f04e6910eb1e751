//! Mock Implementations for Testing
//!
//! - **Deterministic**: backed by [`InMemoryManifestStore`]
//! - **Configurable**: outages, mid-file crashes, lost insert races, latency
//!   (on every call or on inserts only)
//! - **Observable**: every trait call is counted
//!
//! # Example
//!
//! ```rust
//! use ug40_core::fingerprint::fingerprint;
//! use ug40_core::manifest::{FingerprintRecord, ManifestStore};
//! use ug40_core::test_support::mocks::MockManifestStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MockManifestStore::new();
//! store.fail_records_after(1);
//!
//! let record = |t: &str| FingerprintRecord::new(fingerprint(t), "lug", "general_text");
//! store.record_fingerprints(&[record("a")]).await?;
//! assert!(store.record_fingerprints(&[record("b")]).await.is_err());
//! assert_eq!(store.calls().record, 2);
//! # Ok(())
//! # }
//! ```

use crate::fingerprint::Fingerprint;
use crate::manifest::{
    FileRecord, FingerprintRecord, InMemoryManifestStore, ManifestError, ManifestResult,
    ManifestStats, ManifestStore,
};
use crate::signature::ContentSignature;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Per-method call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub has_unchanged: usize,
    pub upsert: usize,
    pub is_duplicate: usize,
    pub record: usize,
    pub get_file: usize,
    pub stats: usize,
}

impl MockCalls {
    /// Number of write operations attempted
    pub fn writes(&self) -> usize {
        self.upsert + self.record
    }
}

#[derive(Default)]
struct MockState {
    unavailable: bool,
    records_remaining: Option<usize>,
    lost_races: HashSet<Fingerprint>,
    delay: Option<Duration>,
    record_delay: Option<Duration>,
    calls: MockCalls,
}

/// Manifest store with fault injection
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct MockManifestStore {
    inner: InMemoryManifestStore,
    state: Arc<Mutex<MockState>>,
}

impl MockManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, for assertions that bypass fault injection
    pub fn inner(&self) -> &InMemoryManifestStore {
        &self.inner
    }

    /// Fail every call with [`ManifestError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Let `n` more `record_fingerprints` calls succeed, then fail the rest
    pub fn fail_records_after(&self, n: usize) {
        self.state.lock().records_remaining = Some(n);
    }

    /// Pretend another worker inserts `fingerprint` between the duplicate
    /// check and the insert
    pub fn lose_race_on(&self, fingerprint: Fingerprint) {
        self.state.lock().lost_races.insert(fingerprint);
    }

    /// Delay every call by `delay`
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    /// Delay `record_fingerprints` by `delay` before it commits
    pub fn set_record_delay(&self, delay: Duration) {
        self.state.lock().record_delay = Some(delay);
    }

    /// Clear all injected faults (counters are kept)
    pub fn heal(&self) {
        let mut state = self.state.lock();
        state.unavailable = false;
        state.records_remaining = None;
        state.lost_races.clear();
        state.delay = None;
        state.record_delay = None;
    }

    pub fn calls(&self) -> MockCalls {
        self.state.lock().calls
    }

    /// Count the call and apply outage/latency faults
    async fn enter(&self, count: impl FnOnce(&mut MockCalls)) -> ManifestResult<()> {
        let delay = {
            let mut state = self.state.lock();
            count(&mut state.calls);
            if state.unavailable {
                return Err(ManifestError::Unavailable("injected outage".to_string()));
            }
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl ManifestStore for MockManifestStore {
    async fn has_unchanged_file(
        &self,
        file_id: &str,
        content_signature: &ContentSignature,
    ) -> ManifestResult<bool> {
        self.enter(|c| c.has_unchanged += 1).await?;
        self.inner
            .has_unchanged_file(file_id, content_signature)
            .await
    }

    async fn upsert_file(
        &self,
        file_id: &str,
        language: &str,
        category: &str,
        content_signature: &ContentSignature,
    ) -> ManifestResult<()> {
        self.enter(|c| c.upsert += 1).await?;
        self.inner
            .upsert_file(file_id, language, category, content_signature)
            .await
    }

    async fn is_duplicate_fingerprint(&self, fingerprint: Fingerprint) -> ManifestResult<bool> {
        self.enter(|c| c.is_duplicate += 1).await?;
        if self.state.lock().lost_races.contains(&fingerprint) {
            return Ok(false);
        }
        self.inner.is_duplicate_fingerprint(fingerprint).await
    }

    async fn record_fingerprints(&self, records: &[FingerprintRecord]) -> ManifestResult<()> {
        self.enter(|c| c.record += 1).await?;
        let record_delay = self.state.lock().record_delay;
        if let Some(delay) = record_delay {
            tokio::time::sleep(delay).await;
        }

        let (exhausted, raced) = {
            let mut state = self.state.lock();
            let exhausted = match state.records_remaining.as_mut() {
                Some(0) => true,
                Some(n) => {
                    *n -= 1;
                    false
                }
                None => false,
            };
            let raced: Vec<FingerprintRecord> = records
                .iter()
                .filter(|r| state.lost_races.remove(&r.fingerprint))
                .cloned()
                .collect();
            (exhausted, raced)
        };

        if exhausted {
            return Err(ManifestError::Unavailable(
                "injected crash before commit".to_string(),
            ));
        }

        // The winning worker's insert lands first
        if !raced.is_empty() {
            self.inner.record_fingerprints(&raced).await?;
        }
        self.inner.record_fingerprints(records).await
    }

    async fn get_file(&self, file_id: &str) -> ManifestResult<Option<FileRecord>> {
        self.enter(|c| c.get_file += 1).await?;
        self.inner.get_file(file_id).await
    }

    async fn stats(&self) -> ManifestResult<ManifestStats> {
        self.enter(|c| c.stats += 1).await?;
        self.inner.stats().await
    }
}
