//! Ingestion engine implementation

use super::types::{
    AcceptedRow, EngineConfig, FileOutcome, FileReport, SourceFile, TextUnit, UnitDecision,
};
use super::{IngestError, IngestResult};
use crate::fingerprint::fingerprint;
use crate::manifest::{FingerprintRecord, ManifestError, ManifestResult, ManifestStore};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Decides, per file and per text unit, what is new and records it
///
/// The engine owns no manifest state of its own; every decision is a query
/// against the injected [`ManifestStore`].
///
/// # Concurrency
///
/// Different files may be ingested concurrently from multiple tasks. The
/// engine refuses to run two `ingest` calls for the same `file_id` at once
/// ([`IngestError::FileInFlight`]), since the unchanged-check and the final
/// upsert are not atomic with respect to each other.
pub struct IngestionEngine {
    store: Arc<dyn ManifestStore>,
    config: EngineConfig,
    in_flight: Mutex<HashSet<String>>,
}

/// Exclusive claim on a `file_id`, released on drop
struct FileLease<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    file_id: String,
}

impl Drop for FileLease<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.file_id);
    }
}

impl IngestionEngine {
    /// Create an engine with the default configuration
    pub fn new(store: Arc<dyn ManifestStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Create an engine with a custom configuration
    pub fn with_config(store: Arc<dyn ManifestStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared handle to the underlying manifest store
    pub fn store(&self) -> Arc<dyn ManifestStore> {
        Arc::clone(&self.store)
    }

    /// Ingest one file
    ///
    /// `extract` produces the file's text units in order. It is only invoked
    /// when the file's signature differs from the manifest (or the engine is
    /// configured to force reprocessing).
    ///
    /// # Returns
    ///
    /// - `Ok(FileOutcome::Unchanged)` when the file was skipped
    /// - `Ok(FileOutcome::Processed(report))` when units were examined and the
    ///   file record was updated
    /// - `Err(...)` when the file must be retried on a later run; any
    ///   fingerprints committed before the error stay committed
    pub async fn ingest<F, Fut, E>(&self, file: &SourceFile, extract: F) -> IngestResult<FileOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, E>>,
        E: Display,
    {
        self.ingest_into(file, extract, &mut FileReport::default())
            .await
    }

    /// Like [`IngestionEngine::ingest`], accumulating into a caller-owned report
    ///
    /// On success the report is moved into the returned outcome. On error it
    /// keeps every decision made before the failure, including rows whose
    /// fingerprints were already committed; callers must still emit those,
    /// since a retry will reject them as duplicates.
    pub async fn ingest_into<F, Fut, E>(
        &self,
        file: &SourceFile,
        extract: F,
        report: &mut FileReport,
    ) -> IngestResult<FileOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, E>>,
        E: Display,
    {
        let _lease = self.lease(&file.file_id)?;

        // Phase 1: quick filter
        if self.is_unchanged(file).await? {
            debug!(file_id = %file.file_id, "File unchanged, skipping");
            return Ok(FileOutcome::Unchanged);
        }

        // Phase 2: extraction
        let units = extract().await.map_err(|e| IngestError::Extraction {
            file_id: file.file_id.clone(),
            reason: e.to_string(),
        })?;
        debug!(file_id = %file.file_id, units = units.len(), "Extracted text units");

        // Phase 3: per-unit decisions, each committed on its own
        for text in units {
            let decision = self.accept_unit(file, text).await?;
            report.record(decision);
        }

        // Phase 4: file record, strictly after every unit commit
        self.guarded(self.store.upsert_file(
            &file.file_id,
            &file.language,
            &file.category,
            &file.signature,
        ))
        .await
        .map_err(IngestError::ManifestUnavailable)?;

        info!(
            file_id = %file.file_id,
            accepted = report.accepted.len(),
            duplicates = report.duplicates,
            races = report.races,
            invalid = report.invalid,
            "File ingested"
        );

        Ok(FileOutcome::Processed(std::mem::take(report)))
    }

    /// Whether the manifest already holds this file at this signature
    ///
    /// Always false when `force_reprocess` is set.
    pub async fn is_unchanged(&self, file: &SourceFile) -> IngestResult<bool> {
        if self.config.force_reprocess {
            return Ok(false);
        }

        self.guarded(
            self.store
                .has_unchanged_file(&file.file_id, &file.signature),
        )
        .await
        .map_err(IngestError::ManifestUnavailable)
    }

    /// Decide a single text unit and commit it if it is new
    ///
    /// This is the per-unit transaction boundary: the unit's fingerprint is
    /// durably recorded before the accepted row is handed back, so a row can
    /// never be produced for content whose fingerprint was not committed.
    /// Callers going through [`IngestionEngine::ingest`] get per-file
    /// exclusivity; direct callers must provide it themselves.
    pub async fn accept_unit(&self, file: &SourceFile, text: String) -> IngestResult<UnitDecision> {
        let unit = match TextUnit::new(text, self.config.max_unit_bytes) {
            Ok(unit) => unit,
            Err(IngestError::InvalidTextUnit(reason)) => {
                debug!(file_id = %file.file_id, %reason, "Skipping invalid text unit");
                return Ok(UnitDecision::Invalid(reason));
            }
            Err(e) => return Err(e),
        };

        let fp = fingerprint(unit.as_str());

        let known = self
            .guarded(self.store.is_duplicate_fingerprint(fp))
            .await
            .map_err(IngestError::ManifestUnavailable)?;
        if known {
            debug!(file_id = %file.file_id, fingerprint = %fp, "Duplicate text unit");
            return Ok(UnitDecision::Duplicate(fp));
        }

        let record = FingerprintRecord::new(fp, &file.language, &file.category);
        // Not bounded by `store_timeout`: a dropped insert may still commit,
        // and a committed fingerprint without its row is lost for good. Stores
        // bound their own waits and fail without writing.
        match self
            .store
            .record_fingerprints(std::slice::from_ref(&record))
            .await
        {
            Ok(()) => Ok(UnitDecision::Accepted(AcceptedRow {
                file_id: file.file_id.clone(),
                language: file.language.clone(),
                category: file.category.clone(),
                text: unit.into_inner(),
                fingerprint: fp,
            })),
            Err(ManifestError::DuplicateFingerprint(_)) => {
                warn!(
                    file_id = %file.file_id,
                    fingerprint = %fp,
                    "Fingerprint recorded concurrently by another file, treating as duplicate"
                );
                Ok(UnitDecision::Raced(fp))
            }
            Err(e) => Err(IngestError::ManifestUnavailable(e)),
        }
    }

    fn lease(&self, file_id: &str) -> IngestResult<FileLease<'_>> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(file_id.to_string()) {
            return Err(IngestError::FileInFlight(file_id.to_string()));
        }
        Ok(FileLease {
            in_flight: &self.in_flight,
            file_id: file_id.to_string(),
        })
    }

    /// Bound a store call by the configured timeout
    ///
    /// Only for calls that are safe to abandon midway: reads, and the file
    /// upsert (a late upsert only marks a fully ingested file as done).
    async fn guarded<T>(&self, op: impl Future<Output = ManifestResult<T>>) -> ManifestResult<T> {
        let timeout = self.config.store_timeout;
        tokio::time::timeout(timeout, op)
            .await
            .unwrap_or_else(|_| Err(ManifestError::Timeout(timeout)))
    }
}
