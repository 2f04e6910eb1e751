//! Corpus Run Orchestrator
//!
//! One run walks the corpus once and hands every new text unit to the sink.
//!
//! ## Run Phases
//!
//! 1. **Discover**: walk the corpus root and label files from their paths
//! 2. **Validate**: reject files whose labels cannot produce valid rows
//! 3. **Ingest**: process files on a bounded worker pool through the
//!    [`IngestionEngine`] (skip check, extraction, per-unit dedup)
//! 4. **Emit**: convert accepted units to dataset rows in `file_id` order
//!    and push them to the sink as one batch
//!
//! Per-file failures (including files whose signature could not be computed)
//! are counted and reported in the [`RunSummary`]; they never abort the run.
//! Only a missing root, a failed walk and sink errors do.

use crate::discovery::{CorpusScanner, DiscoveredFile};
use crate::error::{ExtractError, PipelineError, PipelineResult};
use crate::extractor::read_text;
use crate::rows::{validate_language, DatasetRow};
use crate::sink::{RowSink, SinkReceipt};
use crate::transform::Category;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use ug40_core::{FileOutcome, FileReport, IngestionEngine};

/// Configuration for run behavior
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of files processed concurrently
    pub workers: usize,
    /// Run the full decision pipeline but never call the sink
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            dry_run: false,
        }
    }
}

/// Half the available cores, at least one
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| (n.get() / 2).max(1))
        .unwrap_or(1)
}

/// A file that could not be processed in this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file_id: String,
    pub reason: String,
}

/// Totals for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files_discovered: usize,
    pub files_unchanged: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub rows_accepted: usize,
    pub units_duplicate: usize,
    pub units_raced: usize,
    pub units_invalid: usize,
    pub failures: Vec<FileFailure>,
    /// Present when rows were handed to the sink
    pub receipt: Option<SinkReceipt>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.files_failed > 0
    }

    fn fail(&mut self, file_id: &str, reason: impl Into<String>) {
        self.files_failed += 1;
        self.failures.push(FileFailure {
            file_id: file_id.to_string(),
            reason: reason.into(),
        });
    }
}

/// Per-file status reported to a [`RunObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Unchanged,
    Processed { accepted: usize, duplicates: usize },
    Failed(String),
}

/// Progress hooks for front ends
pub trait RunObserver: Send + Sync {
    /// Called once discovery has finished
    fn on_discovered(&self, _files: usize) {}

    /// Called as each file finishes, in completion order
    fn on_file_done(&self, _file_id: &str, _status: &FileStatus) {}
}

struct SilentObserver;

impl RunObserver for SilentObserver {}

/// The run orchestrator
///
/// ```text
/// CorpusPipeline
///   ├─> CorpusScanner    (discover)
///   ├─> IngestionEngine  (skip check, extract, dedup, commit)
///   └─> RowSink          (emit)
/// ```
pub struct CorpusPipeline {
    engine: Arc<IngestionEngine>,
    scanner: CorpusScanner,
    sink: Arc<dyn RowSink>,
    config: PipelineConfig,
    observer: Arc<dyn RunObserver>,
}

/// Outcome of one worker task
struct FileResult {
    file_id: String,
    /// Errors are already rendered for the summary
    outcome: Result<FileOutcome, String>,
    /// Decisions made before a failure; empty on success
    partial: FileReport,
}

impl CorpusPipeline {
    pub fn new(
        engine: Arc<IngestionEngine>,
        scanner: CorpusScanner,
        sink: Arc<dyn RowSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            engine,
            scanner,
            sink,
            config,
            observer: Arc::new(SilentObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Config name the run's rows are pushed under
    pub fn config_name(&self) -> String {
        self.scanner.config_name()
    }

    /// Execute one run
    pub async fn run(&self) -> PipelineResult<RunSummary> {
        info!(
            root = %self.scanner.root().display(),
            config_name = %self.config_name(),
            workers = self.config.workers,
            dry_run = self.config.dry_run,
            "Starting corpus run"
        );

        // Phase 1: discover
        let scanner = self.scanner.clone();
        let scan = tokio::task::spawn_blocking(move || scanner.scan())
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))??;

        let mut summary = RunSummary {
            files_discovered: scan.total(),
            ..RunSummary::default()
        };
        self.observer.on_discovered(scan.total());

        for unreadable in scan.unreadable {
            let status = FileStatus::Failed(unreadable.reason.clone());
            self.observer.on_file_done(&unreadable.file_id, &status);
            summary.fail(&unreadable.file_id, unreadable.reason);
        }

        // One worker per file_id; scan output is sorted
        let mut files = scan.files;
        files.dedup_by(|a, b| a.source.file_id == b.source.file_id);

        // Phase 2: validate labels before anything is committed
        let mut runnable = Vec::with_capacity(files.len());
        for file in files {
            match Self::validate(&file) {
                Ok(category) => runnable.push((file, category)),
                Err(reason) => {
                    warn!(
                        file_id = %file.source.file_id,
                        %reason,
                        "Skipping file with invalid labels"
                    );
                    let status = FileStatus::Failed(reason.clone());
                    self.observer.on_file_done(&file.source.file_id, &status);
                    summary.fail(&file.source.file_id, reason);
                }
            }
        }

        // Phase 3: ingest
        let results = self.ingest_all(runnable).await;

        // Phase 4: collect in file_id order and emit
        let mut rows = Vec::new();
        for result in results {
            match result.outcome {
                Ok(FileOutcome::Unchanged) => summary.files_unchanged += 1,
                Ok(FileOutcome::Processed(report)) => {
                    summary.files_processed += 1;
                    Self::collect(&report, &mut rows, &mut summary);
                }
                Err(reason) => {
                    // Units committed before the failure are rejected on retry,
                    // so their rows go out with this run
                    Self::collect(&result.partial, &mut rows, &mut summary);
                    error!(
                        file_id = %result.file_id,
                        error = %reason,
                        salvaged = result.partial.accepted.len(),
                        "File failed, will retry on next run"
                    );
                    summary.fail(&result.file_id, reason);
                }
            }
        }
        summary.rows_accepted = rows.len();

        if rows.is_empty() {
            info!("No new rows, dataset already up to date");
        } else if self.config.dry_run {
            info!(rows = rows.len(), "Dry run, not writing rows");
        } else {
            let receipt = self.sink.push_split(&self.config_name(), &rows).await?;
            summary.receipt = Some(receipt);
        }

        info!(
            discovered = summary.files_discovered,
            unchanged = summary.files_unchanged,
            processed = summary.files_processed,
            failed = summary.files_failed,
            rows = summary.rows_accepted,
            "Corpus run complete"
        );

        Ok(summary)
    }

    fn validate(file: &DiscoveredFile) -> Result<Category, String> {
        validate_language(&file.source.language).map_err(|e| e.to_string())?;
        file.source.category.parse()
    }

    /// Run every file through the engine on a bounded worker pool
    ///
    /// Results come back in input order.
    async fn ingest_all(&self, files: Vec<(DiscoveredFile, Category)>) -> Vec<FileResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut handles = Vec::with_capacity(files.len());

        for (file, category) in files {
            let semaphore = Arc::clone(&semaphore);
            let engine = Arc::clone(&self.engine);
            let observer = Arc::clone(&self.observer);
            let file_id = file.source.file_id.clone();

            let handle = tokio::spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();

                let path = file.path.clone();
                let mut partial = FileReport::default();
                let result = engine
                    .ingest_into(
                        &file.source,
                        || async move {
                            let decoded = read_text(&path).await?;
                            Ok::<_, ExtractError>(category.extract_units(&decoded.text))
                        },
                        &mut partial,
                    )
                    .await;

                let status = match &result {
                    Ok(FileOutcome::Unchanged) => FileStatus::Unchanged,
                    Ok(FileOutcome::Processed(report)) => FileStatus::Processed {
                        accepted: report.accepted.len(),
                        duplicates: report.duplicates + report.races,
                    },
                    Err(e) => FileStatus::Failed(e.to_string()),
                };
                observer.on_file_done(&file.source.file_id, &status);

                FileResult {
                    file_id: file.source.file_id,
                    outcome: result.map_err(|e| e.to_string()),
                    partial,
                }
            });
            handles.push((file_id, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (file_id, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => results.push(FileResult {
                    file_id,
                    outcome: Err(format!("worker task failed: {}", e)),
                    partial: FileReport::default(),
                }),
            }
        }
        results
    }

    /// Add a file's unit tallies to the summary and convert its accepted units
    fn collect(report: &FileReport, rows: &mut Vec<DatasetRow>, summary: &mut RunSummary) {
        summary.units_duplicate += report.duplicates;
        summary.units_raced += report.races;
        summary.units_invalid += report.invalid;

        for row in &report.accepted {
            match DatasetRow::from_accepted(row) {
                Ok(dataset_row) => rows.push(dataset_row),
                Err(e) => {
                    // Labels were validated up front, so this is a schema drift bug
                    error!(
                        file_id = %row.file_id,
                        fingerprint = %row.fingerprint,
                        error = %e,
                        "Accepted unit does not fit row schema"
                    );
                    summary.fail(&row.file_id, e.to_string());
                }
            }
        }
        debug!(total = rows.len(), "Converted accepted units");
    }
}
