//! Common test utilities for pipeline tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use ug40_core::{IngestionEngine, ManifestStore};
use ug40_pipeline::{
    CorpusPipeline, CorpusScanner, DatasetRow, PipelineConfig, RowSink, SignatureStrategy,
    SinkError, SinkReceipt,
};

/// Write `content` at `rel` under `root`, creating directories.
pub fn write_file(root: &Path, rel: &str, content: &str) -> Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Create a temporary corpus from `(relative path, content)` pairs.
///
/// The returned directory must be kept alive for the duration of the test.
pub fn create_corpus(files: &[(&str, &str)]) -> Result<TempDir> {
    let dir = TempDir::new()?;
    for (rel, content) in files {
        write_file(dir.path(), rel, content)?;
    }
    Ok(dir)
}

/// Sink that keeps every batch in memory.
#[derive(Clone, Default)]
pub struct CollectingSink {
    batches: Arc<Mutex<Vec<(String, Vec<DatasetRow>)>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<(String, Vec<DatasetRow>)> {
        self.batches.lock().unwrap().clone()
    }

    /// Row bodies across all batches, in push order.
    pub fn bodies(&self) -> Vec<String> {
        self.batches()
            .into_iter()
            .flat_map(|(_, rows)| rows)
            .map(|row| row.body().to_string())
            .collect()
    }

    pub fn push_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl RowSink for CollectingSink {
    async fn push_split(
        &self,
        config_name: &str,
        rows: &[DatasetRow],
    ) -> Result<SinkReceipt, SinkError> {
        self.batches
            .lock()
            .unwrap()
            .push((config_name.to_string(), rows.to_vec()));
        Ok(SinkReceipt {
            config_name: config_name.to_string(),
            rows: rows.len(),
            location: "memory".to_string(),
        })
    }
}

/// Sink that always fails.
pub struct FailingSink;

#[async_trait]
impl RowSink for FailingSink {
    async fn push_split(
        &self,
        _config_name: &str,
        _rows: &[DatasetRow],
    ) -> Result<SinkReceipt, SinkError> {
        Err(SinkError::Io {
            path: "unreachable".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "sink offline"),
        })
    }
}

/// Pipeline over `root` with checksum signatures (mtime granularity is too
/// coarse for files rewritten within one test).
pub fn pipeline(
    root: &Path,
    store: Arc<dyn ManifestStore>,
    sink: Arc<dyn RowSink>,
) -> CorpusPipeline {
    pipeline_with(root, store, sink, PipelineConfig {
        workers: 4,
        dry_run: false,
    })
}

pub fn pipeline_with(
    root: &Path,
    store: Arc<dyn ManifestStore>,
    sink: Arc<dyn RowSink>,
    config: PipelineConfig,
) -> CorpusPipeline {
    let scanner = CorpusScanner::new(root, ["general_text", "language_guides"])
        .with_signature_strategy(SignatureStrategy::Checksum);
    CorpusPipeline::new(Arc::new(IngestionEngine::new(store)), scanner, sink, config)
}
