//! Output sinks for accepted dataset rows

use crate::error::SinkError;
use crate::rows::DatasetRow;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// What a sink did with a batch of rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkReceipt {
    pub config_name: String,
    pub rows: usize,
    /// Where the rows ended up (file path, URL, ...)
    pub location: String,
}

/// Destination for the rows accepted during one run
///
/// A run calls `push_split` at most once, with every new row for the run's
/// config name, and never with an empty batch.
#[async_trait]
pub trait RowSink: Send + Sync {
    async fn push_split(
        &self,
        config_name: &str,
        rows: &[DatasetRow],
    ) -> Result<SinkReceipt, SinkError>;
}

/// Writes each batch as a new JSON Lines file
///
/// Layout: `<output_dir>/<config_name>/train-<UTC timestamp>.jsonl`.
/// Earlier batches are never touched, so the directory accumulates the
/// dataset as a series of append-only shards.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    output_dir: PathBuf,
}

impl JsonlSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn shard_path(&self, config_name: &str) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
        self.output_dir
            .join(config_name)
            .join(format!("train-{}.jsonl", stamp))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError {
    let path = path.to_path_buf();
    move |source| SinkError::Io { path, source }
}

fn encode_jsonl(rows: &[DatasetRow]) -> Result<Vec<u8>, SinkError> {
    let mut buf = Vec::new();
    for row in rows {
        serde_json::to_writer(&mut buf, row)?;
        buf.push(b'\n');
    }
    Ok(buf)
}

#[async_trait]
impl RowSink for JsonlSink {
    async fn push_split(
        &self,
        config_name: &str,
        rows: &[DatasetRow],
    ) -> Result<SinkReceipt, SinkError> {
        let path = self.shard_path(config_name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_err(parent))?;
        }

        let payload = encode_jsonl(rows)?;

        // Write then rename so readers never see a half-written shard
        let partial = path.with_extension("jsonl.partial");
        tokio::fs::write(&partial, payload)
            .await
            .map_err(io_err(&partial))?;
        tokio::fs::rename(&partial, &path)
            .await
            .map_err(io_err(&path))?;

        info!(
            config_name,
            rows = rows.len(),
            path = %path.display(),
            "Wrote dataset shard"
        );

        Ok(SinkReceipt {
            config_name: config_name.to_string(),
            rows: rows.len(),
            location: path.display().to_string(),
        })
    }
}
