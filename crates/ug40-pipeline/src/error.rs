//! Error types for the pipeline crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors while walking the corpus tree
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("corpus root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("failed to walk corpus tree: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Errors while reading a source file
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Row schema violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("language code '{0}' must be 2 to 5 characters")]
    InvalidLanguage(String),

    #[error("row text is empty")]
    EmptyText,

    #[error("no row schema for category '{0}'")]
    UnknownCategory(String),
}

/// Errors while writing rows to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize row: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that abort a whole run
///
/// Per-file problems never surface here; they are counted in the run summary.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("worker task failed: {0}")]
    Task(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
