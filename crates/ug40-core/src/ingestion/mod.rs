//! Ingestion Decision Engine
//!
//! Turns "a file and its extracted text units" into accepted rows plus
//! manifest updates.
//!
//! ## Per-file algorithm
//!
//! 1. **Quick filter**: if the manifest holds the same content signature for
//!    the file, skip it. Extraction is never invoked and nothing is written.
//! 2. **Units**: in extraction order, validate, fingerprint, reject known
//!    fingerprints, and commit each new fingerprint on its own before moving
//!    to the next unit.
//! 3. **File record**: upsert the file's signature only after every unit has
//!    been committed, so an interrupted file is retried on the next run.
//!
//! Reprocessing is safe: fingerprints committed before an interruption are
//! rejected as duplicates on the retry, so no unit is ever emitted twice.

mod engine;
mod types;

pub use engine::IngestionEngine;
pub use types::{
    AcceptedRow, EngineConfig, FileOutcome, FileReport, SourceFile, TextUnit, UnitDecision,
    DEFAULT_MAX_UNIT_BYTES, DEFAULT_STORE_TIMEOUT,
};

use crate::manifest::ManifestError;
use thiserror::Error;

/// Errors surfaced by the ingestion engine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The manifest could not be queried or written. Aborts the current file.
    #[error("Manifest unavailable: {0}")]
    ManifestUnavailable(ManifestError),

    /// A text unit failed validation. Recovered locally by skipping the unit.
    #[error("Invalid text unit: {0}")]
    InvalidTextUnit(String),

    /// The file's text could not be extracted. Aborts the current file.
    #[error("Failed to extract text from '{file_id}': {reason}")]
    Extraction { file_id: String, reason: String },

    /// Another worker is already processing this file
    #[error("File '{0}' is already being processed")]
    FileInFlight(String),
}

/// Result type for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;
