//! Manifest Store Error Types

use crate::fingerprint::Fingerprint;
use std::time::Duration;
use thiserror::Error;

/// Error type for manifest store operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// The backing store could not be read or written
    #[error("Manifest unavailable: {0}")]
    Unavailable(String),

    /// A store operation did not complete in time
    #[error("Manifest operation timed out after {0:?}")]
    Timeout(Duration),

    /// An insert hit the fingerprint uniqueness constraint.
    /// The whole batch containing it was rolled back.
    #[error("Fingerprint {0} is already recorded")]
    DuplicateFingerprint(Fingerprint),

    /// Stored data could not be decoded
    #[error("Corrupted manifest record: {0}")]
    Corrupted(String),
}

/// Result type for manifest store operations
pub type ManifestResult<T> = Result<T, ManifestError>;
