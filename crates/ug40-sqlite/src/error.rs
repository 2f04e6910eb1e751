//! Error types for SQLite storage

use thiserror::Error;
use ug40_core::manifest::ManifestError;

/// SQLite storage error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema/migration error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Stored value could not be decoded
    #[error("Corrupted record: {0}")]
    Corrupted(String),

    /// The shared connection stayed busy past the lock timeout
    #[error("Connection busy for more than {0:?}")]
    LockTimeout(std::time::Duration),

    /// Blocking task failed to complete
    #[error("Task error: {0}")]
    Task(String),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;

impl SqliteError {
    /// True if the error is a UNIQUE / PRIMARY KEY violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            SqliteError::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }

    /// True if the database stayed locked past the busy timeout
    pub fn is_lock_contention(&self) -> bool {
        matches!(
            self,
            SqliteError::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
        )
    }
}

impl From<SqliteError> for ManifestError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Corrupted(msg) => Self::Corrupted(msg),
            SqliteError::LockTimeout(waited) => Self::Timeout(waited),
            err if err.is_lock_contention() => {
                Self::Unavailable(format!("lock contention: {}", err))
            }
            err => Self::Unavailable(err.to_string()),
        }
    }
}
