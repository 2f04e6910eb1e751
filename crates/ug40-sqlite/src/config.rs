//! SQLite connection configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Path used to request an in-memory database
pub const MEMORY_PATH: &str = ":memory:";

/// Connection settings for the manifest database
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file path, or `:memory:`
    pub path: PathBuf,
    /// Enable write-ahead logging
    pub wal_mode: bool,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
    /// How long a call waits for the shared connection before failing.
    /// A call that times out here has not touched the database.
    pub lock_timeout: Duration,
    /// Page cache size (SQLite `cache_size` semantics; negative means KiB)
    pub cache_size: i64,
    /// Memory-mapped I/O size in bytes, 0 disables it
    pub mmap_size: u64,
}

impl SqliteConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// In-memory database, for tests
    pub fn memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    pub fn with_busy_timeout_ms(mut self, busy_timeout_ms: u64) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn is_memory(&self) -> bool {
        self.path.to_str() == Some(MEMORY_PATH)
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("metadata/manifest.sqlite"),
            wal_mode: true,
            busy_timeout_ms: 5_000,
            lock_timeout: Duration::from_secs(30),
            cache_size: -16_000,
            mmap_size: 0,
        }
    }
}
