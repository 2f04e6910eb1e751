//! SQLite connection management
//!
//! Uses a simple Arc<Mutex<Connection>> pattern instead of a pool crate.
//! The manifest sees short point lookups and single-row inserts, so one
//! serialized connection per process is enough.

use crate::config::SqliteConfig;
use crate::error::{SqliteError, SqliteResult};
use crate::schema;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use std::sync::Arc;
use tracing::{debug, info};

/// Thread-safe SQLite connection wrapper
///
/// Clones share the same connection.
#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
    config: SqliteConfig,
}

impl SqlitePool {
    /// Open (or create) the database and apply pending migrations
    pub fn new(config: SqliteConfig) -> SqliteResult<Self> {
        info!(path = ?config.path, "Opening SQLite manifest");

        let conn = if config.is_memory() {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = config.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        SqliteError::Connection(format!(
                            "Failed to create directory {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
            }
            Connection::open(&config.path)?
        };

        let pool = Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        };
        pool.initialize()?;

        Ok(pool)
    }

    /// Create an in-memory pool for testing
    pub fn memory() -> SqliteResult<Self> {
        Self::new(SqliteConfig::memory())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Execute a closure with the connection
    ///
    /// Fails with [`SqliteError::LockTimeout`] if the connection stays busy
    /// past the configured lock timeout; `f` is not run in that case.
    pub fn with_connection<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Execute a closure with mutable access to the connection
    pub fn with_connection_mut<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&mut Connection) -> SqliteResult<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }

    fn lock(&self) -> SqliteResult<MutexGuard<'_, Connection>> {
        self.conn
            .try_lock_for(self.config.lock_timeout)
            .ok_or(SqliteError::LockTimeout(self.config.lock_timeout))
    }

    fn initialize(&self) -> SqliteResult<()> {
        self.with_connection(|conn| {
            self.configure_pragmas(conn)?;
            schema::apply_migrations(conn)?;

            info!("SQLite manifest initialized");
            Ok(())
        })
    }

    fn configure_pragmas(&self, conn: &Connection) -> SqliteResult<()> {
        debug!("Configuring SQLite pragmas");

        // WAL keeps committed transactions durable without blocking readers
        if self.config.wal_mode && !self.config.is_memory() {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        } else {
            conn.execute_batch("PRAGMA synchronous = FULL;")?;
        }

        conn.busy_timeout(std::time::Duration::from_millis(
            self.config.busy_timeout_ms,
        ))?;

        conn.execute_batch(&format!("PRAGMA cache_size = {};", self.config.cache_size))?;

        if self.config.mmap_size > 0 {
            conn.execute_batch(&format!("PRAGMA mmap_size = {};", self.config.mmap_size))?;
        }

        conn.execute_batch("PRAGMA temp_store = MEMORY;")?;

        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> SqliteResult<DbStats> {
        self.with_connection(|conn| {
            let page_count: i64 = conn.query_row("PRAGMA page_count;", [], |row| row.get(0))?;
            let page_size: i64 = conn.query_row("PRAGMA page_size;", [], |row| row.get(0))?;
            let freelist_count: i64 =
                conn.query_row("PRAGMA freelist_count;", [], |row| row.get(0))?;

            Ok(DbStats {
                page_count: page_count as u64,
                page_size: page_size as u64,
                freelist_count: freelist_count as u64,
                total_size_bytes: (page_count * page_size) as u64,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbStats {
    pub page_count: u64,
    pub page_size: u64,
    pub freelist_count: u64,
    pub total_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_pool() {
        let pool = SqlitePool::memory().expect("Failed to create memory pool");

        pool.with_connection(|conn| {
            let result: i64 = conn.query_row("SELECT 1 + 1", [], |row| row.get(0))?;
            assert_eq!(result, 2);
            Ok(())
        })
        .expect("Query failed");
    }

    #[test]
    fn test_file_pool_uses_wal() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("metadata").join("manifest.sqlite");

        let pool = SqlitePool::new(SqliteConfig::new(&db_path)).expect("Failed to create pool");
        assert!(db_path.exists());

        pool.with_connection(|conn| {
            let mode: String = conn.query_row("PRAGMA journal_mode;", [], |row| row.get(0))?;
            assert_eq!(mode.to_lowercase(), "wal");
            Ok(())
        })
        .expect("Query failed");
    }

    #[test]
    fn test_busy_connection_times_out_without_running_closure() {
        let pool = SqlitePool::new(
            SqliteConfig::memory().with_lock_timeout(std::time::Duration::from_millis(50)),
        )
        .expect("Failed to create pool");

        pool.with_connection(|_| {
            let mut ran = false;
            let nested = pool.with_connection(|_| {
                ran = true;
                Ok(())
            });
            assert!(matches!(nested, Err(SqliteError::LockTimeout(_))));
            assert!(!ran);
            Ok(())
        })
        .expect("Outer call failed");
    }

    #[test]
    fn test_pool_stats() {
        let pool = SqlitePool::memory().expect("Failed to create pool");
        let stats = pool.stats().expect("Failed to get stats");

        assert!(stats.page_size > 0);
    }

    #[test]
    fn test_schema_applied() {
        let pool = SqlitePool::memory().expect("Failed to create pool");

        pool.with_connection(|conn| {
            let tables: Vec<String> = {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.filter_map(Result::ok).collect()
            };

            assert!(tables.contains(&"files".to_string()));
            assert!(tables.contains(&"fingerprints".to_string()));
            assert!(tables.contains(&"schema_migrations".to_string()));

            Ok(())
        })
        .expect("Failed to verify schema");
    }
}
