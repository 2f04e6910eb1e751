//! SQLite manifest store for the UG40 pipeline
//!
//! Persists the two manifest tables (`files` and `fingerprints`) so that
//! incremental runs survive process restarts.
//!
//! ## Features
//!
//! - **ManifestStore**: implementation of the core manifest trait
//! - **Durable writes**: every write commits before the call returns
//! - **WAL Mode**: concurrent readers while a worker is writing
//! - **Thread Safety**: Arc<Mutex<Connection>> pattern for concurrent access
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ug40_core::IngestionEngine;
//! use ug40_sqlite::{SqliteConfig, SqliteManifestStore};
//!
//! let store = SqliteManifestStore::open(SqliteConfig::new("metadata/manifest.sqlite"))?;
//! let engine = IngestionEngine::new(Arc::new(store));
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod manifest_store;
pub mod schema;

// Re-exports
pub use config::SqliteConfig;
pub use connection::{DbStats, SqlitePool};
pub use error::{SqliteError, SqliteResult};
pub use manifest_store::SqliteManifestStore;
