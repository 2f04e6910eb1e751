//! UG40 Core
//!
//! The incremental ingestion and deduplication engine of the UG40 corpus
//! pipeline.
//!
//! ## Components
//!
//! - [`fingerprint`]: deterministic 64-bit digests of text units
//! - [`signature`]: cheap, comparable file content signatures
//! - [`manifest`]: the [`ManifestStore`] trait plus an in-memory backend
//! - [`ingestion`]: the [`IngestionEngine`] that decides what is new
//!
//! Durable backends live in other crates (see `ug40-sqlite`) and are
//! injected into the engine as `Arc<dyn ManifestStore>`.

pub mod fingerprint;
pub mod ingestion;
pub mod manifest;
pub mod signature;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use fingerprint::{fingerprint, Fingerprint, ParseFingerprintError};
pub use ingestion::{
    AcceptedRow, EngineConfig, FileOutcome, FileReport, IngestError, IngestResult,
    IngestionEngine, SourceFile, TextUnit, UnitDecision,
};
pub use manifest::{
    FileRecord, FingerprintRecord, InMemoryManifestStore, LabelCount, ManifestError,
    ManifestResult, ManifestStats, ManifestStore,
};
pub use signature::ContentSignature;
