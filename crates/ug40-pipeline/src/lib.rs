//! Corpus Pipeline Layer
//!
//! Everything between the corpus on disk and the dataset rows that leave a
//! run. The manifest decisions themselves live in `ug40-core`; this crate
//! feeds them and collects their results.
//!
//! ## Architecture
//!
//! - `discovery`: walk the corpus and label files from their paths
//! - `extractor`: decode bytes (UTF-8, legacy fallback) and normalize to NFC
//! - `transform`: markdown stripping and per-category unit extraction
//! - `rows`: dataset row schemas and validation
//! - `sink`: where accepted rows go (JSON Lines shards by default)
//! - `driver`: the run orchestrator tying them together
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ug40_pipeline::{CorpusPipeline, CorpusScanner, JsonlSink, PipelineConfig};
//!
//! let scanner = CorpusScanner::new(root, ["general_text", "language_guides"]);
//! let pipeline = CorpusPipeline::new(
//!     Arc::new(engine),
//!     scanner,
//!     Arc::new(JsonlSink::new("out")),
//!     PipelineConfig::default(),
//! );
//!
//! let summary = pipeline.run().await?;
//! ```

pub mod discovery;
pub mod driver;
pub mod error;
pub mod extractor;
pub mod rows;
pub mod sink;
pub mod transform;

pub use discovery::{
    CorpusScanner, DiscoveredFile, Scan, SignatureStrategy, UnreadableFile, DEFAULT_EXTENSIONS,
};
pub use driver::{
    default_workers, CorpusPipeline, FileFailure, FileStatus, PipelineConfig, RunObserver,
    RunSummary,
};
pub use error::{DiscoveryError, ExtractError, PipelineError, PipelineResult, RowError, SinkError};
pub use extractor::{decode_bytes, read_text, DecodedText};
pub use rows::{DatasetRow, GeneralTextRow, LanguageGuideRow};
pub use sink::{JsonlSink, RowSink, SinkReceipt};
pub use transform::{paragraph_split, split_and_clean_general, strip_markdown, Category};
