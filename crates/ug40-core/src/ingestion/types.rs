//! Inputs and outputs of the ingestion decision engine

use super::IngestError;
use crate::fingerprint::Fingerprint;
use crate::signature::ContentSignature;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default upper bound for a single text unit (1 MiB)
pub const DEFAULT_MAX_UNIT_BYTES: usize = 1024 * 1024;

/// Default bound for a single manifest store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// A discovered file as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub file_id: String,
    pub language: String,
    pub category: String,
    pub signature: ContentSignature,
}

impl SourceFile {
    pub fn new(
        file_id: impl Into<String>,
        language: impl Into<String>,
        category: impl Into<String>,
        signature: impl Into<ContentSignature>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            language: language.into(),
            category: category.into(),
            signature: signature.into(),
        }
    }
}

/// A text unit that passed the basic validity checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit(String);

impl TextUnit {
    /// Validate a candidate unit
    ///
    /// Rejects units that are empty or whitespace-only, and units longer than
    /// `max_bytes`. The text itself is kept byte-exact.
    pub fn new(text: impl Into<String>, max_bytes: usize) -> Result<Self, IngestError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(IngestError::InvalidTextUnit("unit is empty".to_string()));
        }
        if text.len() > max_bytes {
            return Err(IngestError::InvalidTextUnit(format!(
                "unit is {} bytes, limit is {}",
                text.len(),
                max_bytes
            )));
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A text unit accepted as new content, ready for output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedRow {
    pub file_id: String,
    pub language: String,
    pub category: String,
    pub text: String,
    pub fingerprint: Fingerprint,
}

/// Decision for a single text unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitDecision {
    /// New content; its fingerprint is now committed
    Accepted(AcceptedRow),
    /// Fingerprint was already known
    Duplicate(Fingerprint),
    /// Fingerprint was inserted concurrently by another worker
    Raced(Fingerprint),
    /// Unit failed validation and was skipped
    Invalid(String),
}

/// Per-file tally of unit decisions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub accepted: Vec<AcceptedRow>,
    pub duplicates: usize,
    pub races: usize,
    pub invalid: usize,
}

impl FileReport {
    pub(crate) fn record(&mut self, decision: UnitDecision) {
        match decision {
            UnitDecision::Accepted(row) => self.accepted.push(row),
            UnitDecision::Duplicate(_) => self.duplicates += 1,
            UnitDecision::Raced(_) => self.races += 1,
            UnitDecision::Invalid(_) => self.invalid += 1,
        }
    }

    /// Total number of units examined
    pub fn units_seen(&self) -> usize {
        self.accepted.len() + self.duplicates + self.races + self.invalid
    }
}

/// Result of ingesting one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Signature matched the manifest; nothing was read or written
    Unchanged,
    /// File was (re)processed
    Processed(FileReport),
}

/// Engine behaviour knobs
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound for each store read and file upsert. Fingerprint inserts are
    /// always awaited to completion; the store bounds those itself.
    pub store_timeout: Duration,
    /// Largest accepted text unit in bytes
    pub max_unit_bytes: usize,
    /// Ignore matching signatures and reprocess every file.
    /// Duplicate content is still rejected.
    pub force_reprocess: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
            max_unit_bytes: DEFAULT_MAX_UNIT_BYTES,
            force_reprocess: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_unit_rejects_empty_and_blank() {
        assert!(matches!(
            TextUnit::new("", 100),
            Err(IngestError::InvalidTextUnit(_))
        ));
        assert!(matches!(
            TextUnit::new(" \n\t ", 100),
            Err(IngestError::InvalidTextUnit(_))
        ));
    }

    #[test]
    fn test_text_unit_rejects_oversized() {
        let err = TextUnit::new("abcdef", 5).unwrap_err();
        assert!(err.to_string().contains("6 bytes"));
    }

    #[test]
    fn test_text_unit_keeps_text_verbatim() {
        let unit = TextUnit::new(" padded ", 100).unwrap();
        assert_eq!(unit.as_str(), " padded ");
    }

    #[test]
    fn test_report_tallies_decisions() {
        let mut report = FileReport::default();
        report.record(UnitDecision::Duplicate(Fingerprint::from_u64(1)));
        report.record(UnitDecision::Raced(Fingerprint::from_u64(2)));
        report.record(UnitDecision::Invalid("empty".into()));
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.races, 1);
        assert_eq!(report.invalid, 1);
        assert_eq!(report.units_seen(), 3);
    }
}
