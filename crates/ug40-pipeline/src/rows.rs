//! Dataset row schemas
//!
//! One schema per category. Rows serialize to flat JSON objects without a
//! type tag; the output config name tells consumers which schema applies.

use crate::error::RowError;
use crate::transform::Category;
use serde::{Deserialize, Serialize};
use ug40_core::AcceptedRow;

/// Allowed language code lengths (ISO 639 style codes)
pub const LANGUAGE_CODE_LEN: std::ops::RangeInclusive<usize> = 2..=5;

/// Check a language label against the row schema
pub fn validate_language(language: &str) -> Result<(), RowError> {
    if LANGUAGE_CODE_LEN.contains(&language.chars().count()) {
        Ok(())
    } else {
        Err(RowError::InvalidLanguage(language.to_string()))
    }
}

/// A paragraph of running text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralTextRow {
    pub language: String,
    #[serde(default)]
    pub source_name: Option<String>,
    pub text: String,
}

/// A complete language guide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageGuideRow {
    pub language: String,
    #[serde(default)]
    pub source_name: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetRow {
    GeneralText(GeneralTextRow),
    LanguageGuide(LanguageGuideRow),
}

impl DatasetRow {
    /// Build the row for an accepted text unit
    ///
    /// `source_name` is left empty; provenance stays in the manifest.
    pub fn from_accepted(row: &AcceptedRow) -> Result<Self, RowError> {
        validate_language(&row.language)?;
        if row.text.trim().is_empty() {
            return Err(RowError::EmptyText);
        }

        let category: Category = row
            .category
            .parse()
            .map_err(|_| RowError::UnknownCategory(row.category.clone()))?;

        Ok(match category {
            Category::GeneralText => Self::GeneralText(GeneralTextRow {
                language: row.language.clone(),
                source_name: None,
                text: row.text.clone(),
            }),
            Category::LanguageGuides => Self::LanguageGuide(LanguageGuideRow {
                language: row.language.clone(),
                source_name: None,
                content: row.text.clone(),
            }),
        })
    }

    pub fn language(&self) -> &str {
        match self {
            Self::GeneralText(row) => &row.language,
            Self::LanguageGuide(row) => &row.language,
        }
    }

    /// The row's text payload
    pub fn body(&self) -> &str {
        match self {
            Self::GeneralText(row) => &row.text,
            Self::LanguageGuide(row) => &row.content,
        }
    }
}
