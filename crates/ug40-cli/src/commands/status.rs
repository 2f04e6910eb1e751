use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

use crate::config::CliConfig;
use crate::output;
use ug40_core::{ManifestStats, ManifestStore};
use ug40_sqlite::SqliteManifestStore;

/// Output formats for status command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutputFormat {
    Table,
    Json,
}

impl From<&str> for StatusOutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => StatusOutputFormat::Json,
            _ => StatusOutputFormat::Table,
        }
    }
}

/// Manifest contents plus the size of the database holding them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub manifest: ManifestStats,
    pub database_size_bytes: u64,
    /// Space held by free pages, reclaimable with VACUUM
    pub free_bytes: u64,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct LabelRow {
    #[tabled(rename = "Language")]
    language: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Fingerprints")]
    fingerprints: u64,
}

/// Execute status command
pub async fn execute(config: CliConfig, format: &str) -> Result<()> {
    let report = load_report(&config).await?;
    println!("{}", render(&report, StatusOutputFormat::from(format))?);
    Ok(())
}

/// Read statistics from the configured manifest
///
/// A missing manifest is an error rather than being created empty.
pub async fn load_report(config: &CliConfig) -> Result<StatusReport> {
    let path = config.manifest_path();
    if !path.exists() {
        bail!(
            "No manifest at {} (run `ug40 run` first or pass --manifest)",
            path.display()
        );
    }

    let store = SqliteManifestStore::open(config.sqlite_config())
        .with_context(|| format!("Failed to open manifest at {}", path.display()))?;

    output::info(&format!("Manifest: {}", path.display()));
    let manifest = store
        .stats()
        .await
        .context("Failed to read manifest statistics")?;
    let db = store
        .db_stats()
        .await
        .context("Failed to read database statistics")?;

    Ok(StatusReport {
        manifest,
        database_size_bytes: db.total_size_bytes,
        free_bytes: db.freelist_count * db.page_size,
    })
}

pub fn render(report: &StatusReport, format: StatusOutputFormat) -> Result<String> {
    let stats = &report.manifest;
    match format {
        StatusOutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize statistics")
        }
        StatusOutputFormat::Table => {
            let summary = vec![
                SummaryRow {
                    metric: "Files",
                    value: stats.files.to_string(),
                },
                SummaryRow {
                    metric: "Fingerprints",
                    value: stats.fingerprints.to_string(),
                },
                SummaryRow {
                    metric: "Database size",
                    value: format!("{} bytes", report.database_size_bytes),
                },
                SummaryRow {
                    metric: "Free space",
                    value: format!("{} bytes", report.free_bytes),
                },
            ];
            let mut out = Table::new(summary).with(Style::modern()).to_string();

            if !stats.by_label.is_empty() {
                let labels: Vec<LabelRow> = stats
                    .by_label
                    .iter()
                    .map(|l| LabelRow {
                        language: l.language.clone(),
                        category: l.category.clone(),
                        fingerprints: l.fingerprints,
                    })
                    .collect();
                out.push_str("\n\n");
                out.push_str(&Table::new(labels).with(Style::modern()).to_string());
            }
            Ok(out)
        }
    }
}
