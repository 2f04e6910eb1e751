use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::info;

use crate::cli::RunArgs;
use crate::config::CliConfig;
use crate::output;
use crate::progress::ProgressReporter;
use ug40_core::{EngineConfig, InMemoryManifestStore, IngestionEngine, ManifestStore};
use ug40_pipeline::{
    Category, CorpusPipeline, CorpusScanner, JsonlSink, PipelineConfig, RunObserver, RunSummary,
};
use ug40_sqlite::SqliteManifestStore;

/// Execute one corpus run
///
/// Per-file failures are reported in the returned summary, not as an error.
pub async fn execute(config: CliConfig, args: RunArgs) -> Result<RunSummary> {
    let categories = config.categories();
    for category in &categories {
        category
            .parse::<Category>()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Invalid --categories value '{}'", category))?;
    }

    let store = open_store(&config, args.dry_run)?;
    let engine = Arc::new(IngestionEngine::with_config(
        store,
        EngineConfig {
            store_timeout: config.store_timeout(),
            max_unit_bytes: config.processing.max_unit_bytes,
            force_reprocess: args.force,
        },
    ));

    let scanner = CorpusScanner::new(&config.corpus.root, &categories)
        .with_extensions(&config.corpus.extensions)
        .with_signature_strategy(config.corpus.signature);
    let sink = Arc::new(JsonlSink::new(&config.output.dir));

    let progress = Arc::new(if std::io::stderr().is_terminal() {
        ProgressReporter::new()?
    } else {
        ProgressReporter::hidden()
    });

    let pipeline = CorpusPipeline::new(
        engine,
        scanner,
        sink,
        PipelineConfig {
            workers: config.workers(),
            dry_run: args.dry_run,
        },
    )
    .with_observer(Arc::clone(&progress) as Arc<dyn RunObserver>);

    info!(
        config_name = %pipeline.config_name(),
        workers = pipeline.config().workers,
        "Run configured"
    );

    let result = pipeline.run().await;
    progress.finish();
    let summary = result.context("Corpus run failed")?;

    print_summary(&summary, args.dry_run);
    Ok(summary)
}

fn open_store(config: &CliConfig, dry_run: bool) -> Result<Arc<dyn ManifestStore>> {
    if dry_run {
        output::info("Dry run: using a throwaway in-memory manifest");
        return Ok(Arc::new(InMemoryManifestStore::new()));
    }

    let path = config.manifest_path();
    let store = SqliteManifestStore::open(config.sqlite_config())
        .with_context(|| format!("Failed to open manifest at {}", path.display()))?;
    Ok(Arc::new(store))
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    if dry_run {
        output::header("Dry run complete");
    } else {
        output::header("Run complete");
    }
    output::field("Files discovered", summary.files_discovered);
    output::field("Unchanged", summary.files_unchanged);
    output::field("Processed", summary.files_processed);
    output::field("Failed", summary.files_failed);
    if dry_run {
        output::field("Rows (not written)", summary.rows_accepted);
    } else {
        output::field("New rows", summary.rows_accepted);
    }
    output::field("Duplicate units", summary.units_duplicate + summary.units_raced);
    output::field("Invalid units", summary.units_invalid);

    match &summary.receipt {
        Some(receipt) => output::success(&format!(
            "Wrote {} rows to {}",
            receipt.rows, receipt.location
        )),
        None if !dry_run => output::info("Dataset already up to date"),
        None => {}
    }

    if summary.has_failures() {
        output::error(&format!(
            "{} file(s) failed and will be retried on the next run",
            summary.files_failed
        ));
    }
    for failure in &summary.failures {
        output::warning(&format!("{}: {}", failure.file_id, failure.reason));
    }
}
