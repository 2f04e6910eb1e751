//! End-to-end tests for the `run` and `status` commands

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use ug40_cli::cli::RunArgs;
use ug40_cli::commands;
use ug40_cli::config::CliConfig;
use ug40_pipeline::SignatureStrategy;

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn config_for(corpus: &Path, out: &Path) -> CliConfig {
    let mut config = CliConfig::default();
    config.corpus.root = corpus.to_path_buf();
    config.corpus.signature = SignatureStrategy::Checksum;
    config.output.dir = out.to_path_buf();
    config.processing.workers = Some(2);
    config
}

fn shards(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.map(|e| e.unwrap().path()).collect();
    paths.sort();
    paths
}

#[tokio::test]
async fn test_run_twice_writes_only_new_rows() {
    let corpus = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_file(
        corpus.path(),
        "lug/general_text/a.txt",
        "Oli otya?\n\nNdi bulungi.",
    );
    write_file(
        corpus.path(),
        "ach/language_guides/guide.md",
        "# Acholi\n\nGreetings and numbers.",
    );

    let config = config_for(corpus.path(), out.path());
    let first = commands::run::execute(config.clone(), RunArgs::default())
        .await
        .unwrap();
    assert_eq!(first.files_processed, 2);
    assert_eq!(first.rows_accepted, 3);
    assert!(!first.has_failures());
    assert!(config.manifest_path().exists());

    let split_dir = out.path().join("general_text+language_guides");
    assert_eq!(shards(&split_dir).len(), 1);

    let second = commands::run::execute(config.clone(), RunArgs::default())
        .await
        .unwrap();
    assert_eq!(second.files_unchanged, 2);
    assert_eq!(second.rows_accepted, 0);
    assert!(second.receipt.is_none());
    assert_eq!(shards(&split_dir).len(), 1);

    let report = commands::status::load_report(&config).await.unwrap();
    assert_eq!(report.manifest.files, 2);
    assert_eq!(report.manifest.fingerprints, 3);
    assert!(report.database_size_bytes > 0);
}

#[tokio::test]
async fn test_dry_run_leaves_no_trace() {
    let corpus = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_file(corpus.path(), "lug/general_text/a.txt", "Oli otya?");

    let config = config_for(corpus.path(), out.path());
    let args = RunArgs {
        dry_run: true,
        ..RunArgs::default()
    };
    let summary = commands::run::execute(config.clone(), args).await.unwrap();

    assert_eq!(summary.rows_accepted, 1);
    assert!(summary.receipt.is_none());
    assert!(!config.manifest_path().exists());
    assert!(shards(out.path()).is_empty());
}

#[tokio::test]
async fn test_force_reprocesses_but_still_dedups() {
    let corpus = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_file(corpus.path(), "lug/general_text/a.txt", "Oli otya?");

    let config = config_for(corpus.path(), out.path());
    commands::run::execute(config.clone(), RunArgs::default())
        .await
        .unwrap();

    let args = RunArgs {
        force: true,
        ..RunArgs::default()
    };
    let summary = commands::run::execute(config, args).await.unwrap();
    assert_eq!(summary.files_processed, 1);
    assert_eq!(summary.units_duplicate, 1);
    assert_eq!(summary.rows_accepted, 0);
}

#[tokio::test]
async fn test_unknown_category_is_rejected() {
    let corpus = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut config = config_for(corpus.path(), out.path());
    config.corpus.categories = vec!["dictionaries".to_string()];

    assert!(commands::run::execute(config, RunArgs::default())
        .await
        .is_err());
}

#[tokio::test]
async fn test_status_without_manifest_fails() {
    let corpus = TempDir::new().unwrap();
    let config = config_for(corpus.path(), corpus.path());
    assert!(commands::status::load_report(&config).await.is_err());
}
