use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use ug40_pipeline::SignatureStrategy;

use crate::config::ConfigOverrides;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser)]
#[command(name = "ug40")]
#[command(about = "ug40 - incremental ingestion and deduplication for the UG40 corpus")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses config file value or defaults to 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/ug40/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover, deduplicate and emit new corpus content
    Run(RunArgs),

    /// Show manifest statistics
    Status(StatusArgs),

    /// Write an example configuration file
    #[command(name = "init-config")]
    InitConfig {
        /// Where to write the file (defaults to ~/.config/ug40/config.toml)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Corpus root directory
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Comma-separated categories to process
    #[arg(long, value_delimiter = ',')]
    pub categories: Option<Vec<String>>,

    /// Output directory for dataset shards
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Manifest database path (defaults to <root>/metadata/manifest.sqlite)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Number of files processed in parallel
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Reprocess files even when their signature is unchanged.
    /// Content already in the manifest is still rejected.
    #[arg(long)]
    pub force: bool,

    /// How file changes are detected (mtime, checksum)
    #[arg(long)]
    pub signature: Option<SignatureStrategy>,

    /// Run against a throwaway in-memory manifest and write nothing
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            root: self.root.clone(),
            manifest: self.manifest.clone(),
            output: self.output.clone(),
            workers: self.workers,
            categories: self.categories.clone(),
            signature: self.signature,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct StatusArgs {
    /// Corpus root directory
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Manifest database path (defaults to <root>/metadata/manifest.sqlite)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short = 'f', long, default_value = "table")]
    pub format: String,
}

impl StatusArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            root: self.root.clone(),
            manifest: self.manifest.clone(),
            ..ConfigOverrides::default()
        }
    }
}
