use anyhow::{bail, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use ug40_cli::{
    cli::{Cli, Commands},
    commands,
    config::{CliConfig, ConfigOverrides},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = match &cli.command {
        Commands::Run(args) => args.overrides(),
        Commands::Status(args) => args.overrides(),
        Commands::InitConfig { .. } => ConfigOverrides::default(),
    };

    // init-config must work even when the existing file is broken
    let config = match &cli.command {
        Commands::InitConfig { .. } => CliConfig::default(),
        _ => CliConfig::load(cli.config.clone(), overrides)?,
    };

    // Priority: --verbose > --log-level > config file > warn
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else if let Some(level) = cli.log_level {
        level.into()
    } else {
        config
            .logging
            .level
            .as_deref()
            .and_then(|l| l.parse().ok())
            .unwrap_or(LevelFilter::WARN)
    };

    // RUST_LOG still wins when set
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    debug!(root = %config.corpus.root.display(), "Configuration loaded");

    match cli.command {
        Commands::Run(args) => {
            let summary = commands::run::execute(config, args).await?;
            if summary.has_failures() {
                bail!(
                    "{} file(s) failed; they will be retried on the next run",
                    summary.files_failed
                );
            }
        }
        Commands::Status(args) => commands::status::execute(config, &args.format).await?,
        Commands::InitConfig { path, force } => {
            commands::init::execute(path, force)?;
        }
    }

    Ok(())
}
