use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::config::CliConfig;
use crate::output;

/// Write the example configuration file
pub fn execute(path: Option<PathBuf>, force: bool) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => CliConfig::default_config_path()?,
    };

    if path.exists() && !force {
        bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    CliConfig::create_example(&path)?;
    output::success(&format!("Wrote example config to {}", path.display()));
    Ok(path)
}
