use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use ug40_pipeline::{default_workers, SignatureStrategy, DEFAULT_EXTENSIONS};
use ug40_sqlite::SqliteConfig;

/// Environment variable that skips loading the user config file
pub const TEST_MODE_ENV: &str = "UG40_TEST_MODE";

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CliConfig {
    pub corpus: CorpusConfig,
    pub manifest: ManifestConfig,
    pub output: OutputConfig,
    pub processing: ProcessingConfig,
    pub logging: LoggingConfig,
}

/// Where the corpus lives and what to pick up from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Corpus root directory
    pub root: PathBuf,
    /// Categories processed by `run`
    pub categories: Vec<String>,
    /// File extensions considered part of the corpus
    pub extensions: Vec<String>,
    /// Change detection strategy
    pub signature: SignatureStrategy,
}

/// Manifest database settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Database path; derived from the corpus root when unset
    pub path: Option<PathBuf>,
    /// SQLite busy timeout in milliseconds
    pub busy_timeout_ms: u64,
    /// Upper bound in seconds for manifest reads, file upserts and waits for
    /// the database connection
    pub store_timeout_secs: u64,
}

/// Dataset output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives `<config_name>/train-*.jsonl` shards
    pub dir: PathBuf,
}

/// Processing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Parallel workers; half the available cores when unset
    pub workers: Option<usize>,
    /// Largest accepted text unit in bytes
    pub max_unit_bytes: usize,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when neither `--log-level` nor `RUST_LOG` is given
    pub level: Option<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            categories: vec!["general_text".to_string(), "language_guides".to_string()],
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            signature: SignatureStrategy::default(),
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5_000,
            store_timeout_secs: 30,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("datasets"),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: None,
            max_unit_bytes: ug40_core::ingestion::DEFAULT_MAX_UNIT_BYTES,
        }
    }
}

/// Command line values that take precedence over file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub workers: Option<usize>,
    pub categories: Option<Vec<String>>,
    pub signature: Option<SignatureStrategy>,
}

impl CliConfig {
    /// Load configuration with precedence: defaults < file < env < args
    pub fn load(config_file: Option<PathBuf>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = Self::from_file_or_default(config_file)?;

        // Override with env vars
        if let Ok(root) = std::env::var("UG40_DRIVE_ROOT") {
            config.corpus.root = PathBuf::from(root);
        }
        if let Ok(path) = std::env::var("UG40_MANIFEST_PATH") {
            config.manifest.path = Some(PathBuf::from(path));
        }
        if let Ok(dir) = std::env::var("UG40_OUTPUT_DIR") {
            config.output.dir = PathBuf::from(dir);
        }
        if let Ok(workers) = std::env::var("UG40_WORKERS") {
            let workers = workers
                .parse()
                .with_context(|| format!("UG40_WORKERS must be a number, got '{}'", workers))?;
            config.processing.workers = Some(workers);
        }

        // Override with CLI args (highest priority)
        if let Some(root) = overrides.root {
            config.corpus.root = root;
        }
        if let Some(path) = overrides.manifest {
            config.manifest.path = Some(path);
        }
        if let Some(dir) = overrides.output {
            config.output.dir = dir;
        }
        if let Some(workers) = overrides.workers {
            config.processing.workers = Some(workers);
        }
        if let Some(categories) = overrides.categories {
            config.corpus.categories = categories;
        }
        if let Some(signature) = overrides.signature {
            config.corpus.signature = signature;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let categories: Vec<&str> = self
            .corpus
            .categories
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if categories.is_empty() {
            bail!("At least one category must be selected");
        }
        if self.processing.workers == Some(0) {
            bail!("Worker count must be at least 1");
        }
        Ok(())
    }

    /// Manifest database path (defaults to `<root>/metadata/manifest.sqlite`)
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest
            .path
            .clone()
            .unwrap_or_else(|| self.corpus.root.join("metadata").join("manifest.sqlite"))
    }

    /// Bound for manifest reads and file upserts
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.manifest.store_timeout_secs.max(1))
    }

    /// SQLite settings for the manifest database
    ///
    /// Waits for the shared connection use the same bound as `store_timeout`,
    /// so an insert that cannot start in time fails without writing.
    pub fn sqlite_config(&self) -> SqliteConfig {
        SqliteConfig::new(self.manifest_path())
            .with_busy_timeout_ms(self.manifest.busy_timeout_ms)
            .with_lock_timeout(self.store_timeout())
    }

    /// Requested categories, trimmed
    pub fn categories(&self) -> Vec<String> {
        self.corpus
            .categories
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Resolved worker count
    pub fn workers(&self) -> usize {
        self.processing.workers.unwrap_or_else(default_workers).max(1)
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("ug40");
        Ok(config_dir.join("config.toml"))
    }

    /// Create a new config file with example values
    pub fn create_example(path: &Path) -> Result<()> {
        let example = r#"# UG40 pipeline configuration
# Location: ~/.config/ug40/config.toml
#
# Precedence: built-in defaults < this file < environment < command line

[corpus]
# Corpus root laid out as <language>/<category>/<file>
# Env: UG40_DRIVE_ROOT
root = "/data/ug40"

# Categories processed by `ug40 run`
categories = ["general_text", "language_guides"]

# File extensions picked up during discovery
extensions = ["txt", "md"]

# Change detection: "mtime" (fast) or "checksum" (BLAKE3 of file bytes)
signature = "mtime"

[manifest]
# Default: <root>/metadata/manifest.sqlite
# Env: UG40_MANIFEST_PATH
# path = "/data/ug40/metadata/manifest.sqlite"

# How long SQLite waits on a locked database
busy_timeout_ms = 5000

# Upper bound for manifest reads and for waiting on the database connection.
# A fingerprint insert that has started always runs to completion.
store_timeout_secs = 30

[output]
# Dataset shards land in <dir>/<config_name>/train-<timestamp>.jsonl
# Env: UG40_OUTPUT_DIR
dir = "datasets"

[processing]
# Default: half the available cores
# Env: UG40_WORKERS
# workers = 4

# Units larger than this are skipped as invalid
max_unit_bytes = 1048576

[logging]
# off, error, warn, info, debug, trace (RUST_LOG wins when set)
# level = "info"
"#;

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        std::fs::write(path, example).context("Failed to write config file")?;

        Ok(())
    }

    /// Load config from file or return default
    fn from_file_or_default(config_file: Option<PathBuf>) -> Result<Self> {
        // An explicit file must exist; the default location is optional
        if let Some(path) = config_file {
            return Self::from_file(&path);
        }

        if std::env::var(TEST_MODE_ENV).is_ok() {
            return Ok(Self::default());
        }

        match Self::default_config_path() {
            Ok(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "UG40_DRIVE_ROOT",
        "UG40_MANIFEST_PATH",
        "UG40_OUTPUT_DIR",
        "UG40_WORKERS",
    ];

    /// Clears the UG40 environment for the duration of a test
    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            let mut saved: Vec<_> = ENV_VARS
                .iter()
                .map(|k| (*k, std::env::var(k).ok()))
                .collect();
            saved.push((TEST_MODE_ENV, std::env::var(TEST_MODE_ENV).ok()));
            for key in ENV_VARS {
                std::env::remove_var(key);
            }
            std::env::set_var(TEST_MODE_ENV, "1");
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.saved {
                match value {
                    Some(v) => std::env::set_var(key, v),
                    None => std::env::remove_var(key),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn test_load_config_with_defaults() {
        let _env = EnvGuard::new();
        let config = CliConfig::load(None, ConfigOverrides::default()).unwrap();

        assert_eq!(config.categories(), vec!["general_text", "language_guides"]);
        assert_eq!(config.corpus.signature, SignatureStrategy::Mtime);
        assert_eq!(
            config.manifest_path(),
            config.corpus.root.join("metadata").join("manifest.sqlite")
        );
        assert!(config.workers() >= 1);
    }

    #[test]
    #[serial]
    fn test_file_values_are_loaded() {
        let _env = EnvGuard::new();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [corpus]
            root = "/srv/corpus"
            categories = ["general_text"]
            signature = "checksum"

            [processing]
            workers = 3
            "#,
        )
        .unwrap();

        let config = CliConfig::load(Some(path), ConfigOverrides::default()).unwrap();

        assert_eq!(config.corpus.root, PathBuf::from("/srv/corpus"));
        assert_eq!(config.categories(), vec!["general_text"]);
        assert_eq!(config.corpus.signature, SignatureStrategy::Checksum);
        assert_eq!(config.workers(), 3);
        // Unset sections keep their defaults
        assert_eq!(config.manifest.busy_timeout_ms, 5_000);
        assert_eq!(
            config.manifest_path(),
            PathBuf::from("/srv/corpus/metadata/manifest.sqlite")
        );
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file_and_args_override_environment() {
        let _env = EnvGuard::new();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[corpus]\nroot = \"/from/file\"\n").unwrap();

        std::env::set_var("UG40_DRIVE_ROOT", "/from/env");
        std::env::set_var("UG40_OUTPUT_DIR", "/out/env");
        std::env::set_var("UG40_WORKERS", "6");

        let config = CliConfig::load(Some(path.clone()), ConfigOverrides::default()).unwrap();
        assert_eq!(config.corpus.root, PathBuf::from("/from/env"));
        assert_eq!(config.output.dir, PathBuf::from("/out/env"));
        assert_eq!(config.workers(), 6);

        let overrides = ConfigOverrides {
            root: Some(PathBuf::from("/from/args")),
            workers: Some(2),
            ..ConfigOverrides::default()
        };
        let config = CliConfig::load(Some(path), overrides).unwrap();
        assert_eq!(config.corpus.root, PathBuf::from("/from/args"));
        assert_eq!(config.output.dir, PathBuf::from("/out/env"));
        assert_eq!(config.workers(), 2);
    }

    #[test]
    #[serial]
    fn test_manifest_env_var() {
        let _env = EnvGuard::new();
        std::env::set_var("UG40_MANIFEST_PATH", "/tmp/m.sqlite");

        let config = CliConfig::load(None, ConfigOverrides::default()).unwrap();
        assert_eq!(config.manifest_path(), PathBuf::from("/tmp/m.sqlite"));
    }

    #[test]
    #[serial]
    fn test_invalid_worker_env_is_an_error() {
        let _env = EnvGuard::new();
        std::env::set_var("UG40_WORKERS", "many");

        assert!(CliConfig::load(None, ConfigOverrides::default()).is_err());
    }

    #[test]
    #[serial]
    fn test_empty_category_list_is_rejected() {
        let _env = EnvGuard::new();
        let overrides = ConfigOverrides {
            categories: Some(vec![" ".to_string()]),
            ..ConfigOverrides::default()
        };
        assert!(CliConfig::load(None, overrides).is_err());
    }

    #[test]
    #[serial]
    fn test_explicit_missing_file_is_an_error() {
        let _env = EnvGuard::new();
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(CliConfig::load(Some(missing), ConfigOverrides::default()).is_err());
    }

    #[test]
    #[serial]
    fn test_create_example_parses() {
        let _env = EnvGuard::new();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        CliConfig::create_example(&path).unwrap();
        let config = CliConfig::load(Some(path), ConfigOverrides::default()).unwrap();

        assert_eq!(config.corpus.root, PathBuf::from("/data/ug40"));
        assert_eq!(config.output.dir, PathBuf::from("datasets"));
    }

    #[test]
    fn test_sqlite_config_uses_store_timeout_for_lock_waits() {
        let mut config = CliConfig::default();
        config.manifest.path = Some(PathBuf::from("/tmp/m.sqlite"));
        config.manifest.store_timeout_secs = 7;
        config.manifest.busy_timeout_ms = 250;

        let sqlite = config.sqlite_config();
        assert_eq!(sqlite.path, PathBuf::from("/tmp/m.sqlite"));
        assert_eq!(sqlite.busy_timeout_ms, 250);
        assert_eq!(sqlite.lock_timeout, Duration::from_secs(7));
    }
}
