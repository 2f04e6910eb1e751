//! Corpus discovery
//!
//! The corpus is a directory tree laid out as
//! `<language>/<category>/<any/nested/path>.<ext>`. Discovery walks it,
//! labels every file from its path and computes its content signature.

use crate::error::DiscoveryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};
use ug40_core::{ContentSignature, SourceFile};
use walkdir::WalkDir;

/// Extensions picked up when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &["txt", "md"];

/// How a file's content signature is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStrategy {
    /// Modification time; cheap but misses same-mtime rewrites
    #[default]
    Mtime,
    /// BLAKE3 digest of the file bytes
    Checksum,
}

impl SignatureStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mtime => "mtime",
            Self::Checksum => "checksum",
        }
    }

    /// Compute the signature of the file at `path`
    pub fn compute(&self, path: &Path) -> std::io::Result<ContentSignature> {
        match self {
            Self::Mtime => {
                let modified = std::fs::metadata(path)?.modified()?;
                Ok(ContentSignature::from_modified(modified))
            }
            Self::Checksum => {
                let bytes = std::fs::read(path)?;
                Ok(ContentSignature::from_content(&bytes))
            }
        }
    }
}

impl fmt::Display for SignatureStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mtime" => Ok(Self::Mtime),
            "checksum" => Ok(Self::Checksum),
            other => Err(format!("unknown signature strategy '{}'", other)),
        }
    }
}

/// A file found under the corpus root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Absolute (or root-joined) path on disk
    pub path: PathBuf,
    /// Identity and labels as seen by the ingestion engine
    pub source: SourceFile,
}

/// A matching file whose signature could not be computed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableFile {
    pub path: PathBuf,
    pub file_id: String,
    pub reason: String,
}

/// Result of one corpus walk
#[derive(Debug, Clone, Default)]
pub struct Scan {
    /// Files ready for ingestion, sorted by `file_id`
    pub files: Vec<DiscoveredFile>,
    /// Files to report as failed for this run, sorted by `file_id`
    pub unreadable: Vec<UnreadableFile>,
}

impl Scan {
    /// Number of matching files, readable or not
    pub fn total(&self) -> usize {
        self.files.len() + self.unreadable.len()
    }
}

/// Walks a corpus root and labels the files it finds
#[derive(Debug, Clone)]
pub struct CorpusScanner {
    root: PathBuf,
    categories: BTreeSet<String>,
    extensions: Vec<String>,
    signature_strategy: SignatureStrategy,
}

impl CorpusScanner {
    pub fn new<I, S>(root: impl Into<PathBuf>, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root: root.into(),
            categories: categories.into_iter().map(Into::into).collect(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            signature_strategy: SignatureStrategy::default(),
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn with_signature_strategy(mut self, strategy: SignatureStrategy) -> Self {
        self.signature_strategy = strategy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Requested categories, sorted
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }

    pub fn signature_strategy(&self) -> SignatureStrategy {
        self.signature_strategy
    }

    /// Output config name: the sorted categories joined with `+`
    pub fn config_name(&self) -> String {
        self.categories().collect::<Vec<_>>().join("+")
    }

    /// Walk the corpus and return every matching file, sorted by `file_id`
    ///
    /// Files whose signature cannot be computed (removed mid-walk,
    /// unreadable) are listed in [`Scan::unreadable`] instead of failing the
    /// scan. Blocking; call from `spawn_blocking` inside async code.
    pub fn scan(&self) -> Result<Scan, DiscoveryError> {
        if !self.root.is_dir() {
            return Err(DiscoveryError::RootNotFound(self.root.clone()));
        }

        let mut scan = Scan::default();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry?;
            if !entry.file_type().is_file() || !self.has_allowed_extension(entry.path()) {
                continue;
            }

            let Some(file_id) = relative_file_id(&self.root, entry.path()) else {
                debug!(path = %entry.path().display(), "Skipping path that is not valid UTF-8");
                continue;
            };

            let mut parts = file_id.splitn(3, '/');
            let (Some(language), Some(category), Some(_)) = (parts.next(), parts.next(), parts.next())
            else {
                debug!(%file_id, "Skipping file outside <language>/<category>/ layout");
                continue;
            };

            if !self.categories.contains(category) {
                continue;
            }

            match self.describe(entry.path(), &file_id, language, category) {
                Ok(file) => scan.files.push(file),
                Err(unreadable) => scan.unreadable.push(unreadable),
            }
        }

        scan.files
            .sort_by(|a, b| a.source.file_id.cmp(&b.source.file_id));
        scan.unreadable.sort_by(|a, b| a.file_id.cmp(&b.file_id));

        info!(
            root = %self.root.display(),
            files = scan.files.len(),
            unreadable = scan.unreadable.len(),
            strategy = %self.signature_strategy,
            "Corpus scan complete"
        );
        Ok(scan)
    }

    /// Compute the signature for one labelled file
    fn describe(
        &self,
        path: &Path,
        file_id: &str,
        language: &str,
        category: &str,
    ) -> Result<DiscoveredFile, UnreadableFile> {
        match self.signature_strategy.compute(path) {
            Ok(signature) => Ok(DiscoveredFile {
                path: path.to_path_buf(),
                source: SourceFile::new(file_id, language, category, signature),
            }),
            Err(e) => {
                warn!(%file_id, error = %e, "Failed to compute content signature");
                Err(UnreadableFile {
                    path: path.to_path_buf(),
                    file_id: file_id.to_string(),
                    reason: format!("failed to compute signature: {}", e),
                })
            }
        }
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

/// Corpus-relative path with `/` separators
fn relative_file_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lug/general_text/b.txt", "B");
        write(dir.path(), "lug/general_text/nested/deep/a.md", "A");
        write(dir.path(), "ach/language_guides/guide.md", "G");
        write(dir.path(), "ach/dictionaries/words.txt", "D");
        write(dir.path(), "lug/general_text/image.png", "P");
        write(dir.path(), "lug/readme.txt", "R");
        write(dir.path(), "top.txt", "T");
        dir
    }

    fn ids(files: &[DiscoveredFile]) -> Vec<&str> {
        files.iter().map(|f| f.source.file_id.as_str()).collect()
    }

    #[test]
    fn test_scan_labels_and_filters() {
        let dir = corpus();
        let scanner = CorpusScanner::new(dir.path(), ["general_text", "language_guides"]);

        let files = scanner.scan().unwrap().files;

        assert_eq!(
            ids(&files),
            vec![
                "ach/language_guides/guide.md",
                "lug/general_text/b.txt",
                "lug/general_text/nested/deep/a.md",
            ]
        );
        let guide = &files[0].source;
        assert_eq!(guide.language, "ach");
        assert_eq!(guide.category, "language_guides");
    }

    #[test]
    fn test_scan_respects_category_selection() {
        let dir = corpus();
        let scanner = CorpusScanner::new(dir.path(), ["language_guides"]);

        let files = scanner.scan().unwrap().files;
        assert_eq!(ids(&files), vec!["ach/language_guides/guide.md"]);
    }

    #[test]
    fn test_custom_extensions() {
        let dir = corpus();
        let scanner =
            CorpusScanner::new(dir.path(), ["general_text"]).with_extensions([".TXT"]);

        let files = scanner.scan().unwrap().files;
        assert_eq!(ids(&files), vec!["lug/general_text/b.txt"]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let scanner = CorpusScanner::new("/definitely/not/here", ["general_text"]);
        assert!(matches!(
            scanner.scan(),
            Err(DiscoveryError::RootNotFound(_))
        ));
    }

    #[test]
    fn test_checksum_signature_tracks_content() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lug/general_text/a.txt", "one");
        let scanner = CorpusScanner::new(dir.path(), ["general_text"])
            .with_signature_strategy(SignatureStrategy::Checksum);

        let first = scanner.scan().unwrap().files[0].source.signature.clone();
        assert_eq!(first, scanner.scan().unwrap().files[0].source.signature);

        write(dir.path(), "lug/general_text/a.txt", "two");
        assert_ne!(first, scanner.scan().unwrap().files[0].source.signature);
    }

    #[test]
    fn test_vanished_file_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let scanner = CorpusScanner::new(dir.path(), ["general_text"])
            .with_signature_strategy(SignatureStrategy::Checksum);
        let gone = dir.path().join("lug/general_text/gone.txt");

        let err = scanner
            .describe(&gone, "lug/general_text/gone.txt", "lug", "general_text")
            .unwrap_err();
        assert_eq!(err.file_id, "lug/general_text/gone.txt");
        assert!(err.reason.contains("signature"));
    }

    #[test]
    fn test_clean_scan_has_no_unreadable_files() {
        let dir = corpus();
        let scan = CorpusScanner::new(dir.path(), ["general_text"])
            .with_signature_strategy(SignatureStrategy::Checksum)
            .scan()
            .unwrap();
        assert!(scan.unreadable.is_empty());
        assert_eq!(scan.total(), 2);
    }

    #[test]
    fn test_config_name_is_sorted() {
        let scanner = CorpusScanner::new(".", ["language_guides", "general_text"]);
        assert_eq!(scanner.config_name(), "general_text+language_guides");
    }

    #[test]
    fn test_signature_strategy_parse() {
        assert_eq!("mtime".parse::<SignatureStrategy>(), Ok(SignatureStrategy::Mtime));
        assert_eq!("Checksum".parse::<SignatureStrategy>(), Ok(SignatureStrategy::Checksum));
        assert!("md5".parse::<SignatureStrategy>().is_err());
    }
}
