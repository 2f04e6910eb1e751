//! File loading and Unicode normalization

use crate::error::ExtractError;
use encoding_rs::{UTF_8, WINDOWS_1252};
use std::path::Path;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decoded, NFC-normalized file content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    /// Name of the encoding that was used
    pub encoding: &'static str,
}

impl DecodedText {
    /// Whether the UTF-8 decode failed and the legacy fallback was used
    pub fn used_fallback(&self) -> bool {
        self.encoding != UTF_8.name()
    }
}

/// Decode raw file bytes
///
/// Strict UTF-8 first (after stripping a BOM); anything else is decoded as
/// Windows-1252, which maps every byte, so this never fails.
pub fn decode_bytes(bytes: &[u8]) -> DecodedText {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let (decoded, encoding) = match UTF_8.decode_without_bom_handling_and_without_replacement(bytes)
    {
        Some(text) => (text, UTF_8),
        None => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            (text, WINDOWS_1252)
        }
    };

    DecodedText {
        text: normalize_nfc(&decoded),
        encoding: encoding.name(),
    }
}

/// Unicode NFC normalization
pub fn normalize_nfc(text: &str) -> String {
    text.nfc().collect()
}

/// Read and decode a file
pub async fn read_text(path: &Path) -> Result<DecodedText, ExtractError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded = decode_bytes(&bytes);
    if decoded.used_fallback() {
        warn!(
            path = %path.display(),
            encoding = decoded.encoding,
            "File is not valid UTF-8, decoded with fallback encoding"
        );
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plain_utf8() {
        let decoded = decode_bytes("Oli otya?".as_bytes());
        assert_eq!(decoded.text, "Oli otya?");
        assert!(!decoded.used_fallback());
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("Hello".as_bytes());
        assert_eq!(decode_bytes(&bytes).text, "Hello");
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_windows_1252() {
        // "café" in Windows-1252
        let decoded = decode_bytes(&[0x63, 0x61, 0x66, 0xE9]);
        assert_eq!(decoded.text, "café");
        assert!(decoded.used_fallback());
        assert_eq!(decoded.encoding, "windows-1252");
    }

    #[test]
    fn test_output_is_nfc() {
        // "e" + combining acute accent
        let decoded = decode_bytes("cafe\u{0301}".as_bytes());
        assert_eq!(decoded.text, "caf\u{00E9}");
    }

    #[tokio::test]
    async fn test_read_text_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "Webale nnyo").unwrap();

        let decoded = read_text(&path).await.unwrap();
        assert_eq!(decoded.text, "Webale nnyo");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_text(&dir.path().join("missing.txt")).await.unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }
}
