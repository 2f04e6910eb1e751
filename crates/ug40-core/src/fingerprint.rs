//! Content Fingerprinting
//!
//! Fixed-width, non-cryptographic digests of text units used as the identity
//! of a paragraph (or whole document) for exact-content deduplication.
//!
//! The digest is 64-bit XXH3 over the UTF-8 bytes of the text. It is
//! case-sensitive and byte-exact; any normalization must happen upstream.
//! Digest equality is treated as content equality.
//!
//! ```rust
//! use ug40_core::fingerprint::{fingerprint, Fingerprint};
//!
//! let fp = fingerprint("Hello.");
//! assert_eq!(fp, fingerprint("Hello."));
//! assert_ne!(fp, fingerprint("hello."));
//!
//! let parsed: Fingerprint = fp.to_hex().parse().unwrap();
//! assert_eq!(parsed, fp);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Length of the hex rendering of a fingerprint
pub const FINGERPRINT_HEX_LEN: usize = 16;

/// Digest of a text unit's exact content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Wrap a raw digest value
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Raw digest value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Lowercase, zero-padded, big-endian hex rendering (16 characters)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_be_bytes())
    }

    /// Parse the 16-character hex rendering produced by [`Fingerprint::to_hex`]
    pub fn from_hex(s: &str) -> Result<Self, ParseFingerprintError> {
        if s.len() != FINGERPRINT_HEX_LEN {
            return Err(ParseFingerprintError::Length(s.len()));
        }
        let mut bytes = [0u8; 8];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| ParseFingerprintError::Hex(e.to_string()))?;
        Ok(Self(u64::from_be_bytes(bytes)))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_hex()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = ParseFingerprintError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

/// Error parsing a stored fingerprint
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseFingerprintError {
    #[error("expected {FINGERPRINT_HEX_LEN} hex characters, got {0}")]
    Length(usize),

    #[error("invalid hex: {0}")]
    Hex(String),
}

/// Compute the fingerprint of a text unit
pub fn fingerprint(text: &str) -> Fingerprint {
    Fingerprint(xxh3_64(text.as_bytes()))
}
