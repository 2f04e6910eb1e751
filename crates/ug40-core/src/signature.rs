//! Content signatures
//!
//! A content signature is a cheap value describing a file's current content
//! state. The manifest only ever compares signatures for equality, so the
//! source of the value (modification time, checksum, remote ETag) is a
//! choice of the discovery layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque, comparable signature of a file's content state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentSignature(String);

impl ContentSignature {
    /// Wrap an externally produced signature (e.g. a remote checksum or ETag)
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Signature derived from a modification time
    ///
    /// Nanoseconds since the Unix epoch, truncated to 64 bits and encoded as
    /// little-endian hex. Times before the epoch collapse to zero.
    pub fn from_modified(modified: SystemTime) -> Self {
        let nanos = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self(hex::encode(nanos.to_le_bytes()))
    }

    /// Signature derived from the file bytes (BLAKE3)
    pub fn from_content(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContentSignature {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ContentSignature {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
