//! Cache key derivation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Suffix that separates fingerprint entries from document entries.
pub const FINGERPRINT_SUFFIX: &str = "_hash";

/// Fixed-length cache key derived from a source URL.
///
/// The key is the lowercase hex MD5 of the URL exactly as received, so the
/// same input always lands on the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a source URL.
    pub fn for_url(url: &str) -> Self {
        Self(hex::encode(md5::compute(url.as_bytes()).0))
    }

    /// Wrap an already-derived key, e.g. one recovered from a file name.
    ///
    /// Returns None unless `raw` is 32 lowercase hex characters.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let valid = raw.len() == 32 && raw.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(raw.to_string()))
    }

    /// Key under which the fingerprint for the same URL is stored.
    pub fn fingerprint_key(&self) -> String {
        format!("{}{FINGERPRINT_SUFFIX}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
