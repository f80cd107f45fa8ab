//! Content fingerprints for media URLs.
//!
//! A fingerprint is the MD5 of the first `max_bytes` bytes of a resource.
//! It is cached under the URL's fingerprint key with its own TTL, which is
//! longer than the document TTL, so a document refresh normally skips the
//! media fetch entirely.

use std::sync::Arc;
use std::time::Duration;

use danmaku_core::{CacheBackend, CacheKey, Error, FingerprintEntry, now_unix};

use crate::fetch::PrefixFetcher;

/// Hex MD5 of `data`.
pub fn digest(data: &[u8]) -> String {
    hex::encode(md5::compute(data).0)
}

/// Computes and caches content fingerprints.
#[derive(Clone)]
pub struct Fingerprinter {
    fetcher: Arc<dyn PrefixFetcher>,
    backend: Arc<dyn CacheBackend>,
    ttl_secs: i64,
    max_bytes: usize,
}

impl Fingerprinter {
    pub fn new(
        fetcher: Arc<dyn PrefixFetcher>, backend: Arc<dyn CacheBackend>, ttl: Duration, max_bytes: usize,
    ) -> Self {
        Self { fetcher, backend, ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX), max_bytes }
    }

    /// Fingerprint for `url`, reusing a fresh cached value when there is one.
    pub async fn fingerprint(&self, url: &str) -> Result<String, Error> {
        self.fingerprint_at(url, now_unix()).await
    }

    /// [`Self::fingerprint`] with an explicit clock.
    pub async fn fingerprint_at(&self, url: &str, now: i64) -> Result<String, Error> {
        let key = CacheKey::for_url(url);

        if let Some(entry) = self.backend.load_fingerprint(&key).await
            && now.saturating_sub(entry.written_at) < self.ttl_secs
        {
            tracing::debug!(key = %key, age_secs = now.saturating_sub(entry.written_at), "fingerprint cache hit");
            return Ok(entry.value);
        }

        let data = self.fetcher.fetch_prefix(url, self.max_bytes).await?;
        let value = digest(&data[..data.len().min(self.max_bytes)]);

        tracing::info!(key = %key, bytes = data.len(), fingerprint = %value, "computed fingerprint");

        let entry = FingerprintEntry { value, written_at: now };
        if let Err(e) = self.backend.store_fingerprint(&key, &entry).await {
            tracing::warn!(key = %key, error = %e, "failed to store fingerprint");
        }

        Ok(entry.value)
    }
}
