//! Response and fingerprint caching.
//!
//! This module provides the document cache that sits in front of the
//! comment pipeline, over a pluggable storage backend. It supports:
//!
//! - URL-derived cache keys with a separate fingerprint namespace
//! - Flat-file, SQLite and in-memory backends
//! - Strict TTL checks on read
//! - Probabilistic inline sweeps of expired entries

pub mod backend;
pub mod connection;
pub mod documents;
pub mod fs;
pub mod key;
pub mod memory;
pub mod migrations;
pub mod sweep;

pub use crate::Error;

pub use backend::CacheBackend;
pub use connection::CacheDb;
pub use fs::FsBackend;
pub use key::CacheKey;
pub use memory::MemoryBackend;
pub use sweep::SweepPolicy;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::now_unix;

/// Metadata stored beside each document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    /// Unix seconds at which the document was written.
    pub timestamp: i64,
    /// Source URL the document was rendered for.
    pub url: String,
    /// Catalog episode the comments came from.
    pub episode_id: i64,
    /// Document length in bytes.
    pub size: u64,
}

/// A document served from cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDocument {
    pub key: CacheKey,
    pub body: Vec<u8>,
    pub created_at: i64,
    pub source_url: String,
    pub episode_id: i64,
    pub size: u64,
}

/// A stored content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintEntry {
    pub value: String,
    /// Unix seconds of the last write.
    pub written_at: i64,
}

/// Document cache with TTL enforcement over a [`CacheBackend`].
#[derive(Clone)]
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
    ttl_secs: i64,
}

impl ResponseCache {
    /// Create a cache over `backend` whose documents live for `ttl`.
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX) }
    }

    /// The shared backend, also used for fingerprints.
    pub fn backend(&self) -> Arc<dyn CacheBackend> {
        Arc::clone(&self.backend)
    }

    /// A document written at `created_at` may be served at `now` only while
    /// its age is strictly below the TTL.
    pub fn is_fresh(&self, created_at: i64, now: i64) -> bool {
        now.saturating_sub(created_at) < self.ttl_secs
    }

    /// Look up a fresh document.
    pub async fn get(&self, key: &CacheKey) -> Option<CachedDocument> {
        self.get_at(key, now_unix()).await
    }

    /// Look up a document as of `now`.
    ///
    /// Returns None when the metadata is missing or unreadable, the entry has
    /// aged out, or the document body is gone.
    pub async fn get_at(&self, key: &CacheKey, now: i64) -> Option<CachedDocument> {
        let meta = self.backend.load_meta(key).await?;
        if !self.is_fresh(meta.timestamp, now) {
            tracing::debug!(key = %key, age = now - meta.timestamp, "cached document expired");
            return None;
        }

        let body = self.backend.load_document(key).await?;
        Some(CachedDocument {
            key: key.clone(),
            body,
            created_at: meta.timestamp,
            source_url: meta.url,
            episode_id: meta.episode_id,
            size: meta.size,
        })
    }

    /// Store a rendered document, overwriting any existing entry.
    pub async fn put(&self, key: &CacheKey, document: &[u8], source_url: &str, episode_id: i64) -> Result<(), Error> {
        self.put_at(key, document, source_url, episode_id, now_unix()).await
    }

    /// Store a rendered document stamped with `now`.
    pub async fn put_at(
        &self, key: &CacheKey, document: &[u8], source_url: &str, episode_id: i64, now: i64,
    ) -> Result<(), Error> {
        let meta = DocumentMeta {
            timestamp: now,
            url: source_url.to_string(),
            episode_id,
            size: document.len() as u64,
        };
        self.backend.store_document(key, document, &meta).await
    }

    /// Remove every entry that is no longer fresh.
    ///
    /// Returns the number of entries removed.
    pub async fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(now_unix()).await
    }

    /// Remove every entry that is no longer fresh as of `now`.
    pub async fn sweep_expired_at(&self, now: i64) -> usize {
        let mut removed = 0;
        for (key, meta) in self.backend.list_meta().await {
            if self.is_fresh(meta.timestamp, now) {
                continue;
            }
            match self.backend.remove_entry(&key).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(key = %key, error = %e, "failed to remove expired cache entry"),
            }
        }
        removed
    }
}
