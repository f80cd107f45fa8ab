//! Cache backend trait.

use async_trait::async_trait;

use super::{CacheKey, DocumentMeta, FingerprintEntry};
use crate::Error;

/// Pluggable storage for rendered documents and content fingerprints.
///
/// Backends only store and retrieve; TTL decisions belong to
/// [`super::ResponseCache`] and the fingerprinter. Reads degrade to `None`
/// on any error so a broken entry behaves like a miss.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Metadata record for a document, if present and readable.
    async fn load_meta(&self, key: &CacheKey) -> Option<DocumentMeta>;

    /// Raw document bytes, if present.
    async fn load_document(&self, key: &CacheKey) -> Option<Vec<u8>>;

    /// Write document bytes and metadata, replacing any existing entry.
    async fn store_document(&self, key: &CacheKey, document: &[u8], meta: &DocumentMeta) -> Result<(), Error>;

    /// Every readable metadata record. Unreadable records are skipped.
    async fn list_meta(&self) -> Vec<(CacheKey, DocumentMeta)>;

    /// Remove the document, its metadata and the fingerprint sharing its key.
    async fn remove_entry(&self, key: &CacheKey) -> Result<(), Error>;

    /// Fingerprint stored for the URL behind `key`.
    async fn load_fingerprint(&self, key: &CacheKey) -> Option<FingerprintEntry>;

    /// Write a fingerprint, replacing any existing one.
    async fn store_fingerprint(&self, key: &CacheKey, entry: &FingerprintEntry) -> Result<(), Error>;
}
