//! In-memory cache backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CacheBackend, CacheKey, DocumentMeta, FingerprintEntry};
use crate::Error;

#[derive(Default)]
struct Entries {
    documents: HashMap<CacheKey, Vec<u8>>,
    metas: HashMap<CacheKey, DocumentMeta>,
    fingerprints: HashMap<String, FingerprintEntry>,
}

/// Process-local backend. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<Entries>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn document_count(&self) -> usize {
        self.lock().documents.len()
    }

    #[cfg(test)]
    pub(crate) fn drop_document(&self, key: &CacheKey) {
        self.lock().documents.remove(key);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        // A poisoned map is still structurally valid.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn load_meta(&self, key: &CacheKey) -> Option<DocumentMeta> {
        self.lock().metas.get(key).cloned()
    }

    async fn load_document(&self, key: &CacheKey) -> Option<Vec<u8>> {
        self.lock().documents.get(key).cloned()
    }

    async fn store_document(&self, key: &CacheKey, document: &[u8], meta: &DocumentMeta) -> Result<(), Error> {
        let mut entries = self.lock();
        entries.documents.insert(key.clone(), document.to_vec());
        entries.metas.insert(key.clone(), meta.clone());
        Ok(())
    }

    async fn list_meta(&self) -> Vec<(CacheKey, DocumentMeta)> {
        self.lock()
            .metas
            .iter()
            .map(|(k, m)| (k.clone(), m.clone()))
            .collect()
    }

    async fn remove_entry(&self, key: &CacheKey) -> Result<(), Error> {
        let mut entries = self.lock();
        entries.documents.remove(key);
        entries.metas.remove(key);
        entries.fingerprints.remove(&key.fingerprint_key());
        Ok(())
    }

    async fn load_fingerprint(&self, key: &CacheKey) -> Option<FingerprintEntry> {
        self.lock().fingerprints.get(&key.fingerprint_key()).cloned()
    }

    async fn store_fingerprint(&self, key: &CacheKey, entry: &FingerprintEntry) -> Result<(), Error> {
        self.lock()
            .fingerprints
            .insert(key.fingerprint_key(), entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(ts: i64) -> DocumentMeta {
        DocumentMeta { timestamp: ts, url: "https://a/x.mkv".into(), episode_id: 7, size: 3 }
    }

    #[tokio::test]
    async fn test_document_round_trip() {
        let backend = MemoryBackend::new();
        let key = CacheKey::for_url("https://a/x.mkv");
        backend.store_document(&key, b"doc", &meta(1)).await.unwrap();

        assert_eq!(backend.load_document(&key).await.unwrap(), b"doc");
        assert_eq!(backend.load_meta(&key).await.unwrap(), meta(1));
        assert_eq!(backend.document_count(), 1);
    }

    #[tokio::test]
    async fn test_fingerprint_independent_of_document() {
        let backend = MemoryBackend::new();
        let key = CacheKey::for_url("https://a/x.mkv");
        let entry = FingerprintEntry { value: "abc".into(), written_at: 5 };
        backend.store_fingerprint(&key, &entry).await.unwrap();

        assert_eq!(backend.load_fingerprint(&key).await, Some(entry));
        assert!(backend.load_meta(&key).await.is_none());
        assert!(backend.list_meta().await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_entry_clears_all_three() {
        let backend = MemoryBackend::new();
        let key = CacheKey::for_url("https://a/x.mkv");
        backend.store_document(&key, b"doc", &meta(1)).await.unwrap();
        backend
            .store_fingerprint(&key, &FingerprintEntry { value: "abc".into(), written_at: 1 })
            .await
            .unwrap();

        backend.remove_entry(&key).await.unwrap();
        assert!(backend.load_document(&key).await.is_none());
        assert!(backend.load_meta(&key).await.is_none());
        assert!(backend.load_fingerprint(&key).await.is_none());
    }
}
