//! Flat-directory cache backend.
//!
//! Three files per source URL, side by side in one directory:
//!
//! - `<key>.xml`: the rendered document
//! - `<key>.meta`: JSON `{timestamp, url, episodeId, size}`
//! - `<key>_hash`: the raw fingerprint; its age is the file's mtime
//!
//! Writes are plain overwrites. Concurrent writers for the same key may leave
//! a torn file, which reads back as a miss and is rebuilt on the next request.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;

use super::{CacheBackend, CacheKey, DocumentMeta, FingerprintEntry};
use crate::Error;

const DOCUMENT_EXT: &str = ".xml";
const META_EXT: &str = ".meta";

/// Cache backend rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FsBackend {
    dir: PathBuf,
}

impl FsBackend {
    /// Open the backend, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns `Error::CacheUnavailable` if the directory cannot be created.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::CacheUnavailable(format!("{}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}{DOCUMENT_EXT}"))
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}{META_EXT}"))
    }

    fn fingerprint_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.fingerprint_key())
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), Error> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn read_meta(path: &Path) -> Option<DocumentMeta> {
    let raw = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice(&raw) {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "unreadable cache metadata");
            None
        }
    }
}

#[async_trait]
impl CacheBackend for FsBackend {
    async fn load_meta(&self, key: &CacheKey) -> Option<DocumentMeta> {
        read_meta(&self.meta_path(key)).await
    }

    async fn load_document(&self, key: &CacheKey) -> Option<Vec<u8>> {
        tokio::fs::read(self.document_path(key)).await.ok()
    }

    async fn store_document(&self, key: &CacheKey, document: &[u8], meta: &DocumentMeta) -> Result<(), Error> {
        let meta_json = serde_json::to_vec(meta).map_err(|e| Error::Storage(e.to_string()))?;
        tokio::fs::write(self.document_path(key), document).await?;
        tokio::fs::write(self.meta_path(key), meta_json).await?;
        Ok(())
    }

    async fn list_meta(&self) -> Vec<(CacheKey, DocumentMeta)> {
        let mut out = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "cannot list cache directory");
                return out;
            }
        };

        while let Ok(Some(entry)) = dir.next_entry().await {
            let name = entry.file_name();
            let Some(key) = name
                .to_str()
                .and_then(|n| n.strip_suffix(META_EXT))
                .and_then(CacheKey::from_raw)
            else {
                continue;
            };
            if let Some(meta) = read_meta(&entry.path()).await {
                out.push((key, meta));
            }
        }
        out
    }

    async fn remove_entry(&self, key: &CacheKey) -> Result<(), Error> {
        remove_if_exists(&self.meta_path(key)).await?;
        remove_if_exists(&self.document_path(key)).await?;
        remove_if_exists(&self.fingerprint_path(key)).await
    }

    async fn load_fingerprint(&self, key: &CacheKey) -> Option<FingerprintEntry> {
        let path = self.fingerprint_path(key);
        let modified = tokio::fs::metadata(&path).await.ok()?.modified().ok()?;
        let written_at = modified.duration_since(UNIX_EPOCH).ok()?.as_secs() as i64;
        let value = tokio::fs::read_to_string(&path).await.ok()?;
        if value.is_empty() {
            return None;
        }
        Some(FingerprintEntry { value, written_at })
    }

    /// Writes the raw value; `written_at` comes back from the file mtime.
    async fn store_fingerprint(&self, key: &CacheKey, entry: &FingerprintEntry) -> Result<(), Error> {
        tokio::fs::write(self.fingerprint_path(key), entry.value.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::now_unix;
    use tempfile::tempdir;

    fn meta(ts: i64, url: &str) -> DocumentMeta {
        DocumentMeta { timestamp: ts, url: url.into(), episode_id: 1001, size: 3 }
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let backend = FsBackend::open(&nested).await.unwrap();
        assert!(backend.dir().is_dir());
    }

    #[tokio::test]
    async fn test_open_unavailable() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        let result = FsBackend::open(file.join("cache")).await;
        assert!(matches!(result, Err(Error::CacheUnavailable(_))));
    }

    #[tokio::test]
    async fn test_file_layout() {
        let dir = tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).await.unwrap();
        let key = CacheKey::for_url("https://a/x.mkv");

        backend
            .store_document(&key, b"doc", &meta(1_700_000_000, "https://a/x.mkv"))
            .await
            .unwrap();
        backend
            .store_fingerprint(&key, &FingerprintEntry { value: "f00d".into(), written_at: 0 })
            .await
            .unwrap();

        let xml = dir.path().join(format!("{key}.xml"));
        let meta_file = dir.path().join(format!("{key}.meta"));
        let hash_file = dir.path().join(format!("{key}_hash"));
        assert_eq!(std::fs::read(&xml).unwrap(), b"doc");
        assert_eq!(std::fs::read_to_string(&hash_file).unwrap(), "f00d");

        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&meta_file).unwrap()).unwrap();
        assert_eq!(json["timestamp"], 1_700_000_000);
        assert_eq!(json["url"], "https://a/x.mkv");
        assert_eq!(json["episodeId"], 1001);
        assert_eq!(json["size"], 3);
    }

    #[tokio::test]
    async fn test_fingerprint_age_from_mtime() {
        let dir = tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).await.unwrap();
        let key = CacheKey::for_url("https://a/x.mkv");

        let before = now_unix();
        backend
            .store_fingerprint(&key, &FingerprintEntry { value: "f00d".into(), written_at: 0 })
            .await
            .unwrap();

        let entry = backend.load_fingerprint(&key).await.unwrap();
        assert_eq!(entry.value, "f00d");
        assert!(entry.written_at >= before - 1);
    }

    #[tokio::test]
    async fn test_corrupt_meta_is_miss() {
        let dir = tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).await.unwrap();
        let key = CacheKey::for_url("https://a/x.mkv");
        std::fs::write(dir.path().join(format!("{key}.meta")), b"{not json").unwrap();

        assert!(backend.load_meta(&key).await.is_none());
        assert!(backend.list_meta().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_and_remove() {
        let dir = tempdir().unwrap();
        let backend = FsBackend::open(dir.path()).await.unwrap();
        let a = CacheKey::for_url("https://a/1.mkv");
        let b = CacheKey::for_url("https://a/2.mkv");
        backend.store_document(&a, b"one", &meta(10, "https://a/1.mkv")).await.unwrap();
        backend.store_document(&b, b"two", &meta(20, "https://a/2.mkv")).await.unwrap();
        backend
            .store_fingerprint(&a, &FingerprintEntry { value: "h".into(), written_at: 0 })
            .await
            .unwrap();
        std::fs::write(dir.path().join("stray.meta"), b"{}").unwrap();

        let mut listed = backend.list_meta().await;
        listed.sort_by_key(|(_, m)| m.timestamp);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].0, a);

        backend.remove_entry(&a).await.unwrap();
        assert!(!dir.path().join(format!("{a}.xml")).exists());
        assert!(!dir.path().join(format!("{a}.meta")).exists());
        assert!(!dir.path().join(format!("{a}_hash")).exists());
        assert!(dir.path().join(format!("{b}.xml")).exists());

        // Removing again is not an error.
        backend.remove_entry(&a).await.unwrap();
    }
}
