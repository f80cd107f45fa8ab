//! SQLite-backed [`CacheBackend`] operations.
//!
//! Documents and fingerprints live in separate tables; removing an entry
//! deletes from both in one transaction.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

use super::connection::CacheDb;
use super::{CacheBackend, CacheKey, DocumentMeta, FingerprintEntry};
use crate::Error;

/// Log a failed read and treat it as a miss.
fn degrade<T>(result: Result<Option<T>, Error>, what: &str) -> Option<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "sqlite cache read failed: {what}");
        None
    })
}

#[async_trait]
impl CacheBackend for CacheDb {
    async fn load_meta(&self, key: &CacheKey) -> Option<DocumentMeta> {
        let key = key.as_str().to_string();
        let result = self
            .conn
            .call(move |conn| -> Result<Option<DocumentMeta>, Error> {
                let meta = conn
                    .query_row(
                        "SELECT created_at, source_url, episode_id, size FROM documents WHERE cache_key = ?1",
                        params![key],
                        |row| {
                            Ok(DocumentMeta {
                                timestamp: row.get(0)?,
                                url: row.get(1)?,
                                episode_id: row.get(2)?,
                                size: row.get::<_, i64>(3)? as u64,
                            })
                        },
                    )
                    .optional()?;
                Ok(meta)
            })
            .await
            .map_err(Error::from);
        degrade(result, "document metadata")
    }

    async fn load_document(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let key = key.as_str().to_string();
        let result = self
            .conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> {
                let body = conn
                    .query_row("SELECT body FROM documents WHERE cache_key = ?1", params![key], |row| row.get(0))
                    .optional()?;
                Ok(body)
            })
            .await
            .map_err(Error::from);
        degrade(result, "document body")
    }

    async fn store_document(&self, key: &CacheKey, document: &[u8], meta: &DocumentMeta) -> Result<(), Error> {
        let key = key.as_str().to_string();
        let document = document.to_vec();
        let meta = meta.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO documents (cache_key, body, created_at, source_url, episode_id, size)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(cache_key) DO UPDATE SET
                        body = excluded.body,
                        created_at = excluded.created_at,
                        source_url = excluded.source_url,
                        episode_id = excluded.episode_id,
                        size = excluded.size",
                    params![key, document, meta.timestamp, meta.url, meta.episode_id, meta.size as i64],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn list_meta(&self) -> Vec<(CacheKey, DocumentMeta)> {
        let result = self
            .conn
            .call(|conn| -> Result<Vec<(String, DocumentMeta)>, Error> {
                let mut stmt =
                    conn.prepare("SELECT cache_key, created_at, source_url, episode_id, size FROM documents")?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            DocumentMeta {
                                timestamp: row.get(1)?,
                                url: row.get(2)?,
                                episode_id: row.get(3)?,
                                size: row.get::<_, i64>(4)? as u64,
                            },
                        ))
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from);

        match result {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|(raw, meta)| CacheKey::from_raw(&raw).map(|key| (key, meta)))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "sqlite cache listing failed");
                Vec::new()
            }
        }
    }

    async fn remove_entry(&self, key: &CacheKey) -> Result<(), Error> {
        let doc_key = key.as_str().to_string();
        let fp_key = key.fingerprint_key();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM documents WHERE cache_key = ?1", params![doc_key])?;
                tx.execute("DELETE FROM fingerprints WHERE fingerprint_key = ?1", params![fp_key])?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn load_fingerprint(&self, key: &CacheKey) -> Option<FingerprintEntry> {
        let fp_key = key.fingerprint_key();
        let result = self
            .conn
            .call(move |conn| -> Result<Option<FingerprintEntry>, Error> {
                let entry = conn
                    .query_row(
                        "SELECT value, written_at FROM fingerprints WHERE fingerprint_key = ?1",
                        params![fp_key],
                        |row| Ok(FingerprintEntry { value: row.get(0)?, written_at: row.get(1)? }),
                    )
                    .optional()?;
                Ok(entry)
            })
            .await
            .map_err(Error::from);
        degrade(result, "fingerprint")
    }

    async fn store_fingerprint(&self, key: &CacheKey, entry: &FingerprintEntry) -> Result<(), Error> {
        let fp_key = key.fingerprint_key();
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO fingerprints (fingerprint_key, value, written_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(fingerprint_key) DO UPDATE SET
                        value = excluded.value,
                        written_at = excluded.written_at",
                    params![fp_key, entry.value, entry.written_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
