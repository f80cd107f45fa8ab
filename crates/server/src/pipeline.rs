//! Request pipeline: cache check, fingerprint, catalog match, comment fetch,
//! render and store.
//!
//! Each step either advances the request or ends it with a typed
//! [`Error`]. Nothing is retried, and only a fully rendered document is
//! written back to the cache.

use std::sync::Arc;

use danmaku_client::{Catalog, Fingerprinter, file_name_from_url};
use danmaku_core::{CacheKey, Error, ResponseCache, SweepPolicy, now_unix, xml};

/// A document ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub document: Vec<u8>,
    pub cache_hit: bool,
}

/// Turns a media URL into an overlay document.
pub struct Pipeline {
    cache: ResponseCache,
    fingerprinter: Fingerprinter,
    catalog: Arc<dyn Catalog>,
    sweep: SweepPolicy,
}

impl Pipeline {
    pub fn new(cache: ResponseCache, fingerprinter: Fingerprinter, catalog: Arc<dyn Catalog>, sweep: SweepPolicy) -> Self {
        Self { cache, fingerprinter, catalog, sweep }
    }

    /// Handle one request for `url`.
    pub async fn handle(&self, url: Option<&str>) -> Result<Rendered, Error> {
        self.handle_at(url, now_unix()).await
    }

    /// [`Self::handle`] with an explicit clock.
    pub async fn handle_at(&self, url: Option<&str>, now: i64) -> Result<Rendered, Error> {
        let url = url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::InvalidInput("missing url parameter".into()))?;

        if self.sweep.should_sweep() {
            let removed = self.cache.sweep_expired_at(now).await;
            tracing::info!(removed, "swept expired cache entries");
        }

        let key = CacheKey::for_url(url);
        if let Some(cached) = self.cache.get_at(&key, now).await {
            tracing::info!(key = %key, episode_id = cached.episode_id, age_secs = now - cached.created_at, "cache hit");
            return Ok(Rendered { document: cached.body, cache_hit: true });
        }
        tracing::debug!(key = %key, "cache miss");

        let hash = self.fingerprinter.fingerprint_at(url, now).await?;
        let file_name = file_name_from_url(url);

        let episode_id = self.catalog.match_episode(&file_name, &hash).await.map_err(|e| {
            tracing::warn!(file_name = %file_name, hash = %hash, error = %e, "catalog match failed");
            Error::from(e)
        })?;

        let comments = self.catalog.fetch_comments(episode_id).await.map_err(|e| {
            tracing::warn!(episode_id, error = %e, "comment fetch failed");
            Error::from(e)
        })?;

        let document = xml::render(&comments, now).into_bytes();

        if let Err(e) = self.cache.put_at(&key, &document, url, episode_id, now).await {
            tracing::warn!(key = %key, error = %e, "failed to cache rendered document");
        }

        tracing::info!(key = %key, episode_id, comments = comments.len(), bytes = document.len(), "rendered document");
        Ok(Rendered { document, cache_hit: false })
    }
}
