//! Comment catalog API client.
//!
//! Resolves a content fingerprint to an episode and fetches that episode's
//! comments.
//!
//! ### Protocol
//!
//! - **Match**: `GET {base}match?fileName=..&hash=..&withAuth=true`
//! - **Comments**: `GET {base}comment/{episodeId}?withRelated=true`
//! - **Authentication**: `X-AppId`, `X-Timestamp`, `X-Signature` on every call,
//!   signed over the request path (see [`crate::sign`]).
//! - **Failures**: non-2xx status, transport errors and payloads with a
//!   non-zero `errorCode` are all errors. Nothing is retried.

pub mod error;
pub mod request;
pub mod response;

pub use error::CatalogError;
pub use request::{CommentRequest, MatchRequest};
pub use response::{ApiStatus, CommentResponse, MatchEntry, MatchResponse};

use async_trait::async_trait;
use danmaku_core::Comment;
use reqwest::header;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use url::Url;

use crate::sign::Signer;

/// Default base URL for the catalog API.
pub const DEFAULT_BASE_URL: &str = "https://api.dandanplay.net/api/v2/";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "danmaku-proxy/0.1";

/// Catalog client configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub app_id: String,
    pub app_secret: String,
    /// Base URL ending in `/`.
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Episode resolution and comment retrieval.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Resolve a file name and content fingerprint to an episode id.
    async fn match_episode(&self, file_name: &str, hash: &str) -> Result<i64, CatalogError>;

    /// Comments for an episode, related episodes included, in catalog order.
    async fn fetch_comments(&self, episode_id: i64) -> Result<Vec<Comment>, CatalogError>;
}

/// HTTP client for the catalog API.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
    signer: Signer,
}

impl CatalogClient {
    /// Create a new catalog client with the given configuration.
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        if config.app_id.is_empty() || config.app_secret.is_empty() {
            return Err(CatalogError::MissingCredentials);
        }

        let base_url = Url::parse(&config.base_url).map_err(|e| CatalogError::InvalidBaseUrl(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self { http, base_url, signer: Signer::new(config.app_id, config.app_secret) })
    }

    /// Signed GET against `endpoint`, relative to the base URL.
    async fn get_json<Q, T>(&self, endpoint: &str, query: &Q) -> Result<T, CatalogError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| CatalogError::InvalidBaseUrl(e.to_string()))?;
        let signature = self.signer.sign(url.path());
        let start = Instant::now();

        let response = self
            .http
            .get(url.clone())
            .headers(signature.headers())
            .header(header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(endpoint, status = status.as_u16(), elapsed = ?start.elapsed(), "catalog response");

        if !status.is_success() {
            return Err(CatalogError::HttpError { status: status.as_u16() });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Catalog for CatalogClient {
    async fn match_episode(&self, file_name: &str, hash: &str) -> Result<i64, CatalogError> {
        let req = MatchRequest { file_name, hash, with_auth: true };
        let response: MatchResponse = self.get_json("match", &req).await?;
        let entry = response.first_episode()?;

        tracing::debug!(
            file_name,
            hash,
            episode_id = entry.episode_id,
            candidates = response.matches.len(),
            "catalog match"
        );
        Ok(entry.episode_id)
    }

    async fn fetch_comments(&self, episode_id: i64) -> Result<Vec<Comment>, CatalogError> {
        let endpoint = format!("comment/{episode_id}");
        let response: CommentResponse = self
            .get_json(&endpoint, &CommentRequest { with_related: true })
            .await?;
        let comments = response.into_comments()?;

        tracing::debug!(episode_id, count = comments.len(), "fetched comments");
        Ok(comments)
    }
}
