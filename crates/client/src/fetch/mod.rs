//! Bounded media prefix fetch with SSRF protection.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string
//!
//! ### SSRF & Safety Gates
//! - Deny private ranges (RFC1918, link-local, localhost, etc.)
//! - Resolve DNS through a checking resolver so the validated addresses are
//!   the ones connected to.
//! - Re-check IP-literal hosts on every redirect hop. Max redirects: 5
//!
//! ### Prefix Read
//! - `Range: bytes=0-{N-1}`; both `200` and `206` are accepted.
//! - Body is streamed and cut at N bytes, so servers that ignore the range
//!   header cost at most N bytes of reading.
//! - Content decoding is off: the hashed bytes are the bytes on the wire.

pub mod ssrf;
pub mod url;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, StatusCode, header};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use ssrf::{GuardedResolver, SsrfError, check_literal, is_private_or_reserved, validate_ip};
pub use url::{UrlError, canonicalize, file_name_from_url};

use danmaku_core::Error;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "danmaku-proxy/0.1")
    pub user_agent: String,

    /// Request timeout (default: 15s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Refuse hosts that resolve to private or reserved addresses (default: true)
    pub block_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "danmaku-proxy/0.1".to_string(),
            timeout: Duration::from_millis(15000),
            max_redirects: 5,
            block_private_hosts: true,
        }
    }
}

/// Reads the leading bytes of a remote resource.
#[async_trait]
pub trait PrefixFetcher: Send + Sync {
    /// At most `max_bytes` bytes from the start of `url`.
    ///
    /// Fails with [`Error::FetchFailed`] when nothing could be read.
    async fn fetch_prefix(&self, url: &str, max_bytes: usize) -> Result<Bytes, Error>;
}

/// HTTP prefix fetcher with safety checks.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
    blocked: Option<fn(IpAddr) -> bool>,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let blocked = config
            .block_private_hosts
            .then_some(is_private_or_reserved as fn(IpAddr) -> bool);
        Self::build(config, blocked)
    }

    /// Build with an explicit address blocklist; `None` disables the guard.
    fn build(config: FetchConfig, blocked: Option<fn(IpAddr) -> bool>) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .no_gzip()
            .no_brotli()
            .no_deflate();

        builder = match blocked {
            Some(blocked) => builder
                .redirect(ssrf::redirect_policy(config.max_redirects, blocked))
                .dns_resolver(Arc::new(GuardedResolver::new(blocked))),
            None => builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects)),
        };

        let http = builder
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config, blocked })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

/// An error and its sources, joined with `: `.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        out.push_str(": ");
        out.push_str(&e.to_string());
        source = e.source();
    }
    out
}

#[async_trait]
impl PrefixFetcher for FetchClient {
    async fn fetch_prefix(&self, url_str: &str, max_bytes: usize) -> Result<Bytes, Error> {
        let start = Instant::now();
        let max_bytes = max_bytes.max(1);
        let url = canonicalize(url_str)?;

        if let Some(blocked) = self.blocked {
            check_literal(&url, blocked)?;
        }

        let mut response = self
            .http
            .get(url.as_str())
            .header(header::RANGE, format!("bytes=0-{}", max_bytes - 1))
            .send()
            .await
            .map_err(|e| Error::FetchFailed(format!("network error: {}", error_chain(&e))))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            return Err(Error::FetchFailed(format!("status {}", status.as_u16())));
        }

        let capacity = response
            .content_length()
            .map_or(max_bytes, |len| (len as usize).min(max_bytes));
        let mut buf = BytesMut::with_capacity(capacity);

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::FetchFailed(format!("failed to read response: {e}")))?
        {
            let remaining = max_bytes - buf.len();
            if chunk.len() >= remaining {
                buf.extend_from_slice(&chunk[..remaining]);
                break;
            }
            buf.extend_from_slice(&chunk);
        }

        if buf.is_empty() {
            return Err(Error::FetchFailed("empty response body".to_string()));
        }

        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            bytes = buf.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched media prefix"
        );

        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        http::{HeaderMap, StatusCode as AxumStatus},
        response::IntoResponse,
        routing::get,
    };
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BODY_LEN: usize = 4096;

    fn body() -> Vec<u8> {
        (0..BODY_LEN).map(|i| (i % 251) as u8).collect()
    }

    /// Serves `body()`; honours a `bytes=0-N` range only on `/ranged`.
    async fn media_server(hits: Arc<AtomicUsize>) -> String {
        let ranged_hits = hits.clone();
        let full_hits = hits;
        let router = Router::new()
            .route(
                "/ranged.mkv",
                get(move |headers: HeaderMap| {
                    let hits = ranged_hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        let end = headers
                            .get("range")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.strip_prefix("bytes=0-"))
                            .and_then(|v| v.parse::<usize>().ok())
                            .unwrap_or(BODY_LEN - 1);
                        (AxumStatus::PARTIAL_CONTENT, body()[..=end.min(BODY_LEN - 1)].to_vec())
                    }
                }),
            )
            .route(
                "/full.mkv",
                get(move || {
                    let hits = full_hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        body()
                    }
                }),
            )
            .route("/empty.mkv", get(|| async { Vec::<u8>::new() }))
            .route("/missing.mkv", get(|| async { AxumStatus::NOT_FOUND.into_response() }))
            .route(
                "/encoded.mkv",
                get(|| async { ([("content-encoding", "gzip")], b"not really gzip".to_vec()) }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn local_client() -> FetchClient {
        FetchClient::new(FetchConfig {
            block_private_hosts: false,
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "danmaku-proxy/0.1");
        assert_eq!(config.timeout, Duration::from_millis(15000));
        assert_eq!(config.max_redirects, 5);
        assert!(config.block_private_hosts);
    }

    #[tokio::test]
    async fn test_ranged_prefix() {
        let base = media_server(Arc::new(AtomicUsize::new(0))).await;
        let bytes = local_client().fetch_prefix(&format!("{base}/ranged.mkv"), 100).await.unwrap();
        assert_eq!(bytes.as_ref(), &body()[..100]);
    }

    #[tokio::test]
    async fn test_range_ignored_is_truncated() {
        let base = media_server(Arc::new(AtomicUsize::new(0))).await;
        let bytes = local_client().fetch_prefix(&format!("{base}/full.mkv"), 1000).await.unwrap();
        assert_eq!(bytes.len(), 1000);
        assert_eq!(bytes.as_ref(), &body()[..1000]);
    }

    #[tokio::test]
    async fn test_short_resource_returned_whole() {
        let base = media_server(Arc::new(AtomicUsize::new(0))).await;
        let bytes = local_client()
            .fetch_prefix(&format!("{base}/full.mkv"), 16 * 1024 * 1024)
            .await
            .unwrap();
        assert_eq!(bytes.len(), BODY_LEN);
    }

    #[tokio::test]
    async fn test_empty_body_fails() {
        let base = media_server(Arc::new(AtomicUsize::new(0))).await;
        let result = local_client().fetch_prefix(&format!("{base}/empty.mkv"), 100).await;
        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let base = media_server(Arc::new(AtomicUsize::new(0))).await;
        let result = local_client().fetch_prefix(&format!("{base}/missing.mkv"), 100).await;
        assert!(matches!(result, Err(Error::FetchFailed(ref m)) if m.contains("404")));
    }

    #[tokio::test]
    async fn test_content_encoding_not_decoded() {
        let base = media_server(Arc::new(AtomicUsize::new(0))).await;
        let bytes = local_client().fetch_prefix(&format!("{base}/encoded.mkv"), 100).await.unwrap();
        assert_eq!(bytes.as_ref(), b"not really gzip");
    }

    #[tokio::test]
    async fn test_private_host_blocked_before_request() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = media_server(hits.clone()).await;
        let client = FetchClient::new(FetchConfig::default()).unwrap();

        let result = client.fetch_prefix(&format!("{base}/full.mkv"), 100).await;
        assert!(matches!(result, Err(Error::FetchFailed(ref m)) if m.contains("blocked")));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    /// Binds on all interfaces; `/hop` redirects to `location`, `/full.mkv` counts hits.
    async fn redirect_server(location: Option<String>, hits: Arc<AtomicUsize>) -> u16 {
        let listener = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let location = location.unwrap_or_else(|| format!("http://127.0.0.1:{port}/full.mkv"));
        let router = Router::new()
            .route(
                "/hop",
                get(move || {
                    let location = location.clone();
                    async move { axum::response::Redirect::temporary(&location) }
                }),
            )
            .route(
                "/full.mkv",
                get(move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        body()
                    }
                }),
            );
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        port
    }

    fn guarded_client(blocked: fn(IpAddr) -> bool) -> FetchClient {
        let config = FetchConfig { timeout: Duration::from_secs(2), ..Default::default() };
        FetchClient::build(config, Some(blocked)).unwrap()
    }

    #[tokio::test]
    async fn test_redirect_to_blocked_address_refused() {
        let hits = Arc::new(AtomicUsize::new(0));
        let port = redirect_server(None, hits.clone()).await;
        let client = guarded_client(|ip| ip == IpAddr::from([127, 0, 0, 1]));

        let result = client.fetch_prefix(&format!("http://127.0.0.2:{port}/hop"), 100).await;
        assert!(matches!(result, Err(Error::FetchFailed(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_redirect_to_allowed_address_followed() {
        let hits = Arc::new(AtomicUsize::new(0));
        let port = redirect_server(None, hits.clone()).await;
        let client = guarded_client(|_| false);

        let bytes = client.fetch_prefix(&format!("http://127.0.0.1:{port}/hop"), 100).await.unwrap();
        assert_eq!(bytes.as_ref(), &body()[..100]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_redirect_to_other_scheme_refused() {
        let hits = Arc::new(AtomicUsize::new(0));
        let port = redirect_server(Some("file:///etc/passwd".to_string()), hits).await;
        let client = guarded_client(|_| false);

        let result = client.fetch_prefix(&format!("http://127.0.0.1:{port}/hop"), 100).await;
        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_hostname_resolving_to_blocked_address_refused() {
        let hits = Arc::new(AtomicUsize::new(0));
        let port = redirect_server(None, hits.clone()).await;
        let client = guarded_client(is_private_or_reserved);

        let result = client.fetch_prefix(&format!("http://localhost:{port}/full.mkv"), 100).await;
        assert!(matches!(result, Err(Error::FetchFailed(ref m)) if m.contains("blocked")));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_scheme_fails() {
        let result = local_client().fetch_prefix("file:///etc/passwd", 100).await;
        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = local_client().fetch_prefix(&format!("http://{addr}/a.mkv"), 100).await;
        assert!(matches!(result, Err(Error::FetchFailed(ref m)) if m.contains("network")));
    }
}
