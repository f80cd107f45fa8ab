//! Catalog API client error types.

use std::sync::Arc;

/// Errors from the catalog API client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    /// App id or secret not configured.
    #[error("missing API credentials")]
    MissingCredentials,

    /// Base URL does not parse.
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// The match endpoint returned no candidates.
    #[error("no matching comment library found")]
    NoMatch,

    /// Non-success HTTP status.
    #[error("API request failed: HTTP {status}")]
    HttpError { status: u16 },

    /// The payload carried an explicit error code.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Request timeout.
    #[error("API request timed out")]
    Timeout,

    /// Network error.
    #[error("API network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("API response parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { CatalogError::Timeout } else { CatalogError::Network(Arc::new(err)) }
    }
}

impl From<CatalogError> for danmaku_core::Error {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NoMatch => danmaku_core::Error::NoMatch,
            other => danmaku_core::Error::Upstream(other.to_string()),
        }
    }
}
