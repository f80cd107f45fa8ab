//! Request signing for the catalog API.
//!
//! `X-Signature = base64(sha256(app_id + timestamp + path + app_secret))`,
//! sent alongside `X-AppId` and `X-Timestamp`. The path is the URL path only,
//! without the query string.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{HeaderMap, HeaderValue};
use sha2::{Digest, Sha256};

pub const APP_ID_HEADER: &str = "X-AppId";
pub const TIMESTAMP_HEADER: &str = "X-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Authentication material for one outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub app_id: String,
    pub timestamp: i64,
    pub value: String,
}

impl Signature {
    /// The three authentication headers.
    ///
    /// Values that are not valid header text are skipped; the server will
    /// reject the call as unauthenticated.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&self.app_id) {
            headers.insert(APP_ID_HEADER, v);
        }
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from(self.timestamp));
        if let Ok(v) = HeaderValue::from_str(&self.value) {
            headers.insert(SIGNATURE_HEADER, v);
        }
        headers
    }
}

/// Signs catalog requests with the application's shared secret.
#[derive(Clone)]
pub struct Signer {
    app_id: String,
    app_secret: String,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

impl Signer {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self { app_id: app_id.into(), app_secret: app_secret.into() }
    }

    /// Sign `path` with the current time. Call once per request.
    pub fn sign(&self, path: &str) -> Signature {
        self.sign_at(path, danmaku_core::now_unix())
    }

    /// Sign `path` with an explicit unix timestamp.
    pub fn sign_at(&self, path: &str, timestamp: i64) -> Signature {
        let mut hasher = Sha256::new();
        hasher.update(self.app_id.as_bytes());
        hasher.update(timestamp.to_string().as_bytes());
        hasher.update(path.as_bytes());
        hasher.update(self.app_secret.as_bytes());

        Signature { app_id: self.app_id.clone(), timestamp, value: STANDARD.encode(hasher.finalize()) }
    }
}
