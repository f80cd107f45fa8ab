//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DANMAKU_*)
//! 2. TOML config file (if DANMAKU_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Storage backend selected for the response and fingerprint caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Flat directory: `<key>.xml`, `<key>.meta`, `<key>_hash`.
    Fs,
    /// Single SQLite database file.
    Sqlite,
    /// Process-local maps; nothing survives a restart.
    Memory,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (DANMAKU_*)
/// 2. TOML config file (if DANMAKU_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Open platform application id.
    ///
    /// Set via DANMAKU_APP_ID environment variable.
    #[serde(default)]
    pub app_id: Option<String>,

    /// Open platform application secret, used only for request signing.
    ///
    /// Set via DANMAKU_APP_SECRET environment variable.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Base URL of the catalog API, including the trailing `/api/v2/`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Which cache backend to use.
    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackendKind,

    /// Directory for the flat-file backend.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Path to the SQLite cache database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Lifetime of a rendered document, in seconds.
    #[serde(default = "default_document_ttl_secs")]
    pub document_ttl_secs: u64,

    /// Lifetime of a content fingerprint, in seconds.
    #[serde(default = "default_fingerprint_ttl_secs")]
    pub fingerprint_ttl_secs: u64,

    /// Fraction of requests that run the expired-entry sweep.
    #[serde(default = "default_sweep_probability")]
    pub sweep_probability: f64,

    /// Prefix length hashed for the content fingerprint.
    #[serde(default = "default_max_prefix_bytes")]
    pub max_prefix_bytes: usize,

    /// Timeout for the ranged content fetch, in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Timeout for catalog API calls, in milliseconds.
    #[serde(default = "default_api_timeout_ms")]
    pub api_timeout_ms: u64,

    /// User-Agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Listen address for the HTTP server.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Refuse to fetch media from private, loopback or reserved addresses.
    #[serde(default = "default_true")]
    pub block_private_hosts: bool,
}

fn default_api_base_url() -> String {
    "https://api.dandanplay.net/api/v2/".into()
}

fn default_cache_backend() -> CacheBackendKind {
    CacheBackendKind::Fs
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./danmaku_cache")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./danmaku-cache.sqlite")
}

fn default_document_ttl_secs() -> u64 {
    86_400 // 24h
}

fn default_fingerprint_ttl_secs() -> u64 {
    604_800 // 7d
}

fn default_sweep_probability() -> f64 {
    0.01
}

fn default_max_prefix_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_fetch_timeout_ms() -> u64 {
    15_000
}

fn default_api_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    "danmaku-proxy/0.1".into()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_secret: None,
            api_base_url: default_api_base_url(),
            cache_backend: default_cache_backend(),
            cache_dir: default_cache_dir(),
            db_path: default_db_path(),
            document_ttl_secs: default_document_ttl_secs(),
            fingerprint_ttl_secs: default_fingerprint_ttl_secs(),
            sweep_probability: default_sweep_probability(),
            max_prefix_bytes: default_max_prefix_bytes(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            api_timeout_ms: default_api_timeout_ms(),
            user_agent: default_user_agent(),
            bind_addr: default_bind_addr(),
            block_private_hosts: true,
        }
    }
}

impl AppConfig {
    /// Document TTL as Duration.
    pub fn document_ttl(&self) -> Duration {
        Duration::from_secs(self.document_ttl_secs)
    }

    /// Fingerprint TTL as Duration.
    pub fn fingerprint_ttl(&self) -> Duration {
        Duration::from_secs(self.fingerprint_ttl_secs)
    }

    /// Content fetch timeout as Duration for use with reqwest.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Catalog API timeout as Duration for use with reqwest.
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `DANMAKU_`
    /// 2. TOML file from `DANMAKU_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DANMAKU_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DANMAKU_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Application id and secret for request signing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if either value is unset or empty.
    pub fn require_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let app_id = self
            .app_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "app_id".into(),
                hint: "Set DANMAKU_APP_ID environment variable".into(),
            })?;
        let app_secret = self
            .app_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "app_secret".into(),
                hint: "Set DANMAKU_APP_SECRET environment variable".into(),
            })?;
        Ok((app_id, app_secret))
    }
}
