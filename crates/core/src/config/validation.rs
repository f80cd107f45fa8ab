//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `api_base_url` does not parse or lacks a trailing slash
    /// - `document_ttl_secs` is 0, or `fingerprint_ttl_secs` is not longer than it
    /// - `sweep_probability` is outside `[0, 1]`
    /// - `max_prefix_bytes` is 0 or exceeds 64MB
    /// - `api_timeout_ms` is not shorter than `fetch_timeout_ms`, or either is out of range
    /// - `user_agent` or `bind_addr` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.api_base_url).map_err(|e| invalid("api_base_url", &e.to_string()))?;
        if !self.api_base_url.ends_with('/') {
            return Err(invalid("api_base_url", "must end with '/'"));
        }

        if self.document_ttl_secs == 0 {
            return Err(invalid("document_ttl_secs", "must be greater than 0"));
        }
        if self.fingerprint_ttl_secs <= self.document_ttl_secs {
            return Err(invalid("fingerprint_ttl_secs", "must be longer than document_ttl_secs"));
        }

        if !(0.0..=1.0).contains(&self.sweep_probability) {
            return Err(invalid("sweep_probability", "must be between 0 and 1"));
        }

        if self.max_prefix_bytes == 0 {
            return Err(invalid("max_prefix_bytes", "must be greater than 0"));
        }
        if self.max_prefix_bytes > 64 * 1024 * 1024 {
            return Err(invalid("max_prefix_bytes", "must not exceed 64MB"));
        }

        if self.api_timeout_ms < 100 {
            return Err(invalid("api_timeout_ms", "must be at least 100ms"));
        }
        if self.fetch_timeout_ms > 300_000 {
            return Err(invalid("fetch_timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }
        if self.api_timeout_ms >= self.fetch_timeout_ms {
            return Err(invalid("api_timeout_ms", "must be shorter than fetch_timeout_ms"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.bind_addr.is_empty() {
            return Err(invalid("bind_addr", "must not be empty"));
        }

        if !self.block_private_hosts {
            tracing::warn!("block_private_hosts is disabled; media URLs may reach internal addresses");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: &AppConfig, expected: &str) {
        let result = config.validate();
        assert!(
            matches!(&result, Err(ConfigError::Invalid { field, .. }) if field == expected),
            "expected {expected} to be invalid, got {result:?}"
        );
    }

    #[test]
    fn test_validate_default_config() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_base_url() {
        let config = AppConfig { api_base_url: "not a url".into(), ..Default::default() };
        assert_invalid(&config, "api_base_url");
    }

    #[test]
    fn test_validate_base_url_without_trailing_slash() {
        let config = AppConfig { api_base_url: "https://api.example.com/api/v2".into(), ..Default::default() };
        assert_invalid(&config, "api_base_url");
    }

    #[test]
    fn test_validate_fingerprint_ttl_must_exceed_document_ttl() {
        let config = AppConfig { document_ttl_secs: 3600, fingerprint_ttl_secs: 3600, ..Default::default() };
        assert_invalid(&config, "fingerprint_ttl_secs");
    }

    #[test]
    fn test_validate_zero_document_ttl() {
        let config = AppConfig { document_ttl_secs: 0, ..Default::default() };
        assert_invalid(&config, "document_ttl_secs");
    }

    #[test]
    fn test_validate_sweep_probability_range() {
        assert_invalid(&AppConfig { sweep_probability: 1.5, ..Default::default() }, "sweep_probability");
        assert_invalid(&AppConfig { sweep_probability: -0.1, ..Default::default() }, "sweep_probability");
        assert!(AppConfig { sweep_probability: 0.0, ..Default::default() }.validate().is_ok());
        assert!(AppConfig { sweep_probability: 1.0, ..Default::default() }.validate().is_ok());
    }

    #[test]
    fn test_validate_max_prefix_bytes() {
        assert_invalid(&AppConfig { max_prefix_bytes: 0, ..Default::default() }, "max_prefix_bytes");
        assert_invalid(&AppConfig { max_prefix_bytes: 65 * 1024 * 1024, ..Default::default() }, "max_prefix_bytes");
    }

    #[test]
    fn test_validate_api_timeout_shorter_than_fetch() {
        let config = AppConfig { api_timeout_ms: 20_000, fetch_timeout_ms: 15_000, ..Default::default() };
        assert_invalid(&config, "api_timeout_ms");
    }

    #[test]
    fn test_validate_fetch_timeout_limit() {
        let config = AppConfig { fetch_timeout_ms: 301_000, ..Default::default() };
        assert_invalid(&config, "fetch_timeout_ms");
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_invalid(&config, "user_agent");
    }
}
