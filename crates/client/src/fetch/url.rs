//! URL canonicalization and naming helpers for media URLs.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for danmaku_core::Error {
    fn from(err: UrlError) -> Self {
        danmaku_core::Error::FetchFailed(err.to_string())
    }
}

/// Canonicalize a media URL before it is fetched.
///
/// Trims whitespace, defaults the scheme to `https`, lowercases the host and
/// drops the fragment. The query string is kept as-is since signed media
/// URLs depend on it.
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// File name sent to the catalog match endpoint: the last non-empty path
/// segment of `input`, exactly as it appears in the URL.
///
/// Falls back to the whole input when it does not parse or has no path.
pub fn file_name_from_url(input: &str) -> String {
    url::Url::parse(input.trim())
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
        })
        .unwrap_or_else(|| input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("cdn.example.com/v/ep01.mkv").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://CDN.Example.COM/Ep01.mkv").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
        assert_eq!(url.path(), "/Ep01.mkv");
    }

    #[test]
    fn test_canonicalize_keeps_signed_query() {
        let url = canonicalize("https://cdn.example.com/ep01.mkv?token=abc&exp=1#t=30").unwrap();
        assert_eq!(url.query(), Some("token=abc&exp=1"));
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_canonicalize_rejects_other_schemes() {
        assert!(matches!(canonicalize("file:///etc/passwd"), Err(UrlError::UnsupportedScheme(_))));
        assert!(matches!(canonicalize("ftp://example.com/a.mkv"), Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize(""), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_url_error_maps_to_fetch_failed() {
        let err: danmaku_core::Error = UrlError::Empty.into();
        assert!(matches!(err, danmaku_core::Error::FetchFailed(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_file_name_last_segment() {
        assert_eq!(file_name_from_url("https://cdn.example.com/show/ep01.mkv?token=x"), "ep01.mkv");
        assert_eq!(file_name_from_url("https://cdn.example.com/show/ep01.mkv/"), "ep01.mkv");
    }

    #[test]
    fn test_file_name_stays_encoded() {
        assert_eq!(file_name_from_url("https://cdn.example.com/%E7%AC%AC01%E8%A9%B1.mkv"), "%E7%AC%AC01%E8%A9%B1.mkv");
    }

    #[test]
    fn test_file_name_fallback() {
        assert_eq!(file_name_from_url("not a url"), "not a url");
        assert_eq!(file_name_from_url("https://cdn.example.com/"), "https://cdn.example.com/");
    }
}
