//! Catalog API response types.

use danmaku_core::Comment;
use serde::Deserialize;

use super::CatalogError;

/// Error fields shared by every catalog payload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

impl ApiStatus {
    /// Fail if the payload reports an error.
    ///
    /// A missing or zero `errorCode` with `success` absent or true is success.
    pub fn check(&self) -> Result<(), CatalogError> {
        let code = self.error_code.unwrap_or(0);
        if code != 0 || self.success == Some(false) {
            return Err(CatalogError::Api {
                code,
                message: self
                    .error_message
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(())
    }
}

/// Response from the match endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    #[serde(flatten)]
    pub status: ApiStatus,
    #[serde(default)]
    pub is_matched: Option<bool>,
    #[serde(default)]
    pub matches: Vec<MatchEntry>,
}

/// One candidate episode.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    pub episode_id: i64,
    #[serde(default)]
    pub anime_title: Option<String>,
    #[serde(default)]
    pub episode_title: Option<String>,
}

impl MatchResponse {
    /// The first candidate. Ranking belongs to the remote service.
    pub fn first_episode(&self) -> Result<&MatchEntry, CatalogError> {
        self.status.check()?;
        self.matches.first().ok_or(CatalogError::NoMatch)
    }
}

/// Response from the comment endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    #[serde(flatten)]
    pub status: ApiStatus,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl CommentResponse {
    pub fn into_comments(self) -> Result<Vec<Comment>, CatalogError> {
        self.status.check()?;
        Ok(self.comments)
    }
}
