//! Catalog API query parameters.

use serde::Serialize;

/// Query for the match endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest<'a> {
    pub file_name: &'a str,
    pub hash: &'a str,
    pub with_auth: bool,
}

/// Query for the comment endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub with_related: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_request_field_names() {
        let req = MatchRequest { file_name: "ep01.mkv", hash: "abc", with_auth: true };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["fileName"], "ep01.mkv");
        assert_eq!(json["hash"], "abc");
        assert_eq!(json["withAuth"], true);
    }

    #[test]
    fn test_comment_request_field_names() {
        let json = serde_json::to_value(CommentRequest { with_related: true }).unwrap();
        assert_eq!(json["withRelated"], true);
    }
}
