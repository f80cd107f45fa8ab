//! HTTP handlers and routing.

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use danmaku_core::Error;
use serde::Deserialize;

use crate::error::{XML_CONTENT_TYPE, error_response};
use crate::state::AppState;

/// Whether the document came from cache: `HIT` or `MISS`.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Query string of the overlay endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct DanmakuParams {
    /// Media URL to resolve.
    pub url: Option<String>,
}

/// `GET /?url=...`: the overlay document for a media URL.
///
/// A query string that does not deserialize (a repeated `url`, say) is
/// answered like a missing parameter.
pub async fn danmaku(State(state): State<AppState>, query: Result<Query<DanmakuParams>, QueryRejection>) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return error_response(&Error::InvalidInput(rejection.body_text()), false),
    };

    match state.pipeline.handle(params.url.as_deref()).await {
        Ok(rendered) => {
            let cache_status = if rendered.cache_hit { "HIT" } else { "MISS" };
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE.as_str(), XML_CONTENT_TYPE), (CACHE_STATUS_HEADER, cache_status)],
                rendered.document,
            )
                .into_response()
        }
        Err(e) => error_response(&e, false),
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(danmaku))
        .route("/health", get(health))
        .with_state(state)
}
