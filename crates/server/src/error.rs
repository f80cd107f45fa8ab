//! HTTP error responses for the danmaku proxy.
//!
//! Every pipeline failure reaches the client through [`error_response`],
//! which takes its status from [`Error::status_code`].

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use danmaku_core::Error;
use serde::Serialize;

/// Content type of a successful response.
pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// JSON error envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}

/// Build the response for a failed request.
///
/// Before any XML has been committed the body is the `{error, code}`
/// envelope. Once the XML content type is committed the message is written
/// raw under that content type.
///
/// [`crate::handler::danmaku`] buffers the whole document before writing,
/// so it always passes `committed = false`. A handler that streams the body
/// passes `true` for failures after its headers are sent.
pub fn error_response(err: &Error, committed: bool) -> Response {
    let code = err.status_code();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = err.to_string();

    match code {
        500 => tracing::error!(error = %message, "request failed"),
        _ => tracing::info!(status = code, error = %message, "request rejected"),
    }

    if committed {
        return (status, [(header::CONTENT_TYPE, XML_CONTENT_TYPE)], message).into_response();
    }

    (status, Json(ErrorBody { error: message, code })).into_response()
}
