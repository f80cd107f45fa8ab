//! Unified error types for danmaku-proxy.
//!
//! Every per-request failure is one of these kinds; the server maps them to
//! HTTP status codes through [`Error::status_code`] and nowhere else.

use tokio_rusqlite::rusqlite;

/// Unified error types for the danmaku proxy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or empty request parameter.
    #[error("{0}")]
    InvalidInput(String),

    /// The media prefix could not be read for fingerprinting.
    #[error("failed to fingerprint resource: {0}")]
    FetchFailed(String),

    /// The catalog has no episode for this fingerprint.
    #[error("no matching comment library found")]
    NoMatch,

    /// Transport failure or explicit error payload from the catalog service.
    #[error("{0}")]
    Upstream(String),

    /// Cache storage cannot be created. Fatal at startup.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Cache backend read/write failure.
    #[error("cache storage error: {0}")]
    Storage(String),

    /// Database operation failed.
    #[error("cache database error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("cache database error: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// HTTP status code for this error kind.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::NoMatch => 404,
            Error::FetchFailed(_)
            | Error::Upstream(_)
            | Error::CacheUnavailable(_)
            | Error::Storage(_)
            | Error::Database(_)
            | Error::MigrationFailed(_) => 500,
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
