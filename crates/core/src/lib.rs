//! Core types and shared functionality for danmaku-proxy.
//!
//! This crate provides:
//! - Cache keys, storage backends (flat-file, SQLite, in-memory) and the response cache
//! - Unified error types
//! - Configuration structures
//! - The comment data model and its overlay XML rendering

pub mod cache;
pub mod comment;
pub mod config;
pub mod error;
pub mod xml;

pub use cache::{CacheBackend, CacheKey, CachedDocument, DocumentMeta, FingerprintEntry, ResponseCache, SweepPolicy};
pub use comment::Comment;
pub use config::{AppConfig, CacheBackendKind, ConfigError};
pub use error::Error;

/// Current wall-clock time as unix seconds.
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
