//! Outbound clients for danmaku-proxy.
//!
//! This crate provides the signed catalog API client, the bounded media
//! prefix fetcher and the content fingerprinter built on top of it.

pub mod catalog;
pub mod fetch;
pub mod fingerprint;
pub mod sign;

pub use catalog::{Catalog, CatalogClient, CatalogConfig, CatalogError};
pub use fetch::{FetchClient, FetchConfig, PrefixFetcher, file_name_from_url};
pub use fingerprint::Fingerprinter;
pub use sign::{Signature, Signer};
