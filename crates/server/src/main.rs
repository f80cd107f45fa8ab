//! danmaku-proxy server entry point.
//!
//! Boots the HTTP server that resolves media URLs to comment overlay
//! documents. Logs are JSON on stderr.

use std::sync::Arc;

use anyhow::Result;
use danmaku_client::{CatalogClient, CatalogConfig, FetchClient, FetchConfig, Fingerprinter};
use danmaku_core::cache::{CacheDb, FsBackend, MemoryBackend};
use danmaku_core::{AppConfig, CacheBackend, CacheBackendKind, ResponseCache, SweepPolicy};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod pipeline;
mod state;

use pipeline::Pipeline;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let (app_id, app_secret) = config.require_credentials()?;

    let backend = open_backend(&config).await?;
    let cache = ResponseCache::new(Arc::clone(&backend), config.document_ttl());

    let fetcher = FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        timeout: config.fetch_timeout(),
        block_private_hosts: config.block_private_hosts,
        ..Default::default()
    })?;
    let fingerprinter =
        Fingerprinter::new(Arc::new(fetcher), backend, config.fingerprint_ttl(), config.max_prefix_bytes);

    let catalog = CatalogClient::new(CatalogConfig {
        app_id: app_id.to_string(),
        app_secret: app_secret.to_string(),
        base_url: config.api_base_url.clone(),
        timeout: config.api_timeout(),
        user_agent: config.user_agent.clone(),
    })?;

    let pipeline = Pipeline::new(cache, fingerprinter, Arc::new(catalog), SweepPolicy::new(config.sweep_probability));
    let app = handler::build_router(AppState { pipeline: Arc::new(pipeline) });

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str()).await?;
    tracing::info!(
        addr = %config.bind_addr,
        backend = ?config.cache_backend,
        document_ttl_secs = config.document_ttl_secs,
        sweep_probability = config.sweep_probability,
        "starting danmaku-proxy"
    );

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

/// Storage shared by the response cache and the fingerprinter.
async fn open_backend(config: &AppConfig) -> Result<Arc<dyn CacheBackend>, danmaku_core::Error> {
    let backend: Arc<dyn CacheBackend> = match config.cache_backend {
        CacheBackendKind::Fs => Arc::new(FsBackend::open(&config.cache_dir).await?),
        CacheBackendKind::Sqlite => Arc::new(CacheDb::open(&config.db_path).await?),
        CacheBackendKind::Memory => Arc::new(MemoryBackend::new()),
    };
    Ok(backend)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
