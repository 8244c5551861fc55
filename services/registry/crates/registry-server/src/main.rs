//! Agentcy registry server entry point.
//!
//! Initialises tracing, loads configuration from `AGENTCY_REGISTRY_*`
//! environment variables, connects to Valkey when a URL is configured
//! (falling back to memory-only on any failure), rehydrates the directory
//! and serves the HTTP API until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use agentcy_common::RegistryServerConfig;
use agentcy_registry::valkey::ValkeyStore;
use agentcy_registry::{AppState, DirectoryStore, config, router};

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23 needs a process-wide crypto provider for rediss:// URLs.
    let _ = rustls::crypto::ring::default_provider().install_default();

    // 1. Initialise tracing with RUST_LOG env filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("agentcy-registry starting");

    // 2. Load configuration from AGENTCY_REGISTRY_* env vars.
    let config = config::from_env()?;

    tracing::info!(
        listen_addr = %config.listen_addr(),
        valkey_configured = config.store_url().is_some(),
        valkey_database = %config.valkey_database,
        "configuration loaded",
    );

    // 3. Connect to the durable store and rehydrate. Never fatal.
    let store = connect_store(&config).await;
    let (state, mirror_task) =
        AppState::bootstrap(store.clone(), config::mirror_settings(&config)).await;
    let state = Arc::new(state);

    // 4. Bind and serve.
    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .context("failed to bind TCP listener")?;

    tracing::info!(
        persistence = state.persistence_enabled(),
        "registry ready on http://{}",
        config.listen_addr(),
    );

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    // 5. Let the mirror flush what is already queued, then close the store.
    drop(state);
    if let Some(task) = mirror_task {
        if tokio::time::timeout(config.store_timeout(), task).await.is_err() {
            tracing::warn!("mirror did not flush before shutdown, pending writes lost");
        }
        if let Some(store) = &store {
            store.shutdown().await;
        }
    }

    tracing::info!("agentcy-registry shut down");
    Ok(())
}

async fn connect_store(config: &RegistryServerConfig) -> Option<Arc<dyn DirectoryStore>> {
    let url = config.store_url()?;

    match ValkeyStore::connect(url, &config.valkey_database, config.store_timeout()).await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::warn!(
                error = %format!("{e:#}"),
                "durable store unavailable, running memory-only",
            );
            None
        }
    }
}

/// Wait for SIGINT (Ctrl-C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
