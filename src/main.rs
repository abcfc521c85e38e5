mod api;
mod app_config;
mod geocoding;
mod storage;

use crate::api::AppState;
use crate::app_config::AppConfig;
use crate::geocoding::GoogleGeocoder;
use crate::storage::ArangoStore;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("🚀 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load()?;
    info!("📋 Configuration loaded");
    info!("   - Store: {}/_db/{}/{}", config.store.url, config.store.database, config.store.collection);
    info!("   - Geocoding concurrency: {}", config.geocoding.concurrency);
    info!("   - Server: {}", config.server.addr());

    let store = Arc::new(ArangoStore::new(&config.store)?);
    let geocoder = Arc::new(GoogleGeocoder::new(&config.geocoding)?);
    if config.geocoding.api_key.is_empty() {
        info!("⚠️  No geocoding API key configured, addresses will resolve to N/A");
    }

    let state = AppState {
        store,
        geocoder,
        geocode_concurrency: config.geocoding.concurrency,
    };
    let app = api::router(state, config.server.cors_max_age());

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 Server listening on http://{}", addr);
    info!("📡 Available endpoints:");
    info!("   GET    /           - Route list");
    info!("   GET    /health     - Health check");
    info!("   GET    /data       - All location records");
    info!("   GET    /data/:key  - One location record");
    info!("   POST   /data[/:key] - Add a location record");
    info!("   PATCH  /data/:key  - Update a location record");
    info!("   DELETE /data/:key  - Remove a location record");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutting down gracefully");

    Ok(())
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}
