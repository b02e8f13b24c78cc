/// Server setup and initialization
///
/// Builds the shared state (config and pooled HTTP client), mounts the Monday routes and
/// serves them until Ctrl-C.

use crate::{
    api::{create_routes, AppState, EXPORT_WEBHOOK_PATH},
    config::Config,
};
use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (tests, CLI re-entry) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .try_init();
}

/// Create the Axum application with all routes and middleware
pub fn create_app(config: Config) -> Result<Router> {
    if config.monday.file_column_id.is_none() {
        tracing::warn!("⚠️ MONDAY_FILE_COLUMN_ID not set: exports will be rejected");
    }
    if config.monday.api_token.is_none() {
        tracing::warn!("⚠️ MONDAY_API_TOKEN not set: exports will be rejected");
    }
    tracing::info!(
        "📦 Dropbox upload {}",
        if config.dropbox.enabled { "enabled" } else { "disabled" }
    );

    let state = AppState::new(config)?;

    tracing::info!("📡 Creating HTTP router");
    let app = create_routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    tracing::info!("✅ Application initialized successfully");
    Ok(app)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Shutdown signal received");
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing::info!("Starting EOB bridge server...");

    let bind_addr = config.bind_addr();
    let app = create_app(config)?;

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on http://{}", bind_addr);
    tracing::info!("🔗 Monday webhook: POST http://{}{}", bind_addr, EXPORT_WEBHOOK_PATH);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
