use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fm_gateway::{AppState, Config, build_router, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the application, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    // Load configuration before logging so the configured level applies.
    // RUST_LOG still wins when set.
    let config = Config::from_env().map_err(|e| {
        eprintln!("Configuration error: {e}");
        exitcode::CONFIG
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting fm-gateway v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.host,
        port = %config.port,
        token_ttl_secs = config.token_ttl.as_secs(),
        admin_key_configured = config.admin_key_configured(),
        "Configuration loaded"
    );

    // Prometheus exporter (optional)
    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
        info!("Metrics available at http://{metrics_addr}/metrics");
    } else {
        info!("Metrics exporter disabled (METRICS_PORT=0)");
    }

    // Build application state and router
    let state = AppState::new(config.clone()).await.map_err(|e| {
        error!("Failed to initialize application state: {e}");
        exitcode::SOFTWARE
    })?;
    let app = build_router(state.clone());

    // Start server
    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET  /health                          - Health check");
    info!("  GET  /ready                           - Readiness check");
    info!("  POST /api/v1/generate-token           - Issue a bearer token");
    info!("  POST /api/v1/create-account           - Provision a credential (admin)");
    info!("  PUT  /api/v1/update-account/{{id}}      - Update a credential (admin)");
    info!("  POST /api/v1/face-match               - Submit a face match (caller)");
    info!("  POST /api/v1/webhook                  - Vendor callback");

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(utils::shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })?;

    // Drain the audit backlog before exit
    info!("HTTP server stopped, shutting down background tasks...");
    state.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}
