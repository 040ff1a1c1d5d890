//! HTTP server assembly and lifecycle

use crate::error::TransportError;
use crate::handlers::{analyze, health_check, list_smells, reload_defaults};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use smell_config::ServerConfig;
use smell_pipeline::AnalysisPipeline;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use tracing::{info, warn};

/// Shared server state
pub struct AppState {
    pub pipeline: AnalysisPipeline,
    /// Application version
    pub version: String,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        Self {
            pipeline,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/api/smells", get(list_smells))
        .route("/admin/reload-defaults", post(reload_defaults))
        .route("/health", get(health_check))
        .layer(
            // Cors needs a `Default` response body, so it sits inside the limit layer
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(max_body_bytes))
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::disable()),
        )
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    max_body_bytes: usize,
    shutdown: F,
) -> Result<(), TransportError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state, max_body_bytes);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Bind the configured address and serve until Ctrl-C
pub async fn start_server(
    config: &ServerConfig,
    pipeline: AnalysisPipeline,
) -> Result<(), TransportError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| TransportError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!(addr = %addr, "Server listening");
    info!("Available endpoints:");
    info!("  POST /api/analyze - Analyze submitted files");
    info!("  GET  /api/smells - List smell kinds and defaults");
    info!("  POST /admin/reload-defaults - Re-read the smell defaults file");
    info!("  GET  /health - Health check");

    let state = Arc::new(AppState::new(pipeline));
    serve(listener, state, config.max_body_bytes, shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining connections"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
