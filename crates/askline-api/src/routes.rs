//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, a body size limit, a
//! request timeout, and all endpoint handlers.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use askline_core::config::AsklineConfig;
use askline_core::error::{AsklineError, Result};

use crate::handlers;
use crate::state::AppState;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Localhost origins allowed to call the API: the server port and port+1
/// for a dev frontend.
fn allowed_origins(port: u16) -> Vec<HeaderValue> {
    let dev_port = port.saturating_add(1);
    [port, dev_port]
        .iter()
        .flat_map(|p| {
            [
                format!("http://127.0.0.1:{}", p),
                format!("http://localhost:{}", p),
            ]
        })
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect()
}

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins(state.config.general.port)))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let timeout = Duration::from_secs(state.config.general.request_timeout_secs);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/chat", post(handlers::process_query))
        .route("/api/chat/stream", post(handlers::process_query_stream))
        .route("/api/search/status", get(handlers::search_status))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured port.
///
/// Binds to 127.0.0.1 (localhost only) and runs until Ctrl-C.
pub async fn start_server(config: &AsklineConfig, state: AppState) -> Result<()> {
    let addr = format!("127.0.0.1:{}", config.general.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AsklineError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(addr = %addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AsklineError::Api(format!("Server error: {}", e)))?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
