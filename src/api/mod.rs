//! purplefox HTTP Server
//!
//! HTTP layer for purplefox, built with Axum.
//!
//! # Endpoints
//!
//! ## Tables
//! - `GET /api/v1/tournaments` - List tournaments
//! - `GET /api/v1/tournaments/:id/tables` - Rows of one tournament
//! - `POST /api/v1/tournaments/:id/tables` - Observe tables
//! - `PUT /api/v1/tournaments/:id/tables/:number` - Set a table's status
//! - `POST /api/v1/tournaments/:id/tables/:number/advance` - Advance a table
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /api/v1/ws` - Real-time table status stream
//!
//! ## Views
//! - `{base}` - Tournament list
//! - `{base}tournament/:id` - Table grid of one tournament
//! - `{base}assets/*` - Static view bundle
//!
//! # Example
//!
//! ```rust,ignore
//! use purplefox::api::{serve, AppState};
//! use purplefox::backend::BackendClient;
//! use purplefox::config::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default(None)?;
//!     let client = Arc::new(BackendClient::from_config(&config.backend)?);
//!
//!     serve(AppState::new(client, &config)).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::websocket::websocket_handler;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/tournaments", get(routes::tables::list_tournaments))
        .route(
            "/tournaments/:id/tables",
            get(routes::tables::list_tables).post(routes::tables::observe_tables),
        )
        .route(
            "/tournaments/:id/tables/:number",
            axum::routing::put(routes::tables::set_status),
        )
        .route(
            "/tournaments/:id/tables/:number/advance",
            post(routes::tables::advance),
        )
        // WebSocket route
        .route("/ws", get(websocket_handler));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let assets_path = format!("{}assets", state.routes.base());
    let assets = ServeDir::new(&state.config.static_dir);

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .nest_service(&assets_path, assets)
        .fallback(routes::views::render_view)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the HTTP server
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.addr();
    let base = state.routes.base().to_string();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(addr = %addr, base = %base, "purplefox listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("purplefox shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
