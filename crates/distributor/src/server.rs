//! HTTP server
//!
//! Builds the axum router and runs it with graceful shutdown. The ingest
//! endpoint, health check and metrics endpoints all hang off the same
//! listener.

use std::io;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::handlers::{self, AppState};

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the listen address
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// The configured bind address
        address: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// The server loop failed
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Build the axum router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/distribute", post(handlers::distribute))
        // Historical spelling, kept for old emitters
        .route("/api/v1/logs", post(handlers::distribute))
        .route("/api/v1/health", get(handlers::health_check))
        .route("/api/v1/metrics/performance", get(handlers::performance_metrics))
        .route("/api/v1/metrics/analyzers", get(handlers::analyzer_stats))
        .with_state(state)
}

/// Bind `address` and serve until the token is cancelled.
pub async fn run(
    address: &str,
    state: Arc<AppState>,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|e| ServerError::Bind {
            address: address.to_string(),
            source: e,
        })?;

    tracing::info!(address = %address, "distributor listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .map_err(ServerError::Serve)?;

    tracing::info!("distributor server stopped");
    Ok(())
}

/// Shutdown signal future
async fn shutdown_signal(cancel: CancellationToken) {
    cancel.cancelled().await;
}
