//! HTTP server assembly.
//!
//! Builds the router over the shared [`AppState`] and runs it until a
//! shutdown signal arrives.

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::error::{ClimapError, Result};
use crate::handlers::{
    boundaries_handler, cities_handler, field_handler, heartbeat_handler, image_handler,
    metadata_handler,
};
use crate::logging::create_http_trace_layer;
use crate::state::AppState;

/// Build the application router
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/heartbeat", get(heartbeat_handler))
        .route("/metadata", get(metadata_handler))
        .route("/field", get(field_handler))
        .route("/image", get(image_handler))
        .route("/boundaries", get(boundaries_handler))
        .route("/cities", get(cities_handler))
        .layer(create_http_trace_layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `host:port` and serve until Ctrl+C or SIGTERM
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> Result<()> {
    let ip = host
        .parse::<std::net::IpAddr>()
        .map_err(|e| ClimapError::Config {
            message: format!("Invalid host address: {}", e),
        })?;
    let addr = SocketAddr::from((ip, port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ClimapError::Server {
            message: format!("Failed to bind to address: {}", e),
        })?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ClimapError::Server {
            message: format!("Server error: {}", e),
        })?;

    info!("Server has been gracefully shut down");
    Ok(())
}

/// Wait for a shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
