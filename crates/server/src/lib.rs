//! HTTP boundary for the execution gateway.
//!
//! - CORS: any origin unless `cors_permissive` is off, then the local UI only
//! - Request tracing; statements run to completion however long they take
//! - Graceful shutdown on SIGTERM/Ctrl+C, releasing every live session

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use mdbadmin_core::connection_registry::ConnectionBackend;
use mdbadmin_core::gateway::ExecutionGateway;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use config::{ConfigError, ServerConfig};
pub use state::AppState;

const LOCAL_UI_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

pub fn build_router<B: ConnectionBackend + 'static>(
    state: AppState<B>,
    config: &ServerConfig,
) -> Router {
    let cors = if config.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(LOCAL_UI_ORIGINS.map(HeaderValue::from_static))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    routes::router()
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serves until a shutdown signal arrives, then closes every live session.
pub async fn run_server<B: ConnectionBackend + 'static>(
    config: &ServerConfig,
    gateway: Arc<ExecutionGateway<B>>,
) -> anyhow::Result<()> {
    if config.cors_permissive {
        warn!("CORS: permissive mode enabled, all origins allowed");
    }
    let app = build_router(AppState::new(Arc::clone(&gateway)), config);

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, pools = %gateway.store().path().display(), "mdbadmin listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    gateway.shutdown().await;
    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, starting graceful shutdown"),
        () = terminate => info!("received SIGTERM, starting graceful shutdown"),
    }
}
