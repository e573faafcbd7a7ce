use axum::extract::State;
use axum::{routing::get, Json, Router};
use mdbadmin_core::connection_registry::ConnectionBackend;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: usize,
}

/// GET /health
async fn health<B: ConnectionBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.gateway().live_count(),
    })
}

pub fn router<B: ConnectionBackend + 'static>() -> Router<AppState<B>> {
    Router::new().route("/health", get(health::<B>))
}
