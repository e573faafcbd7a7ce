use axum::extract::rejection::JsonRejection;
use axum::{routing::post, Json, Router};
use mdbadmin_core::connection_registry::ConnectionBackend;
use mdbadmin_core::ddl::DdlStatement;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RenderedSql {
    pub sql: String,
}

/// POST /ddl/render - SQL text for a structured DDL statement; nothing is executed
async fn render(
    payload: Result<Json<DdlStatement>, JsonRejection>,
) -> Result<Json<RenderedSql>, ApiError> {
    let Json(statement) = payload?;
    Ok(Json(RenderedSql {
        sql: statement.to_sql()?,
    }))
}

pub fn router<B: ConnectionBackend + 'static>() -> Router<AppState<B>> {
    Router::new().route("/ddl/render", post(render))
}
