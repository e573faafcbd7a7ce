//! Pool registration endpoints.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::{
    routing::{get, post},
    Json, Router,
};
use mdbadmin_core::connection_registry::ConnectionBackend;
use mdbadmin_core::pool_store::{PoolId, PoolParams, PoolRecord, DEFAULT_MYSQL_PORT};
use serde::Deserialize;

use super::{lenient_number, PoolIdResponse};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePoolRequest {
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "lenient_number")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
}

fn default_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

impl CreatePoolRequest {
    fn into_parts(self) -> (PoolParams, String) {
        let params = PoolParams {
            host: self.host,
            port: self.port,
            user: self.user,
            database: self.database,
        };
        (params, self.password)
    }
}

/// POST /pool/create - probe the server, then persist the pool without its password
async fn create_pool<B: ConnectionBackend + 'static>(
    State(state): State<AppState<B>>,
    payload: Result<Json<CreatePoolRequest>, JsonRejection>,
) -> Result<Json<PoolIdResponse>, ApiError> {
    let Json(request) = payload?;
    let (params, password) = request.into_parts();
    let record = state.gateway().register_pool(params, &password).await?;
    Ok(Json(PoolIdResponse { pool_id: record.id }))
}

/// GET /pool/get
async fn list_pools<B: ConnectionBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Result<Json<Vec<PoolRecord>>, ApiError> {
    Ok(Json(state.gateway().list_pools().await?))
}

/// GET /pool/get/{poolId}
async fn get_pool<B: ConnectionBackend + 'static>(
    State(state): State<AppState<B>>,
    pool_id: Result<Path<PoolId>, PathRejection>,
) -> Result<Json<PoolRecord>, ApiError> {
    let Path(pool_id) = pool_id?;
    Ok(Json(state.gateway().get_pool(pool_id).await?))
}

pub fn router<B: ConnectionBackend + 'static>() -> Router<AppState<B>> {
    Router::new()
        .route("/pool/create", post(create_pool::<B>))
        .route("/pool/get", get(list_pools::<B>))
        .route("/pool/get/{poolId}", get(get_pool::<B>))
}
