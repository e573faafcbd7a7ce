//! Connection endpoints: open, close and probe sessions, run SQL.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use mdbadmin_core::connection_registry::ConnectionBackend;
use mdbadmin_core::gateway::{RawMode, RawOutcome};
use mdbadmin_core::pool_store::PoolId;
use mdbadmin_core::results::Acknowledgement;
use serde::{Deserialize, Serialize};

use super::{lenient_number, PoolIdResponse};
use crate::error::ApiError;
use crate::state::AppState;

const STATEMENT_EXECUTED: &str = "Statement executed successfully";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    #[serde(deserialize_with = "lenient_number")]
    pub pool_id: PoolId,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRef {
    #[serde(deserialize_with = "lenient_number")]
    pub pool_id: PoolId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsConnectedQuery {
    pub pool_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IsConnectedResponse {
    pub is_connected: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[serde(deserialize_with = "lenient_number")]
    pub pool_id: PoolId,
    #[serde(alias = "query")]
    pub sql_query: String,
    #[serde(default)]
    pub mode: RawMode,
}

/// `query` is a catalog name, or `own` / `info` to run `sqlQuery` verbatim.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveRequest {
    #[serde(deserialize_with = "lenient_number")]
    pub pool_id: PoolId,
    pub query: String,
    #[serde(default)]
    pub db_name: Option<String>,
    #[serde(default)]
    pub sql_query: Option<String>,
}

#[derive(Serialize)]
struct AcknowledgementResponse {
    message: &'static str,
    #[serde(flatten)]
    acknowledgement: Acknowledgement,
}

fn raw_response(outcome: RawOutcome) -> Response {
    match outcome {
        RawOutcome::Records(records) => Json(records).into_response(),
        RawOutcome::Acknowledged(acknowledgement) => Json(AcknowledgementResponse {
            message: STATEMENT_EXECUTED,
            acknowledgement,
        })
        .into_response(),
        RawOutcome::Table(table) => Json(table).into_response(),
    }
}

fn raw_mode(query: &str) -> Option<RawMode> {
    match query {
        "own" => Some(RawMode::Own),
        "info" => Some(RawMode::Info),
        _ => None,
    }
}

/// POST /connection/create
async fn create_connection<B: ConnectionBackend + 'static>(
    State(state): State<AppState<B>>,
    payload: Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Json<PoolIdResponse>, ApiError> {
    let Json(request) = payload?;
    state
        .gateway()
        .connect(request.pool_id, &request.password)
        .await?;
    Ok(Json(PoolIdResponse {
        pool_id: request.pool_id,
    }))
}

/// POST /connection/disconnect
async fn disconnect_connection<B: ConnectionBackend + 'static>(
    State(state): State<AppState<B>>,
    payload: Result<Json<PoolRef>, JsonRejection>,
) -> Result<Json<PoolIdResponse>, ApiError> {
    let Json(request) = payload?;
    state.gateway().disconnect(request.pool_id).await?;
    Ok(Json(PoolIdResponse {
        pool_id: request.pool_id,
    }))
}

/// DELETE /connection/{poolId}
async fn delete_connection<B: ConnectionBackend + 'static>(
    State(state): State<AppState<B>>,
    pool_id: Result<Path<PoolId>, PathRejection>,
) -> Result<Json<PoolIdResponse>, ApiError> {
    let Path(pool_id) = pool_id?;
    state.gateway().disconnect(pool_id).await?;
    Ok(Json(PoolIdResponse { pool_id }))
}

/// GET /connection/isConnected?poolId= - an unparsable id is simply not connected
async fn is_connected<B: ConnectionBackend + 'static>(
    State(state): State<AppState<B>>,
    Query(query): Query<IsConnectedQuery>,
) -> Json<IsConnectedResponse> {
    let is_connected = query
        .pool_id
        .and_then(|raw| raw.trim().parse::<PoolId>().ok())
        .is_some_and(|pool_id| state.gateway().is_connected(pool_id));
    Json(IsConnectedResponse { is_connected })
}

/// POST /connection/execute
async fn execute<B: ConnectionBackend + 'static>(
    State(state): State<AppState<B>>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let outcome = state
        .gateway()
        .execute_raw(request.pool_id, &request.sql_query, request.mode)
        .await?;
    Ok(raw_response(outcome))
}

async fn retrieve<B: ConnectionBackend + 'static>(
    state: &AppState<B>,
    request: RetrieveRequest,
) -> Result<Response, ApiError> {
    if let Some(mode) = raw_mode(&request.query) {
        let sql = request
            .sql_query
            .as_deref()
            .map(str::trim)
            .filter(|sql| !sql.is_empty())
            .ok_or_else(|| {
                ApiError::BadRequest(format!("sqlQuery is required for `{}` queries", request.query))
            })?;
        let outcome = state
            .gateway()
            .execute_raw(request.pool_id, sql, mode)
            .await?;
        return Ok(raw_response(outcome));
    }

    let table = state
        .gateway()
        .execute_named(request.pool_id, &request.query, request.db_name.as_deref())
        .await?;
    Ok(Json(table).into_response())
}

/// POST|PUT /connection/retrieve
async fn retrieve_body<B: ConnectionBackend + 'static>(
    State(state): State<AppState<B>>,
    payload: Result<Json<RetrieveRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    retrieve(&state, request).await
}

/// GET /connection/retrieve?poolId=&query=&dbName= - catalog queries only
async fn retrieve_query<B: ConnectionBackend + 'static>(
    State(state): State<AppState<B>>,
    query: Result<Query<RetrieveRequest>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(request) = query?;
    if raw_mode(&request.query).is_some() {
        return Err(ApiError::BadRequest(format!(
            "`{}` queries must be sent as a POST or PUT body",
            request.query
        )));
    }
    retrieve(&state, request).await
}

pub fn router<B: ConnectionBackend + 'static>() -> Router<AppState<B>> {
    Router::new()
        .route("/connection/create", post(create_connection::<B>))
        .route("/connection/disconnect", post(disconnect_connection::<B>))
        .route("/connection/isConnected", get(is_connected::<B>))
        .route("/connection/execute", post(execute::<B>))
        .route(
            "/connection/retrieve",
            get(retrieve_query::<B>)
                .post(retrieve_body::<B>)
                .put(retrieve_body::<B>),
        )
        .route("/connection/{poolId}", delete(delete_connection::<B>))
}
