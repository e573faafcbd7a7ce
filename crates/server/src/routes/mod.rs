//! Route handlers organized by resource

pub mod connections;
pub mod ddl;
pub mod health;
pub mod pools;

use std::fmt::Display;
use std::str::FromStr;

use axum::Router;
use mdbadmin_core::connection_registry::ConnectionBackend;
use mdbadmin_core::pool_store::PoolId;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::state::AppState;

pub fn router<B: ConnectionBackend + 'static>() -> Router<AppState<B>> {
    Router::new()
        .merge(health::router())
        .merge(pools::router())
        .merge(connections::router())
        .merge(ddl::router())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolIdResponse {
    pub pool_id: PoolId,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText<T> {
    Number(T),
    Text(String),
}

/// Accepts `3` as well as `"3"`; browser forms and query strings send ids as text.
pub(crate) fn lenient_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match NumberOrText::<T>::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}
