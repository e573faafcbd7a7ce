pub mod connection_registry;
pub mod ddl;
pub mod gateway;
pub mod introspection;
pub mod pool_store;
pub mod results;

#[cfg(test)]
mod testing;

pub use connection_registry::{BackendError, BackendErrorKind, ConnectionBackend};
pub use gateway::{ExecutionGateway, GatewayError, RawMode, RawOutcome};
pub use pool_store::{FilePoolStore, PoolId, PoolParams, PoolRecord};
