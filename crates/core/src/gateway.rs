use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, instrument};

use crate::connection_registry::{BackendError, ConnectionBackend, ConnectionRegistry, RegistryError};
use crate::introspection::IntrospectionQuery;
use crate::pool_store::{FilePoolStore, PoolId, PoolParams, PoolRecord, PoolStoreError};
use crate::results::{normalize, Acknowledgement, Record, StatementOutcome, TabularResult};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("pool {0} not found")]
    PoolNotFound(PoolId),
    #[error("connection for pool {0} not found")]
    ConnectionNotFound(PoolId),
    #[error("query `{0}` not found")]
    QueryNotFound(String),
    #[error("{0}")]
    Connectivity(#[source] BackendError),
    #[error("{0}")]
    Execution(#[source] BackendError),
    #[error(transparent)]
    Store(#[from] PoolStoreError),
    #[error("pool store task failed: {0}")]
    StoreTask(#[from] JoinError),
}

impl GatewayError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PoolNotFound(_) | Self::ConnectionNotFound(_) | Self::QueryNotFound(_)
        )
    }
}

impl From<RegistryError> for GatewayError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::ConnectionNotFound(pool_id) => Self::ConnectionNotFound(pool_id),
            RegistryError::Connect(error) => Self::Connectivity(error),
            RegistryError::Execute(error) => Self::Execution(error),
        }
    }
}

/// How raw SQL results are handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawMode {
    /// Record objects as returned, or an acknowledgement for statements
    /// without a result set.
    #[default]
    Own,
    /// Record objects only; statements without a result set yield no records.
    Info,
    /// `{headers, data}` via the result normalizer.
    #[serde(alias = "table")]
    Tabular,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    Records(Vec<Record>),
    Acknowledged(Acknowledgement),
    Table(TabularResult),
}

pub struct ExecutionGateway<B: ConnectionBackend> {
    store: Arc<FilePoolStore>,
    registry: ConnectionRegistry<B>,
}

impl<B: ConnectionBackend> ExecutionGateway<B> {
    #[must_use]
    pub fn new(store: FilePoolStore, backend: B) -> Self {
        Self {
            store: Arc::new(store),
            registry: ConnectionRegistry::new(backend),
        }
    }

    #[must_use]
    pub fn store(&self) -> &FilePoolStore {
        &self.store
    }

    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry<B> {
        &self.registry
    }

    #[instrument(skip(self, params, password), fields(host = %params.host, port = params.port, database = %params.database))]
    pub async fn register_pool(
        &self,
        params: PoolParams,
        password: &str,
    ) -> Result<PoolRecord, GatewayError> {
        self.registry
            .backend()
            .probe(&params, password)
            .await
            .map_err(GatewayError::Connectivity)?;

        let record = self.with_store(move |store| store.append(params)).await?;
        info!(pool_id = record.id, "pool registered");
        Ok(record)
    }

    pub async fn list_pools(&self) -> Result<Vec<PoolRecord>, GatewayError> {
        self.with_store(FilePoolStore::list).await
    }

    pub async fn get_pool(&self, pool_id: PoolId) -> Result<PoolRecord, GatewayError> {
        self.with_store(move |store| store.get(pool_id))
            .await?
            .ok_or(GatewayError::PoolNotFound(pool_id))
    }

    /// Pool file I/O runs on the blocking pool so the store's lock is never
    /// held on a runtime worker.
    async fn with_store<T, F>(&self, op: F) -> Result<T, GatewayError>
    where
        T: Send + 'static,
        F: FnOnce(&FilePoolStore) -> Result<T, PoolStoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        Ok(tokio::task::spawn_blocking(move || op(&store)).await??)
    }

    #[instrument(skip(self, password))]
    pub async fn connect(&self, pool_id: PoolId, password: &str) -> Result<(), GatewayError> {
        let pool = self.get_pool(pool_id).await?;
        let latency = self.registry.connect(pool, password).await?;
        info!(pool_id, latency_ms = latency.as_millis(), "connected");
        Ok(())
    }

    #[must_use]
    pub fn is_connected(&self, pool_id: PoolId) -> bool {
        self.registry.is_connected(pool_id)
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.registry.live_count()
    }

    #[instrument(skip(self))]
    pub async fn disconnect(&self, pool_id: PoolId) -> Result<(), GatewayError> {
        self.registry.disconnect(pool_id).await?;
        info!(pool_id, "disconnected");
        Ok(())
    }

    /// Runs a catalog query against the pool's database, or `database_override`
    /// when one is given. Zero matching rows is not an error: the template's
    /// declared columns become the headers.
    #[instrument(skip(self))]
    pub async fn execute_named(
        &self,
        pool_id: PoolId,
        query_name: &str,
        database_override: Option<&str>,
    ) -> Result<TabularResult, GatewayError> {
        let pool = self
            .registry
            .connected_pool(pool_id)
            .ok_or(GatewayError::ConnectionNotFound(pool_id))?;
        let query = query_name
            .parse::<IntrospectionQuery>()
            .map_err(|unknown| GatewayError::QueryNotFound(unknown.0))?;
        let template = query.template();

        let database = database_override
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(pool.params.database.as_str());
        let sql = template.render(database);
        debug!(%sql, "running introspection query");

        let records = match self.registry.execute(pool_id, &sql).await? {
            StatementOutcome::Records(set) => set.records,
            StatementOutcome::Acknowledged(_) => Vec::new(),
        };
        Ok(normalize(records, template.columns))
    }

    #[instrument(skip(self, sql))]
    pub async fn execute_raw(
        &self,
        pool_id: PoolId,
        sql: &str,
        mode: RawMode,
    ) -> Result<RawOutcome, GatewayError> {
        let outcome = self.registry.execute(pool_id, sql).await?;

        Ok(match (mode, outcome) {
            (RawMode::Own | RawMode::Info, StatementOutcome::Records(set)) => {
                RawOutcome::Records(set.records)
            }
            (RawMode::Own | RawMode::Tabular, StatementOutcome::Acknowledged(ack)) => {
                RawOutcome::Acknowledged(ack)
            }
            (RawMode::Info, StatementOutcome::Acknowledged(_)) => RawOutcome::Records(Vec::new()),
            (RawMode::Tabular, StatementOutcome::Records(set)) => {
                RawOutcome::Table(normalize(set.records, &set.columns))
            }
        })
    }

    /// Releases every live session; the pool store is left as is.
    pub async fn shutdown(&self) {
        let live = self.registry.live_count();
        self.registry.shutdown().await;
        info!(released = live, "connection registry shut down");
    }
}
