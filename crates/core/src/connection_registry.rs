use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::pool_store::{PoolId, PoolParams, PoolRecord};
use crate::results::StatementOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The engine answered with an error; the session is still usable.
    Engine,
    /// The session is gone and must be re-established.
    ConnectionLost,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
    kind: BackendErrorKind,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: BackendErrorKind::Engine,
        }
    }

    #[must_use]
    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: BackendErrorKind::ConnectionLost,
        }
    }

    #[must_use]
    pub fn timeout(after: Duration) -> Self {
        Self {
            message: format!("connection timed out after {}ms", after.as_millis()),
            kind: BackendErrorKind::Timeout,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn kind(&self) -> BackendErrorKind {
        self.kind
    }

    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        self.kind == BackendErrorKind::ConnectionLost
    }
}

#[async_trait]
pub trait ConnectionBackend: Send + Sync {
    type Connection: Send;

    async fn connect(
        &self,
        params: &PoolParams,
        password: &str,
    ) -> Result<Self::Connection, BackendError>;
    async fn ping(&self, connection: &mut Self::Connection) -> Result<(), BackendError>;
    async fn execute(
        &self,
        connection: &mut Self::Connection,
        sql: &str,
    ) -> Result<StatementOutcome, BackendError>;
    async fn disconnect(&self, connection: Self::Connection) -> Result<(), BackendError>;

    /// Opens, pings and closes a throwaway session.
    async fn probe(&self, params: &PoolParams, password: &str) -> Result<(), BackendError> {
        let mut connection = self.connect(params, password).await?;
        if let Err(error) = self.ping(&mut connection).await {
            if let Err(release_error) = self.disconnect(connection).await {
                warn!(host = %params.host, error = %release_error, "failed to close probe session");
            }
            return Err(error);
        }
        self.disconnect(connection).await
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("connection for pool {0} not found")]
    ConnectionNotFound(PoolId),
    #[error("{0}")]
    Connect(#[source] BackendError),
    #[error("{0}")]
    Execute(#[source] BackendError),
}

type Slot<C> = Arc<Mutex<Option<C>>>;

struct LiveConnection<C> {
    pool: PoolRecord,
    slot: Slot<C>,
}

/// Live sessions keyed by pool id; at most one per pool.
///
/// Each handle sits behind its own async mutex so statements against different
/// pools run concurrently while statements against one pool are serialized.
pub struct ConnectionRegistry<B: ConnectionBackend> {
    backend: B,
    live: RwLock<HashMap<PoolId, LiveConnection<B::Connection>>>,
}

impl<B: ConnectionBackend> ConnectionRegistry<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            live: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn is_connected(&self, pool_id: PoolId) -> bool {
        self.live.read().contains_key(&pool_id)
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.read().len()
    }

    /// The pool record a live session was opened with.
    #[must_use]
    pub fn connected_pool(&self, pool_id: PoolId) -> Option<PoolRecord> {
        self.live.read().get(&pool_id).map(|live| live.pool.clone())
    }

    /// Opens a session for `pool`, replacing and releasing any previous one.
    ///
    /// The registry is untouched when connecting or the first ping fails.
    pub async fn connect(
        &self,
        pool: PoolRecord,
        password: &str,
    ) -> Result<Duration, RegistryError> {
        let started_at = Instant::now();
        let mut handle = self
            .backend
            .connect(&pool.params, password)
            .await
            .map_err(RegistryError::Connect)?;
        if let Err(error) = self.backend.ping(&mut handle).await {
            if let Err(release_error) = self.backend.disconnect(handle).await {
                warn!(pool_id = pool.id, error = %release_error, "failed to close unhealthy session");
            }
            return Err(RegistryError::Connect(error));
        }
        let latency = started_at.elapsed();

        let pool_id = pool.id;
        let replaced = self.live.write().insert(
            pool_id,
            LiveConnection {
                pool,
                slot: Arc::new(Mutex::new(Some(handle))),
            },
        );

        if let Some(previous) = replaced {
            info!(pool_id, "replacing existing session");
            self.release(pool_id, &previous.slot).await;
        }

        Ok(latency)
    }

    pub async fn disconnect(&self, pool_id: PoolId) -> Result<(), RegistryError> {
        let live = self
            .live
            .write()
            .remove(&pool_id)
            .ok_or(RegistryError::ConnectionNotFound(pool_id))?;
        self.release(pool_id, &live.slot).await;
        Ok(())
    }

    /// Runs one statement on the pool's session.
    ///
    /// A connection-level failure evicts the handle that failed, so the next call
    /// reports [`RegistryError::ConnectionNotFound`]. Nothing is retried.
    pub async fn execute(
        &self,
        pool_id: PoolId,
        sql: &str,
    ) -> Result<StatementOutcome, RegistryError> {
        let slot = self
            .live
            .read()
            .get(&pool_id)
            .map(|live| Arc::clone(&live.slot))
            .ok_or(RegistryError::ConnectionNotFound(pool_id))?;

        let mut guard = slot.lock().await;
        let connection = guard
            .as_mut()
            .ok_or(RegistryError::ConnectionNotFound(pool_id))?;

        match self.backend.execute(connection, sql).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                if error.is_connection_lost() {
                    warn!(pool_id, error = %error, "session lost, evicting");
                    let dead = guard.take();
                    drop(guard);
                    self.evict(pool_id, &slot);
                    if let Some(connection) = dead {
                        if let Err(release_error) = self.backend.disconnect(connection).await {
                            warn!(pool_id, error = %release_error, "failed to close lost session");
                        }
                    }
                }
                Err(RegistryError::Execute(error))
            }
        }
    }

    /// Releases every live session.
    pub async fn shutdown(&self) {
        let drained = self.live.write().drain().collect::<Vec<_>>();
        for (pool_id, live) in drained {
            self.release(pool_id, &live.slot).await;
        }
    }

    fn evict(&self, pool_id: PoolId, slot: &Slot<B::Connection>) {
        let mut live = self.live.write();
        if live
            .get(&pool_id)
            .is_some_and(|current| Arc::ptr_eq(&current.slot, slot))
        {
            live.remove(&pool_id);
        }
    }

    /// Waits for any in-flight statement on the slot, then closes the handle.
    async fn release(&self, pool_id: PoolId, slot: &Slot<B::Connection>) {
        let Some(connection) = slot.lock().await.take() else {
            return;
        };
        if let Err(error) = self.backend.disconnect(connection).await {
            warn!(pool_id, error = %error, "failed to release session");
        }
    }
}
