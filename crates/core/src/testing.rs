use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::connection_registry::{BackendError, ConnectionBackend};
use crate::pool_store::PoolParams;
use crate::results::{Acknowledgement, RecordSet, StatementOutcome};

#[derive(Debug)]
pub(crate) struct FakeConnection;

#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    rejected_password: Option<String>,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    execute_calls: AtomicUsize,
    fail_ping: AtomicUsize,
    fail_disconnect: AtomicUsize,
    scripted: Mutex<VecDeque<Result<StatementOutcome, BackendError>>>,
    executed: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub(crate) fn rejecting_password(password: &str) -> Self {
        Self {
            rejected_password: Some(password.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn fail_next_ping(&self) {
        self.fail_ping.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fail_next_disconnect(&self) {
        self.fail_disconnect.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn respond_with(&self, outcome: StatementOutcome) {
        self.scripted.lock().push_back(Ok(outcome));
    }

    pub(crate) fn fail_next_execute(&self, message: &str) {
        self.scripted
            .lock()
            .push_back(Err(BackendError::new(message)));
    }

    pub(crate) fn lose_connection_on_next_execute(&self) {
        self.scripted
            .lock()
            .push_back(Err(BackendError::connection_lost("server has gone away")));
    }

    pub(crate) fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::Relaxed)
    }

    pub(crate) fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::Relaxed)
    }

    pub(crate) fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::Relaxed)
    }

    pub(crate) fn open_sessions(&self) -> usize {
        self.connect_calls() - self.disconnect_calls()
    }

    pub(crate) fn executed_sql(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl ConnectionBackend for FakeBackend {
    type Connection = FakeConnection;

    async fn connect(
        &self,
        params: &PoolParams,
        password: &str,
    ) -> Result<Self::Connection, BackendError> {
        if self.rejected_password.as_deref() == Some(password) {
            return Err(BackendError::new(format!(
                "Access denied for user '{}'@'{}' (using password: YES)",
                params.user, params.host
            )));
        }
        self.connect_calls.fetch_add(1, Ordering::Relaxed);
        Ok(FakeConnection)
    }

    async fn ping(&self, _connection: &mut Self::Connection) -> Result<(), BackendError> {
        if self.fail_ping.load(Ordering::Relaxed) > 0 {
            self.fail_ping.fetch_sub(1, Ordering::Relaxed);
            return Err(BackendError::connection_lost("ping failed"));
        }
        Ok(())
    }

    async fn execute(
        &self,
        _connection: &mut Self::Connection,
        sql: &str,
    ) -> Result<StatementOutcome, BackendError> {
        self.execute_calls.fetch_add(1, Ordering::Relaxed);
        self.executed.lock().push(sql.to_string());
        if let Some(scripted) = self.scripted.lock().pop_front() {
            return scripted;
        }

        let keyword = sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        if matches!(keyword.as_str(), "SELECT" | "SHOW" | "DESCRIBE") {
            return Ok(StatementOutcome::Records(RecordSet::default()));
        }
        Ok(StatementOutcome::Acknowledged(Acknowledgement::default()))
    }

    async fn disconnect(&self, _connection: Self::Connection) -> Result<(), BackendError> {
        self.disconnect_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_disconnect.load(Ordering::Relaxed) > 0 {
            self.fail_disconnect.fetch_sub(1, Ordering::Relaxed);
            return Err(BackendError::connection_lost("close failed"));
        }
        Ok(())
    }
}
