use std::time::Duration;

use async_trait::async_trait;
use mdbadmin_core::connection_registry::{BackendError, ConnectionBackend};
use mdbadmin_core::pool_store::PoolParams;
use mdbadmin_core::results::{Acknowledgement, Record, RecordSet, StatementOutcome};
use serde_json::json;

/// Answers from canned data: the password `wrong` is rejected, catalog
/// queries match nothing, other `SELECT`s return two ids, `FAIL ...`
/// raises an engine error and `ALTER TABLE big ...` takes ninety seconds.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StubBackend;

#[async_trait]
impl ConnectionBackend for StubBackend {
    type Connection = ();

    async fn connect(&self, params: &PoolParams, password: &str) -> Result<(), BackendError> {
        if password == "wrong" {
            return Err(BackendError::new(format!(
                "Access denied for user '{}'@'{}' (using password: YES)",
                params.user, params.host
            )));
        }
        Ok(())
    }

    async fn ping(&self, _connection: &mut ()) -> Result<(), BackendError> {
        Ok(())
    }

    async fn execute(
        &self,
        _connection: &mut (),
        sql: &str,
    ) -> Result<StatementOutcome, BackendError> {
        if sql.starts_with("FAIL") {
            return Err(BackendError::new("You have an error in your SQL syntax"));
        }
        if sql.starts_with("ALTER TABLE big") {
            tokio::time::sleep(Duration::from_secs(90)).await;
        }
        if sql.contains("information_schema") {
            return Ok(StatementOutcome::Records(RecordSet::default()));
        }
        if sql.starts_with("SELECT") {
            let records = [1, 2]
                .into_iter()
                .map(|id| Record::from_iter([("id", json!(id))]))
                .collect();
            return Ok(StatementOutcome::Records(RecordSet {
                columns: vec!["id".to_string()],
                records,
            }));
        }
        Ok(StatementOutcome::Acknowledged(Acknowledgement::default()))
    }

    async fn disconnect(&self, _connection: ()) -> Result<(), BackendError> {
        Ok(())
    }
}
