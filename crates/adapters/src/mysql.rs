use std::time::Duration;

use async_trait::async_trait;
use mdbadmin_core::connection_registry::{BackendError, ConnectionBackend};
use mdbadmin_core::pool_store::PoolParams;
use mdbadmin_core::results::{Acknowledgement, CellValue, Record, RecordSet, StatementOutcome};
use mysql_async::consts::{ColumnFlags, ColumnType};
use mysql_async::prelude::Queryable;
use mysql_async::{Column, Conn, DriverError, OptsBuilder, Row, Value};
use serde_json::Number;
use tracing::debug;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// MariaDB/MySQL sessions over the text protocol.
#[derive(Debug, Clone)]
pub struct MysqlConnectionBackend {
    connect_timeout: Duration,
}

impl MysqlConnectionBackend {
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for MysqlConnectionBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl ConnectionBackend for MysqlConnectionBackend {
    type Connection = Conn;

    async fn connect(
        &self,
        params: &PoolParams,
        password: &str,
    ) -> Result<Self::Connection, BackendError> {
        let connecting = Conn::new(opts_from_params(params, password));
        match tokio::time::timeout(self.connect_timeout, connecting).await {
            Ok(result) => result.map_err(to_backend_error),
            Err(_) => Err(BackendError::timeout(self.connect_timeout)),
        }
    }

    async fn ping(&self, connection: &mut Self::Connection) -> Result<(), BackendError> {
        connection.ping().await.map_err(to_backend_error)
    }

    async fn execute(
        &self,
        connection: &mut Self::Connection,
        sql: &str,
    ) -> Result<StatementOutcome, BackendError> {
        let mut result = connection
            .query_iter(sql)
            .await
            .map_err(to_backend_error)?;

        let columns = result.columns().map(|columns| columns.to_vec());
        let rows = result.collect::<Row>().await.map_err(to_backend_error)?;
        let acknowledgement = Acknowledgement {
            affected_rows: result.affected_rows(),
            last_insert_id: result.last_insert_id(),
        };
        // Trailing result sets (multi-statement text, CALL) are discarded.
        result.drop_result().await.map_err(to_backend_error)?;

        let Some(columns) = columns.filter(|columns| !columns.is_empty()) else {
            debug!(affected_rows = acknowledgement.affected_rows, "statement acknowledged");
            return Ok(StatementOutcome::Acknowledged(acknowledgement));
        };

        let names = columns
            .iter()
            .map(|column| column.name_str().into_owned())
            .collect::<Vec<_>>();
        let records = rows
            .into_iter()
            .map(|row| row_to_record(row, &columns, &names))
            .collect();

        Ok(StatementOutcome::Records(RecordSet {
            columns: names,
            records,
        }))
    }

    async fn disconnect(&self, connection: Self::Connection) -> Result<(), BackendError> {
        connection.disconnect().await.map_err(to_backend_error)
    }
}

fn opts_from_params(params: &PoolParams, password: &str) -> OptsBuilder {
    let mut builder = OptsBuilder::default()
        .ip_or_hostname(params.host.clone())
        .tcp_port(params.port)
        .user(Some(params.user.clone()))
        .pass(Some(password.to_string()));

    let database = params.database.trim();
    if !database.is_empty() {
        builder = builder.db_name(Some(database.to_string()));
    }

    builder
}

fn row_to_record(row: Row, columns: &[Column], names: &[String]) -> Record {
    Row::unwrap(row)
        .into_iter()
        .zip(columns)
        .zip(names)
        .map(|((value, column), name)| (name.as_str(), to_cell(value, column)))
        .collect()
}

/// Text-protocol values arrive as bytes; the column type decides what JSON
/// they become. Decimals stay strings so no precision is lost.
fn to_cell(value: Value, column: &Column) -> CellValue {
    match value {
        Value::NULL => CellValue::Null,
        Value::Bytes(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            typed_text_cell(&text, column)
                .unwrap_or_else(|| CellValue::String(text.into_owned()))
        }
        Value::Int(value) => CellValue::from(value),
        Value::UInt(value) => CellValue::from(value),
        Value::Float(value) => float_cell(f64::from(value)),
        Value::Double(value) => float_cell(value),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut rendered = format!("{year:04}-{month:02}-{day:02}");
            if column.column_type() != ColumnType::MYSQL_TYPE_DATE {
                rendered.push_str(&format!(" {hour:02}:{minute:02}:{second:02}"));
                if micros > 0 {
                    rendered.push_str(&format!(".{micros:06}"));
                }
            }
            CellValue::String(rendered)
        }
        Value::Time(is_negative, days, hours, minutes, seconds, micros) => {
            let sign = if is_negative { "-" } else { "" };
            let hours = u32::from(hours) + days * 24;
            let mut rendered = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
            if micros > 0 {
                rendered.push_str(&format!(".{micros:06}"));
            }
            CellValue::String(rendered)
        }
    }
}

fn typed_text_cell(text: &str, column: &Column) -> Option<CellValue> {
    match column.column_type() {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => {
            if column.flags().contains(ColumnFlags::UNSIGNED_FLAG) {
                text.parse::<u64>().ok().map(CellValue::from)
            } else {
                text.parse::<i64>().ok().map(CellValue::from)
            }
        }
        ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => {
            text.parse::<f64>().ok().map(float_cell)
        }
        _ => None,
    }
}

fn float_cell(value: f64) -> CellValue {
    Number::from_f64(value).map_or(CellValue::Null, CellValue::Number)
}

fn to_backend_error(error: mysql_async::Error) -> BackendError {
    match error {
        mysql_async::Error::Server(server) => BackendError::new(server.message),
        mysql_async::Error::Io(io) => BackendError::connection_lost(io.to_string()),
        mysql_async::Error::Driver(driver @ DriverError::ConnectionClosed) => {
            BackendError::connection_lost(driver.to_string())
        }
        other => BackendError::new(other.to_string()),
    }
}
