use mdbadmin_adapters::mysql::MysqlConnectionBackend;
use mdbadmin_core::connection_registry::ConnectionBackend;
use mdbadmin_core::gateway::{ExecutionGateway, GatewayError, RawMode, RawOutcome};
use mdbadmin_core::pool_store::{FilePoolStore, PoolParams};
use mdbadmin_core::results::StatementOutcome;
use serde_json::json;
use tempfile::TempDir;

fn mysql_integration_enabled() -> bool {
    matches!(
        std::env::var("MDBADMIN_RUN_MYSQL_INTEGRATION").ok().as_deref(),
        Some("1")
    )
}

fn integration_params(database: &str) -> PoolParams {
    let host = std::env::var("MDBADMIN_TEST_DB_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let user = std::env::var("MDBADMIN_TEST_DB_USER").unwrap_or_else(|_| "root".to_string());
    let port = std::env::var("MDBADMIN_TEST_DB_PORT")
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(3306);

    let mut params = PoolParams::new(host, user, database);
    params.port = port;
    params
}

fn integration_password() -> String {
    std::env::var("MDBADMIN_TEST_DB_PASSWORD").unwrap_or_default()
}

async fn execute_sql(backend: &MysqlConnectionBackend, params: &PoolParams, sql: &str) {
    let mut connection = backend
        .connect(params, &integration_password())
        .await
        .expect("admin connect should succeed");
    backend
        .execute(&mut connection, sql)
        .await
        .expect("admin statement should succeed");
    backend
        .disconnect(connection)
        .await
        .expect("admin disconnect should succeed");
}

#[tokio::test(flavor = "current_thread")]
async fn mysql_backend_registration_connect_and_query_paths() {
    if !mysql_integration_enabled() {
        return;
    }

    let database = "mdbadmin_adapters_cov";
    let backend = MysqlConnectionBackend::default();
    let admin = integration_params("");
    execute_sql(&backend, &admin, &format!("DROP DATABASE IF EXISTS `{database}`")).await;
    execute_sql(&backend, &admin, &format!("CREATE DATABASE `{database}`")).await;

    let temp_dir = TempDir::new().expect("failed to create temp directory");
    let gateway = ExecutionGateway::new(
        FilePoolStore::new(temp_dir.path().join("pools.json")),
        MysqlConnectionBackend::default(),
    );
    let password = integration_password();

    let first = gateway
        .register_pool(integration_params(database), &password)
        .await
        .expect("first registration should succeed");
    let second = gateway
        .register_pool(integration_params(database), &password)
        .await
        .expect("second registration should succeed");
    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
    let persisted = std::fs::read_to_string(gateway.store().path()).expect("pools file");
    assert!(password.is_empty() || !persisted.contains(&password));

    let err = gateway
        .connect(first.id, "definitely-not-the-password")
        .await
        .expect_err("wrong password should be rejected");
    assert!(matches!(err, GatewayError::Connectivity(_)));
    assert!(!gateway.is_connected(first.id));

    gateway
        .connect(first.id, &password)
        .await
        .expect("connect should succeed");
    assert!(gateway.is_connected(first.id));

    let tables = gateway
        .execute_named(first.id, "tables", None)
        .await
        .expect("tables query should succeed");
    assert_eq!(tables.headers, vec!["TABLE NAME"]);
    assert!(tables.rows.is_empty());

    let created = gateway
        .execute_raw(first.id, "CREATE TABLE t (id INT)", RawMode::Own)
        .await
        .expect("create table should succeed");
    assert!(matches!(created, RawOutcome::Acknowledged(_)));

    let inserted = gateway
        .execute_raw(first.id, "INSERT INTO t (id) VALUES (1), (2)", RawMode::Own)
        .await
        .expect("insert should succeed");
    let RawOutcome::Acknowledged(ack) = inserted else {
        panic!("insert should be acknowledged");
    };
    assert_eq!(ack.affected_rows, 2);

    let selected = gateway
        .execute_raw(first.id, "SELECT id FROM t ORDER BY id", RawMode::Tabular)
        .await
        .expect("select should succeed");
    let RawOutcome::Table(table) = selected else {
        panic!("select should be tabular");
    };
    assert_eq!(table.headers, vec!["ID"]);
    assert_eq!(table.rows, vec![vec![json!(1)], vec![json!(2)]]);

    let err = gateway
        .execute_raw(first.id, "CREATE TABLE t (id INT)", RawMode::Own)
        .await
        .expect_err("duplicate table should fail");
    assert!(err.to_string().contains("already exists"));
    assert!(gateway.is_connected(first.id));

    let mut connection = backend
        .connect(&integration_params(database), &password)
        .await
        .expect("direct connect should succeed");
    let outcome = backend
        .execute(&mut connection, "SELECT NULL AS nothing, 1.5 AS ratio")
        .await
        .expect("select should succeed");
    let StatementOutcome::Records(set) = outcome else {
        panic!("select should return records");
    };
    assert_eq!(set.columns, vec!["nothing", "ratio"]);
    assert_eq!(set.records[0].get("nothing"), Some(&json!(null)));
    backend
        .disconnect(connection)
        .await
        .expect("direct disconnect should succeed");

    gateway.shutdown().await;
    assert!(!gateway.is_connected(first.id));
    execute_sql(&backend, &admin, &format!("DROP DATABASE IF EXISTS `{database}`")).await;
}
