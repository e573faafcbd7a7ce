pub mod mysql;

pub use mysql::{MysqlConnectionBackend, DEFAULT_CONNECT_TIMEOUT};
