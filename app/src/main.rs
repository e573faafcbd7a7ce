mod tracing_setup;

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mdbadmin_adapters::MysqlConnectionBackend;
use mdbadmin_core::gateway::ExecutionGateway;
use mdbadmin_core::pool_store::FilePoolStore;
use mdbadmin_server::ServerConfig;
use tracing::info;

/// HTTP gateway for registering MariaDB/MySQL pools and running SQL against them.
#[derive(Debug, Parser)]
#[command(name = "mdbadmin", version)]
struct Cli {
    /// TOML config file; flags below override its values
    #[arg(short, long, env = "MDBADMIN_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to
    #[arg(short, long, env = "MDBADMIN_BIND")]
    bind: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long, env = "MDBADMIN_PORT")]
    port: Option<u16>,

    /// Pools file (default: platform config dir, or $MDBADMIN_DATA_DIR/pools.json)
    #[arg(long, env = "MDBADMIN_POOLS_PATH")]
    pools_path: Option<PathBuf>,

    /// Connect timeout in seconds for pool registration and sessions
    #[arg(long)]
    connect_timeout_secs: Option<u64>,

    /// Only allow the local UI origins
    #[arg(long)]
    strict_cors: bool,

    /// Debug logging (ignored when RUST_LOG is set)
    #[arg(long)]
    debug: bool,
}

fn resolve_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(pools_path) = &cli.pools_path {
        config.pools_path = Some(pools_path.clone());
    }
    if let Some(secs) = cli.connect_timeout_secs {
        config.connect_timeout_secs = secs;
    }
    if cli.strict_cors {
        config.cors_permissive = false;
    }

    Ok(config)
}

fn open_store(config: &ServerConfig) -> anyhow::Result<FilePoolStore> {
    match &config.pools_path {
        Some(path) => Ok(FilePoolStore::new(path.clone())),
        None => FilePoolStore::open_default().context("cannot locate the pools file"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_setup::init_tracing(cli.debug)?;

    let config = resolve_config(&cli)?;
    let store = open_store(&config)?;
    info!(pools = %store.path().display(), "using pools file");

    let backend = MysqlConnectionBackend::new(config.connect_timeout());
    let gateway = Arc::new(ExecutionGateway::new(store, backend));
    mdbadmin_server::run_server(&config, gateway).await
}
