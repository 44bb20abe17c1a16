//! Flat JSON property store server
//!
//! Serves the Object → Version → Revision → Property hierarchy over HTTP,
//! backed by a single SQLite database.
//!
//! Usage:
//!   flatjson-server --database flat-json.db --port 4100
//!
//! Pass `--database :memory:` for a throwaway store.

use anyhow::{Context, Result};
use clap::Parser;
use flatjson_server::{build_router, MOUNT};
use flatjson_storage::{Database, HierarchyStore, StoreConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const IN_MEMORY: &str = ":memory:";

#[derive(Parser, Debug)]
#[command(name = "flatjson-server")]
#[command(about = "Hierarchical versioned JSON property store")]
struct Args {
    /// SQLite database path, or `:memory:`
    #[arg(short, long, env = "FLATJSON_DATABASE", default_value = "flat-json.db")]
    database: String,

    /// Address to bind the HTTP API on
    #[arg(long, env = "FLATJSON_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port for the HTTP API
    #[arg(short, long, env = "FLATJSON_PORT", default_value = "4100")]
    port: u16,

    /// Reject explicit version labels that are not semantic versions
    #[arg(long, env = "FLATJSON_REQUIRE_SEMVER")]
    require_semver: bool,

    /// Enable verbose debug logging
    #[arg(short, long, env = "FLATJSON_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Flat JSON server starting...");
    let config = StoreConfig {
        require_semver: args.require_semver,
    };
    let store = open_store(&args.database, config)?;
    let app = build_router(Arc::new(store));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("HTTP API listening on http://{}{}", listener.local_addr()?, MOUNT);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Flat JSON server stopped");
    Ok(())
}

fn open_store(database: &str, config: StoreConfig) -> Result<HierarchyStore> {
    if database == IN_MEMORY {
        info!("Using in-memory store; data is discarded on exit");
        let db = Database::open_in_memory().context("failed to open in-memory store")?;
        return Ok(HierarchyStore::new(db, config));
    }
    info!("Using store at {}", database);
    HierarchyStore::open(database, config).with_context(|| format!("failed to open {database}"))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
