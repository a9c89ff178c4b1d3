//! kvreplica-server binary entry point.
//!
//! Usage:
//! ```bash
//! kvreplica-server --config server.toml
//! ```
//!
//! Runs until Ctrl-C, then stops gracefully.

use anyhow::Context;
use replica_server::{Config, ReplicationServer};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = get_config_path();
    let server = if path.exists() {
        ReplicationServer::from_config_file(&path)
            .await
            .with_context(|| format!("failed to start from {}", path.display()))?
    } else {
        tracing::warn!("Config file {:?} not found, using defaults", path);
        ReplicationServer::bind(Config::default())
            .await
            .context("failed to bind default address")?
    };

    tracing::info!(
        "kvreplica-server v{} loaded {} entries",
        env!("CARGO_PKG_VERSION"),
        server.snapshot().len()
    );

    server.serve()?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!(
        "Shutdown requested, draining {} connections",
        server.connections()
    );
    server.graceful_stop().await;

    Ok(())
}

fn get_config_path() -> PathBuf {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("server.toml"))
}
