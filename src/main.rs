//! hircd - multiplexing IRC daemon.
//!
//! Holds IRC connections open for a single user and serves local clients
//! over a Unix socket.

use hircd::config::{self, Config};
use hircd::daemon::Daemon;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::default_config_path);

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path.display(), error = %e, "Failed to load config");
        e
    })?;

    info!(
        servers = config.servers.len(),
        socket = %config.socket_path().display(),
        "Starting hircd"
    );

    let daemon = Daemon::start(&config)?;

    tokio::signal::ctrl_c().await?;
    info!("Signal received; shutting down");
    daemon.shutdown().await;

    Ok(())
}
