//! `tollgated` — the Tollgate execution gateway daemon.
//!
//! Loads `tollgate.toml` from the tollgate data directory (or an explicit
//! path), wires the service graph, binds the Unix socket, and serves
//! until interrupted. Ctrl-C stops every live side execution before the
//! process exits.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tollgate_core::dirs::TollgateHome;
use tollgate_gateway::{
    GatewayConfig, NullExecutor, RequestDispatcher, Services, SocketServer,
    socket::default_socket_path,
};

/// Tollgate — execution gateway daemon.
#[derive(Parser)]
#[command(name = "tollgated")]
#[command(author, version, about = "Tollgate execution gateway daemon")]
struct Args {
    /// Configuration file path (defaults to tollgate.toml in the data dir).
    #[arg(long, env = "TOLLGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Unix socket path override.
    #[arg(long, env = "TOLLGATE_SOCKET")]
    socket: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let home = TollgateHome::resolve().context("failed to resolve the tollgate directory")?;
    home.ensure()
        .context("failed to create the tollgate directory")?;

    let config_path = args.config.unwrap_or_else(|| home.config_path());
    let config = GatewayConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let socket_path = args
        .socket
        .or_else(|| config.socket_path.clone())
        .unwrap_or_else(|| default_socket_path(home.root()));

    let services = Services::build(&config, Some(&home));
    let supervisor = Arc::clone(&services.supervisor);
    let dispatcher = Arc::new(RequestDispatcher::new(&services, Arc::new(NullExecutor)));
    let server = Arc::new(SocketServer::new(&services, dispatcher));

    let listener = SocketServer::bind(&socket_path)
        .with_context(|| format!("failed to bind {}", socket_path.display()))?;
    let accept = server.spawn(listener);

    info!(
        socket = %socket_path.display(),
        profile = ?config.profile,
        "tollgated ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    accept.abort();
    supervisor.shutdown_all().await;
    let _ = std::fs::remove_file(&socket_path);
    info!("Goodbye");
    Ok(())
}
