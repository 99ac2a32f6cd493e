//! Half-Suit game server binary.
//!
//! Single-process WebSocket server: sessions live in an in-memory store,
//! one orchestrator serializes all state transitions per game code.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use ctrlc::set_handler;
use pico_args::Arguments;

use half_suit::MemoryStore;
use hs_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging,
    orchestrator::Orchestrator,
};

const HELP: &str = "\
Run a Half-Suit card game server

USAGE:
  hs_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3000]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STORE_TIMEOUT_SECS       Bound on a single store operation  [default: 5]
  SESSION_RETENTION_SECS   Finished game retention before deletion  [default: 300]
  RUST_LOG                 Log filter (e.g., debug, hs_server=debug)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(bind_override)?;
    tracing::info!(bind = %config.bind, "starting Half-Suit server");

    let store = Arc::new(MemoryStore::with_timeout(config.store_timeout));
    let orchestrator = Arc::new(Orchestrator::new(store, config.session_retention));

    let app = api::create_router(AppState { orchestrator });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    tracing::info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
