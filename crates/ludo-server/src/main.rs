//! Ludo server binary.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `ludo-config.yaml` (or `$LUDO_CONFIG`)
//! 3. Create the room store and start the idle sweeper
//! 4. Serve HTTP and `WebSocket` traffic until `Ctrl-C`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use ludo_core::ServerConfig;
use ludo_core::config::DEFAULT_CONFIG_FILE;
use ludo_server::{AppState, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("ludo-server starting");

    // 2. Load configuration.
    let path = std::env::var_os("LUDO_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
    let config = ServerConfig::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        max_players = config.rooms.max_players,
        idle_timeout_secs = config.rooms.idle_timeout_secs,
        "Configuration loaded"
    );

    // 3. Room store and sweeper.
    let http = config.server.clone();
    let state = Arc::new(AppState::new(config));
    let sweeper = state.store.spawn_idle_sweeper();

    // 4. Serve.
    let result = start_server(&http, Arc::clone(&state))
        .await
        .context("running HTTP server");

    if let Some(handle) = sweeper {
        handle.abort();
    }
    state.store.clear().await;
    result
}
