//! Cellswap Daemon
//!
//! Loads configuration, seeds the board and serves it over TCP until stopped.

use anyhow::{Context, Result};
use cellswap_daemon::app::AppState;
use cellswap_daemon::config::Config;
use cellswap_daemon::event_loop::run_event_loop;
use cellswap_daemon::server::run_ipc_server;
use cellswap_daemon::DaemonEvent;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (needed for log level)
    let mut config = Config::load().unwrap_or_else(|e| {
        // Can't use tracing yet, fall back to eprintln
        eprintln!("Failed to load configuration: {}. Using defaults.", e);
        Config::default()
    });

    // Validate and clamp config values
    let config_warnings = config.validate();

    // Initialize logging with configured log level
    let log_level = match config.behavior.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    for w in &config_warnings {
        warn!("Config: {} - {}", w.field, w.message);
    }

    info!("cellswap daemon starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: rows={}, items_per_row={}, duration={}ms, easing={:?}",
        config.grid.initial_rows,
        config.grid.items_per_row,
        config.animation.duration_ms,
        config.animation.easing
    );

    let listener = TcpListener::bind(&config.ipc.address)
        .await
        .with_context(|| format!("Failed to bind {} (is another daemon running?)", config.ipc.address))?;
    info!("Listening on {}", listener.local_addr()?);

    let state = Arc::new(Mutex::new(AppState::new_with_config(config)));

    // Create event channel
    let (event_tx, event_rx) = mpsc::channel::<DaemonEvent>(100);

    // Start IPC server
    tokio::spawn(run_ipc_server(listener, event_tx.clone()));

    // Ctrl+C handler
    {
        let shutdown_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Ctrl+C received, initiating shutdown...");
                let _ = shutdown_tx.send(DaemonEvent::Shutdown).await;
            }
        });
    }

    info!("Ready. Use cellswap-cli to send commands.");

    run_event_loop(state, event_tx, event_rx).await;

    info!("cellswap daemon stopped");
    Ok(())
}
