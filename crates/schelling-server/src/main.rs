//! Board server binary for the Schelling board.
//!
//! Wires the session, the heartbeat, and the HTTP front end together and
//! runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `schelling-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Build the session with the standard 17-agent roster
//! 4. Start the heartbeat task
//! 5. Bind and serve the board
//! 6. On `Ctrl-C`: close viewer sockets, drain requests, stop the heartbeat

mod error;

use std::path::Path;
use std::sync::Arc;

use schelling_core::config::{LogFormat, LoggingConfig};
use schelling_core::{Heartbeat, SchellingConfig, Session};
use schelling_observer::server::ServerConfig;
use schelling_observer::startup::spawn_observer;
use schelling_observer::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerBinaryError;

/// Path of the configuration file, relative to the working directory.
const CONFIG_PATH: &str = "schelling-config.yaml";

/// Application entry point for the board server.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the listener cannot be
/// set up, or if the server task fails.
#[tokio::main]
async fn main() -> Result<(), ServerBinaryError> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!("schelling-server starting");
    if from_file {
        info!(path = CONFIG_PATH, "Configuration loaded");
    } else {
        info!(path = CONFIG_PATH, "Config file not found, using defaults");
    }
    info!(
        host = config.server.host,
        port = config.server.port,
        seed = ?config.simulation.seed,
        middle_threshold = config.simulation.middle_threshold,
        heartbeat_interval_ms = config.broadcast.heartbeat_interval_ms,
        viewer_queue_capacity = config.broadcast.viewer_queue_capacity,
        "Effective configuration"
    );

    // 3. Build the session.
    let session = Arc::new(Session::from_config(&config)?);

    // 4. Start the heartbeat.
    let heartbeat = Heartbeat::spawn(Arc::clone(&session), config.broadcast.heartbeat_interval());

    // 5. Serve the board.
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let state = Arc::new(AppState::new(session));
    let server = match spawn_observer(&server_config, state, shutdown_signal()).await {
        Ok(handle) => handle,
        Err(e) => {
            heartbeat.stop().await;
            return Err(e.into());
        }
    };
    info!(host = server_config.host, port = server_config.port, "Board server started");

    // 6. Wait for shutdown.
    let served = server.await;
    heartbeat.stop().await;
    served?;

    info!("schelling-server stopped");
    Ok(())
}

/// Load configuration from [`CONFIG_PATH`].
///
/// Falls back to defaults (still honoring the environment overrides) when
/// the file does not exist. The flag reports whether the file was read.
fn load_config() -> Result<(SchellingConfig, bool), ServerBinaryError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        let config = SchellingConfig::from_file(config_path)?;
        Ok((config, true))
    } else {
        let mut config = SchellingConfig::default();
        config.server.apply_env_overrides()?;
        Ok((config, false))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), ServerBinaryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let installed = match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    installed.map_err(|e| ServerBinaryError::Logging {
        message: e.to_string(),
    })
}

/// Resolve when the process receives `Ctrl-C`.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
    }
}
