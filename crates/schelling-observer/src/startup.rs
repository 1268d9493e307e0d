//! Board server startup helper for the binary.
//!
//! Provides [`spawn_observer`] which binds the listener up front, so a port
//! clash fails startup instead of a background task, and then serves on a
//! background Tokio task.
//!
//! # Usage
//!
//! ```rust,ignore
//! use schelling_observer::startup::spawn_observer;
//!
//! let handle = spawn_observer(&config, state, shutdown_signal()).await?;
//! // The server is now running. Await the handle once shutdown is requested.
//! handle.await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the board server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind the configured address and serve on a background task.
///
/// The task finishes after `shutdown` resolves and every connection has
/// drained. Serve errors are logged from inside the task.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address is invalid or cannot be
/// bound.
pub async fn spawn_observer<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<JoinHandle<()>, StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::serve(listener, state, shutdown).await {
            tracing::error!(error = %e, "Board server exited with error");
        }
    });

    tracing::info!(%addr, "Board server spawned on background task");

    Ok(handle)
}
