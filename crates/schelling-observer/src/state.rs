//! Shared application state for the board server.
//!
//! [`AppState`] holds the [`Session`] every handler calls into, the server
//! start time for status reporting, and a shutdown flag that tells open
//! `WebSocket` tasks to close so a graceful shutdown can complete.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use schelling_core::Session;
use tokio::sync::watch;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug)]
pub struct AppState {
    /// The simulation all operations go through.
    pub session: Arc<Session>,
    /// When this state was created.
    pub started_at: DateTime<Utc>,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Wrap a session for serving.
    pub fn new(session: Arc<Session>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            session,
            started_at: Utc::now(),
            shutdown,
        }
    }

    /// Whole seconds since the state was created.
    pub fn uptime_seconds(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
            .max(0)
    }

    /// Receiver that flips to `true` once [`AppState::begin_shutdown`] is
    /// called.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Ask every open `WebSocket` task to close.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Whether shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}
