//! Board server lifecycle management.
//!
//! [`serve`] runs the board on an already bound listener until the supplied
//! shutdown future resolves. Binding happens in
//! [`spawn_observer`](crate::startup::spawn_observer).

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Configuration for the board server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl ServerConfig {
    /// Parse `host:port` into a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the host is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ServerError::Bind(format!("invalid address {}:{}: {e}", self.host, self.port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8000,
        }
    }
}

/// Serve the board on an already bound listener until `shutdown` resolves.
///
/// When `shutdown` resolves the server stops accepting connections, every
/// open `WebSocket` is closed, and in-flight requests finish before this
/// returns.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] if the server hits a fatal I/O error.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Board server listening");
    }

    let router = build_router(Arc::clone(&state));
    let signal = async move {
        shutdown.await;
        info!("Board server shutting down");
        state.begin_shutdown();
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    Ok(())
}

/// Errors that can occur when starting or running the board server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_addr_parses_host_and_port() {
        let config = ServerConfig {
            host: String::from("127.0.0.1"),
            port: 9000,
        };
        assert!(matches!(config.socket_addr(), Ok(addr) if addr.port() == 9000));
    }

    #[test]
    fn hostname_is_rejected() {
        let config = ServerConfig {
            host: String::from("not a host"),
            port: 9000,
        };
        assert!(matches!(config.socket_addr(), Err(ServerError::Bind(_))));
    }
}
