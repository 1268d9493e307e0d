//! Error types for the board server binary.
//!
//! [`ServerBinaryError`] is the top-level error type that wraps every
//! failure mode during startup and shutdown.

/// Top-level error for the board server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ServerBinaryError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: schelling_core::ConfigError,
    },

    /// The session could not be built from the configuration.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: schelling_core::SimulationError,
    },

    /// The HTTP server failed to start.
    #[error("startup error: {source}")]
    Startup {
        /// The underlying startup error.
        #[from]
        source: schelling_observer::startup::StartupError,
    },

    /// The server task panicked or was cancelled.
    #[error("server task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },

    /// The logging subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
