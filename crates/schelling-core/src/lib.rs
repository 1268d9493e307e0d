//! Board state, happiness rules, and viewer fan-out for the Schelling board.
//!
//! All mutable state sits behind a single [`Session`]: HTTP handlers and
//! `WebSocket` tasks call into it, and it pushes a fresh snapshot to every
//! live viewer whenever something commits.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `schelling-config.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- [`SimulationError`], the rejection reasons for every
//!   operation.
//! - [`grid`] -- The 5x5 board, agent placement, moves and reshuffles.
//! - [`happiness`] -- Per-agent happiness evaluation.
//! - [`heartbeat`] -- Periodic re-broadcast task.
//! - [`hub`] -- Non-blocking fan-out to viewer queues.
//! - [`scenario`] -- Per-cell-class thresholds.
//! - [`session`] -- The serialized owner of board, scenario, and hub.
//!
//! [`Session`]: session::Session
//! [`SimulationError`]: error::SimulationError

pub mod config;
pub mod error;
pub mod grid;
pub mod happiness;
pub mod heartbeat;
pub mod hub;
pub mod scenario;
pub mod session;

pub use config::{ConfigError, SchellingConfig};
pub use error::SimulationError;
pub use grid::{GridState, MoveOutcome};
pub use heartbeat::Heartbeat;
pub use session::{Session, SessionStatus};
