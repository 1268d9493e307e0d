//! HTTP and `WebSocket` front end for the Schelling board.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **Board page** (`GET /`) rendering the 5x5 board, the move form, the
//!   scenario picker, and an inline script that redraws the board from
//!   every pushed snapshot
//! - **`WebSocket` endpoint** (`/ws`) streaming a [`BoardSnapshot`] JSON
//!   text frame on connect, after every committed change, and on every
//!   heartbeat
//! - **Control endpoints** (`POST /move`, `/reset`, `/scenario/{threshold}`)
//! - **REST reads** (`/api/snapshot`, `/api/agents/{id}`, `/api/status`)
//!
//! # Architecture
//!
//! Handlers hold no board state of their own; they call into the shared
//! [`Session`], which serializes every operation and queues snapshots to
//! viewers. Each `WebSocket` task drains its own viewer queue, so a slow
//! client never holds up a move.
//!
//! [`BoardSnapshot`]: schelling_types::BoardSnapshot
//! [`Session`]: schelling_core::Session

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, serve};
pub use state::AppState;
