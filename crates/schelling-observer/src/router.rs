//! Axum router construction for the board server.
//!
//! Assembles all routes (page, controls, REST reads, `WebSocket`) into a
//! single [`Router`] with CORS and request tracing enabled.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the board server.
///
/// The router includes:
/// - `GET /` -- board page
/// - `GET /ws` -- `WebSocket` snapshot stream
/// - `POST /move` -- move an agent
/// - `POST /reset` -- reshuffle the board
/// - `POST /scenario/{threshold}` -- set the middle-cell threshold
/// - `GET /api/snapshot` -- current board
/// - `GET /api/agents/{id}` -- happiness breakdown for one agent
/// - `GET /api/status` -- counters
///
/// CORS allows any origin so the board can be embedded elsewhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Board page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws", get(ws::ws_board))
        // Controls
        .route("/move", post(handlers::move_agent))
        .route("/reset", post(handlers::reset))
        .route("/scenario/{threshold}", post(handlers::change_scenario))
        // REST API
        .route("/api/snapshot", get(handlers::get_snapshot))
        .route("/api/agents/{id}", get(handlers::get_agent))
        .route("/api/status", get(handlers::get_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
