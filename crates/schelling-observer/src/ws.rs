//! `WebSocket` handler for the live board stream.
//!
//! Clients connect to `GET /ws` and receive a JSON-encoded
//! [`BoardSnapshot`](schelling_types::BoardSnapshot) text frame right away,
//! then one after every committed change and on every heartbeat.
//!
//! Each connection registers a viewer queue with the session and drains it
//! here. If the session drops the viewer (its queue filled up) the queue
//! ends and the socket is closed. The board page reopens the socket with a
//! capped backoff and redraws from the first frame it receives. Text and binary frames sent by the client are ignored.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming board snapshots.
///
/// # Route
///
/// `GET /ws`
///
/// Answers 503 once shutdown has begun.
pub async fn ws_board(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    if state.is_shutting_down() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: register with the session, forward
/// queued snapshots as text frames, and unregister on the way out.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut subscription = state.session.connect().await;
    let connection = subscription.id;
    let mut shutdown = state.shutdown_signal();
    debug!(%connection, "WebSocket client connected");

    loop {
        tokio::select! {
            // Next snapshot queued for this viewer.
            next = subscription.receiver.recv() => {
                let Some(snapshot) = next else {
                    debug!(%connection, "viewer dropped by hub, closing WebSocket");
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                };
                let json = match serde_json::to_string(snapshot.as_ref()) {
                    Ok(j) => j,
                    Err(e) => {
                        warn!(%connection, "Failed to serialize board snapshot: {e}");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    debug!(%connection, "WebSocket client disconnected (send failed)");
                    break;
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%connection, "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%connection, "WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%connection, "WebSocket error: {e}");
                        break;
                    }
                    _ => {}
                }
            }
            // Server is going down.
            () = async { let _ = shutdown.wait_for(|stopping| *stopping).await; } => {
                debug!(%connection, "server shutting down, closing WebSocket");
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.session.disconnect(connection).await;
}
