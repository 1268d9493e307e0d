//! Error types for the board API.
//!
//! [`ObserverError`] wraps every failure a handler can report and converts
//! it into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use schelling_core::SimulationError;

/// Errors that can occur in the board API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The session rejected the operation.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

impl ObserverError {
    /// HTTP status the error is reported with.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Simulation(e) => match e {
                SimulationError::UnknownAgent(_) => StatusCode::NOT_FOUND,
                SimulationError::CellOccupied { .. } => StatusCode::CONFLICT,
                SimulationError::OutOfBounds { .. } | SimulationError::InvalidThreshold { .. } => {
                    StatusCode::BAD_REQUEST
                }
                SimulationError::RosterTooLarge { .. } | SimulationError::InvalidPlacement(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
