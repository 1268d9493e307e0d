//! Error types for the `schelling-core` crate.
//!
//! Every rejected operation returns a [`SimulationError`] and leaves the
//! board exactly as it was. None of these errors are fatal; the simulation
//! keeps serving after any of them.

use schelling_types::{AgentId, Position};

/// Errors returned by board and scenario operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    /// The referenced agent is not on the roster.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// The target coordinates are outside the board.
    #[error("position ({x}, {y}) is out of bounds")]
    OutOfBounds {
        /// Requested row.
        x: i64,
        /// Requested column.
        y: i64,
    },

    /// The target cell already holds a different agent.
    #[error("cell {position} is occupied by {occupant}")]
    CellOccupied {
        /// The contested cell.
        position: Position,
        /// The agent sitting there.
        occupant: AgentId,
    },

    /// The middle-cell threshold is outside the accepted range.
    #[error("invalid threshold {value}: must be between 0 and {max}")]
    InvalidThreshold {
        /// The rejected value.
        value: i64,
        /// Largest accepted value.
        max: u8,
    },

    /// More agents than cells were supplied.
    #[error("roster of {agents} agents does not fit on {cells} cells")]
    RosterTooLarge {
        /// Roster size.
        agents: usize,
        /// Cells on the board.
        cells: usize,
    },

    /// An explicit placement does not describe a valid board.
    #[error("invalid placement: {0}")]
    InvalidPlacement(String),
}
