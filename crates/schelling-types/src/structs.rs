//! Core data structures shared between the simulation and its viewers.
//!
//! [`BoardSnapshot`] is the exact payload pushed to every viewer, both on
//! connect and on every broadcast. Its field names are part of the client
//! contract and must not change between pushes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CellClass, Tribe};
use crate::ids::AgentId;

/// Side length of the square board.
pub const GRID_SIZE: usize = 5;

/// Number of cells on the board.
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// A cell coordinate on the board, always in bounds.
///
/// `x` is the row and `y` the column, matching how the board client walks
/// the grid rows. The only ways to build one are the checked constructors,
/// so holding a `Position` proves `0 <= x, y < GRID_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    x: u8,
    y: u8,
}

impl Position {
    /// Build a position if both coordinates are on the board.
    pub fn new(x: usize, y: usize) -> Option<Self> {
        if x >= GRID_SIZE || y >= GRID_SIZE {
            return None;
        }
        Some(Self {
            x: u8::try_from(x).ok()?,
            y: u8::try_from(y).ok()?,
        })
    }

    /// Build a position from signed coordinates, as received from clients.
    pub fn from_signed(x: i64, y: i64) -> Option<Self> {
        Self::new(usize::try_from(x).ok()?, usize::try_from(y).ok()?)
    }

    /// Row index.
    pub const fn x(self) -> usize {
        self.x as usize
    }

    /// Column index.
    pub const fn y(self) -> usize {
        self.y as usize
    }

    /// Row-major index into a flat cell array of length [`CELL_COUNT`].
    #[allow(clippy::arithmetic_side_effects)] // both factors are below GRID_SIZE
    pub const fn index(self) -> usize {
        self.x() * GRID_SIZE + self.y()
    }

    /// Every cell on the board in row-major order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..GRID_SIZE).flat_map(|x| (0..GRID_SIZE).filter_map(move |y| Self::new(x, y)))
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// An agent on the board: an identity and a fixed tribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Agent {
    /// Stable identifier.
    pub id: AgentId,
    /// Tribe, fixed at creation.
    pub tribe: Tribe,
}

impl Agent {
    /// Create an agent.
    pub const fn new(id: AgentId, tribe: Tribe) -> Self {
        Self { id, tribe }
    }
}

/// Per-agent entry of the `agents` map in a [`BoardSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentInfo {
    /// The agent's tribe.
    pub tribe: Tribe,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// A complete, internally consistent view of the board at one instant.
///
/// Built while the simulation lock is held, so `grid` and `unhappy` always
/// describe the same committed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BoardSnapshot {
    /// Commit counter of the state this snapshot was taken from. Bumped on
    /// every committed mutation; repeated by heartbeat pushes.
    #[ts(type = "number")]
    pub version: u64,
    /// Current middle-cell contentment threshold.
    pub middle_threshold: u8,
    /// `grid[x][y]` holds the agent occupying that cell, if any.
    pub grid: Vec<Vec<Option<AgentId>>>,
    /// Tribe of every agent on the roster.
    pub agents: BTreeMap<AgentId, AgentInfo>,
    /// Agents whose neighborhood misses their threshold, in roster order.
    pub unhappy: Vec<AgentId>,
}

impl BoardSnapshot {
    /// Look up the occupant of a cell.
    pub fn occupant(&self, position: Position) -> Option<&AgentId> {
        self.grid
            .get(position.x())
            .and_then(|row| row.get(position.y()))
            .and_then(Option::as_ref)
    }

    /// Whether `agent` is in the unhappy set.
    pub fn is_unhappy(&self, agent: &AgentId) -> bool {
        self.unhappy.contains(agent)
    }
}

/// Breakdown of one agent's happiness evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HappinessReport {
    /// The evaluated agent.
    pub agent: AgentId,
    /// Its tribe.
    pub tribe: Tribe,
    /// Where it currently sits.
    pub position: Position,
    /// Class of that cell.
    pub cell_class: CellClass,
    /// Neighbors occupied by an agent of the same tribe.
    pub same_tribe_neighbors: u8,
    /// Neighbors occupied by any agent.
    pub occupied_neighbors: u8,
    /// Same-tribe neighbors required for this cell class.
    pub threshold: u8,
    /// Whether `same_tribe_neighbors >= threshold`.
    pub happy: bool,
}
