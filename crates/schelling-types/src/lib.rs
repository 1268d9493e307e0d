//! Shared type definitions for the Schelling board simulation.
//!
//! This crate is the single source of truth for the types that cross the
//! boundary between the simulation core and its viewers. Types defined here
//! flow downstream to `TypeScript` via `ts-rs` for the board client.
//!
//! # Modules
//!
//! - [`ids`] -- Agent and viewer connection identifiers
//! - [`enums`] -- Tribes, cell classes, and scenario presets
//! - [`structs`] -- Positions, agents, snapshots, and happiness reports

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{CellClass, ScenarioPreset, Tribe};
pub use ids::{AgentId, ConnectionId};
pub use structs::{
    Agent, AgentInfo, BoardSnapshot, CELL_COUNT, GRID_SIZE, HappinessReport, Position,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the board client.

    #[test]
    fn export_bindings() {
        // Types with #[ts(export)] are written to the `bindings/` directory
        // relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::AgentId::export_all();
        let _ = crate::enums::Tribe::export_all();
        let _ = crate::enums::CellClass::export_all();
        let _ = crate::enums::ScenarioPreset::export_all();
        let _ = crate::structs::Position::export_all();
        let _ = crate::structs::Agent::export_all();
        let _ = crate::structs::AgentInfo::export_all();
        let _ = crate::structs::BoardSnapshot::export_all();
        let _ = crate::structs::HappinessReport::export_all();
    }
}
