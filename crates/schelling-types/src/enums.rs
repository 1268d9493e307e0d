//! Enumeration types for the Schelling board.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Tribes
// ---------------------------------------------------------------------------

/// One of the two groups an agent belongs to.
///
/// Assigned when the roster is built and never changed. The serialized
/// name doubles as the CSS class the board client colors cells with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Tribe {
    /// The blue tribe.
    Blue,
    /// The grey tribe.
    Grey,
}

impl core::fmt::Display for Tribe {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Blue => f.write_str("Blue"),
            Self::Grey => f.write_str("Grey"),
        }
    }
}

// ---------------------------------------------------------------------------
// Cell classes
// ---------------------------------------------------------------------------

/// Classification of a cell by how many grid boundaries it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CellClass {
    /// On two boundary axes.
    Corner,
    /// On exactly one boundary axis.
    Side,
    /// Not on any boundary.
    Middle,
}

impl CellClass {
    /// Number of cells adjacent to a cell of this class.
    pub const fn max_neighbors(self) -> u8 {
        match self {
            Self::Corner => 3,
            Self::Side => 5,
            Self::Middle => 8,
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario presets
// ---------------------------------------------------------------------------

/// The named scenarios offered on the board page.
///
/// Each one only differs in the middle-cell threshold; side and corner
/// thresholds are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ScenarioPreset {
    /// Middle residents want 2 of 8 neighbors of their tribe.
    Tolerant,
    /// Middle residents want 3 of 8 neighbors of their tribe.
    Moderate,
    /// Middle residents want 4 of 8 neighbors of their tribe.
    Demanding,
}

impl ScenarioPreset {
    /// All presets in the order the page lists them.
    pub const ALL: [Self; 3] = [Self::Tolerant, Self::Moderate, Self::Demanding];

    /// The middle-cell threshold this preset selects.
    pub const fn middle_threshold(self) -> u8 {
        match self {
            Self::Tolerant => 2,
            Self::Moderate => 3,
            Self::Demanding => 4,
        }
    }

    /// Human-readable label, e.g. `Scenario 2 (3 out of 8)`.
    pub fn label(self) -> String {
        let number = match self {
            Self::Tolerant => 1,
            Self::Moderate => 2,
            Self::Demanding => 3,
        };
        format!(
            "Scenario {number} ({} out of {})",
            self.middle_threshold(),
            CellClass::Middle.max_neighbors()
        )
    }

    /// Find the preset with the given middle-cell threshold, if any.
    pub fn from_threshold(threshold: u8) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.middle_threshold() == threshold)
    }
}
