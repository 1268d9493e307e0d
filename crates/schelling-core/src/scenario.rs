//! Scenario parameterization: the contentment thresholds per cell class.
//!
//! Only the middle-cell threshold is adjustable. Side and corner cells
//! always require 2 and 1 same-tribe neighbors respectively.

use schelling_types::{CellClass, ScenarioPreset};
use tracing::info;

use crate::error::SimulationError;

/// Same-tribe neighbors a corner resident needs.
pub const CORNER_THRESHOLD: u8 = 1;

/// Same-tribe neighbors a side resident needs.
pub const SIDE_THRESHOLD: u8 = 2;

/// Largest meaningful middle threshold (every neighbor of a middle cell).
pub const MAX_MIDDLE_THRESHOLD: u8 = CellClass::Middle.max_neighbors();

/// Middle threshold the board starts with.
pub const DEFAULT_MIDDLE_THRESHOLD: u8 = ScenarioPreset::Moderate.middle_threshold();

/// Holds and validates the middle-cell threshold.
///
/// The value persists across board resets until explicitly changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioController {
    middle_threshold: u8,
}

impl ScenarioController {
    /// Create a controller with the given middle threshold.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidThreshold`] if the value is outside
    /// `0..=8`.
    pub fn new(middle_threshold: i64) -> Result<Self, SimulationError> {
        Ok(Self {
            middle_threshold: validate(middle_threshold)?,
        })
    }

    /// The current middle-cell threshold.
    pub const fn threshold(&self) -> u8 {
        self.middle_threshold
    }

    /// Threshold that applies to a cell of the given class.
    pub const fn threshold_for(&self, class: CellClass) -> u8 {
        match class {
            CellClass::Corner => CORNER_THRESHOLD,
            CellClass::Side => SIDE_THRESHOLD,
            CellClass::Middle => self.middle_threshold,
        }
    }

    /// Replace the middle threshold.
    ///
    /// Values outside `0..=8` are rejected rather than clamped; the stored
    /// value is unchanged on error.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidThreshold`] for out-of-range values.
    pub fn set_threshold(&mut self, value: i64) -> Result<u8, SimulationError> {
        let threshold = validate(value)?;
        let previous = self.middle_threshold;
        self.middle_threshold = threshold;
        info!(previous, threshold, "middle threshold changed");
        Ok(threshold)
    }
}

impl Default for ScenarioController {
    fn default() -> Self {
        Self {
            middle_threshold: DEFAULT_MIDDLE_THRESHOLD,
        }
    }
}

fn validate(value: i64) -> Result<u8, SimulationError> {
    u8::try_from(value)
        .ok()
        .filter(|&t| t <= MAX_MIDDLE_THRESHOLD)
        .ok_or(SimulationError::InvalidThreshold {
            value,
            max: MAX_MIDDLE_THRESHOLD,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_is_scenario_two() {
        let scenario = ScenarioController::default();
        assert_eq!(scenario.threshold(), ScenarioPreset::Moderate.middle_threshold());
    }

    #[test]
    fn fixed_thresholds_for_edges() {
        let scenario = ScenarioController::new(6).unwrap();
        assert_eq!(scenario.threshold_for(CellClass::Corner), 1);
        assert_eq!(scenario.threshold_for(CellClass::Side), 2);
        assert_eq!(scenario.threshold_for(CellClass::Middle), 6);
    }

    #[test]
    fn accepts_whole_range() {
        let mut scenario = ScenarioController::default();
        for value in 0..=8 {
            assert_eq!(scenario.set_threshold(value), Ok(u8::try_from(value).unwrap()));
        }
    }

    #[test]
    fn rejects_out_of_range_and_keeps_previous() {
        let mut scenario = ScenarioController::new(4).unwrap();
        for value in [-1, 9, 256, i64::MAX, i64::MIN] {
            assert_eq!(
                scenario.set_threshold(value),
                Err(SimulationError::InvalidThreshold { value, max: 8 })
            );
        }
        assert_eq!(scenario.threshold(), 4);
        assert!(ScenarioController::new(12).is_err());
    }
}
