//! Per-agent contentment.
//!
//! An agent is happy when the number of same-tribe agents on adjacent
//! cells reaches the threshold for its cell class. Nothing here is cached:
//! every call reads the board as it is right now.

use schelling_types::{AgentId, HappinessReport};

use crate::error::SimulationError;
use crate::grid::{self, GridState};
use crate::scenario::ScenarioController;

/// Read-only view pairing a board with the thresholds it is judged by.
#[derive(Debug, Clone, Copy)]
pub struct HappinessEvaluator<'a> {
    grid: &'a GridState,
    scenario: &'a ScenarioController,
}

impl<'a> HappinessEvaluator<'a> {
    /// Evaluate `grid` against `scenario`.
    pub const fn new(grid: &'a GridState, scenario: &'a ScenarioController) -> Self {
        Self { grid, scenario }
    }

    /// Whether `agent` meets its threshold.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::UnknownAgent`] if the agent is not on the
    /// roster.
    pub fn is_happy(&self, agent: &AgentId) -> Result<bool, SimulationError> {
        self.report(agent).map(|report| report.happy)
    }

    /// Full breakdown of an agent's evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::UnknownAgent`] if the agent is not on the
    /// roster.
    pub fn report(&self, agent: &AgentId) -> Result<HappinessReport, SimulationError> {
        let unknown = || SimulationError::UnknownAgent(agent.clone());
        let tribe = self.grid.tribe_of(agent).ok_or_else(unknown)?;
        let position = self.grid.position_of(agent).ok_or_else(unknown)?;

        let mut same_tribe_neighbors: u8 = 0;
        let mut occupied_neighbors: u8 = 0;
        for neighbor in grid::neighbors(position) {
            let Some(occupant) = self.grid.agent_at(neighbor) else {
                continue;
            };
            occupied_neighbors = occupied_neighbors.saturating_add(1);
            if self.grid.tribe_of(occupant) == Some(tribe) {
                same_tribe_neighbors = same_tribe_neighbors.saturating_add(1);
            }
        }

        let cell_class = grid::cell_class(position);
        let threshold = self.scenario.threshold_for(cell_class);

        Ok(HappinessReport {
            agent: agent.clone(),
            tribe,
            position,
            cell_class,
            same_tribe_neighbors,
            occupied_neighbors,
            threshold,
            happy: same_tribe_neighbors >= threshold,
        })
    }

    /// Every agent that misses its threshold, in roster order.
    pub fn unhappy_agents(&self) -> Vec<AgentId> {
        self.grid
            .agent_ids()
            .filter(|agent| matches!(self.is_happy(agent), Ok(false)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use schelling_types::{Agent, CellClass, Position, Tribe};

    use super::*;
    use crate::grid::standard_roster;

    fn pos(x: usize, y: usize) -> Position {
        Position::new(x, y).unwrap()
    }

    fn id(token: &str) -> AgentId {
        AgentId::from(token)
    }

    /// Build a board from `(id, tribe, x, y)` rows.
    fn board(rows: &[(&str, Tribe, usize, usize)]) -> GridState {
        let roster = rows
            .iter()
            .map(|&(token, tribe, _, _)| Agent::new(id(token), tribe))
            .collect();
        let placement: BTreeMap<AgentId, Position> = rows
            .iter()
            .map(|&(token, _, x, y)| (id(token), pos(x, y)))
            .collect();
        GridState::with_placement(roster, &placement).unwrap()
    }

    /// The standard 17-agent roster laid out row-major from the top left,
    /// leaving the last eight cells empty.
    fn standard_board() -> GridState {
        let placement: BTreeMap<AgentId, Position> = standard_roster()
            .into_iter()
            .zip(Position::all())
            .map(|(agent, p)| (agent.id, p))
            .collect();
        GridState::with_placement(standard_roster(), &placement).unwrap()
    }

    #[test]
    fn isolated_corner_agent_is_unhappy_until_joined() {
        let scenario = ScenarioController::default();

        let lonely = board(&[("P01", Tribe::Blue, 0, 0), ("P02", Tribe::Grey, 0, 1)]);
        let eval = HappinessEvaluator::new(&lonely, &scenario);
        let report = eval.report(&id("P01")).unwrap();
        assert_eq!(report.cell_class, CellClass::Corner);
        assert_eq!(report.same_tribe_neighbors, 0);
        assert_eq!(report.occupied_neighbors, 1);
        assert!(!report.happy);

        let joined = board(&[
            ("P01", Tribe::Blue, 0, 0),
            ("P02", Tribe::Grey, 0, 1),
            ("P03", Tribe::Blue, 1, 1),
        ]);
        let eval = HappinessEvaluator::new(&joined, &scenario);
        assert_eq!(eval.is_happy(&id("P01")), Ok(true));
    }

    #[test]
    fn corner_agent_among_full_roster() {
        let scenario = ScenarioController::default();

        // P01 (Blue) in the top-left corner boxed in by three greys; the
        // other thirteen agents fill the board row-major around them.
        let mut placement: BTreeMap<AgentId, Position> = BTreeMap::from([
            (id("P01"), pos(0, 0)),
            (id("P02"), pos(0, 1)),
            (id("P04"), pos(1, 0)),
            (id("P06"), pos(1, 1)),
        ]);
        let boxed_in = [pos(0, 0), pos(0, 1), pos(1, 0), pos(1, 1)];
        let rest = standard_roster()
            .into_iter()
            .filter(|agent| !placement.contains_key(&agent.id))
            .zip(Position::all().filter(|p| !boxed_in.contains(p)))
            .collect::<Vec<_>>();
        for (agent, p) in rest {
            placement.insert(agent.id, p);
        }
        let mut b = GridState::with_placement(standard_roster(), &placement).unwrap();
        assert_eq!(b.agent_count(), 17);
        assert!(b.is_consistent());

        let report = HappinessEvaluator::new(&b, &scenario)
            .report(&id("P01"))
            .unwrap();
        assert_eq!(report.cell_class, CellClass::Corner);
        assert_eq!(report.occupied_neighbors, 3);
        assert_eq!(report.same_tribe_neighbors, 0);
        assert!(!report.happy);

        // Swap a grey neighbor out for a blue one.
        b.move_to(&id("P06"), pos(4, 4)).unwrap();
        b.move_to(&id("P03"), pos(1, 1)).unwrap();
        let eval = HappinessEvaluator::new(&b, &scenario);
        assert_eq!(eval.is_happy(&id("P01")), Ok(true));
        assert!(!eval.unhappy_agents().contains(&id("P01")));

        // Moving onto an occupied neighbor is refused and leaves the board
        // as it was.
        let err = b.move_agent(&id("P01"), 0, 1).unwrap_err();
        assert_eq!(
            err,
            SimulationError::CellOccupied {
                position: pos(0, 1),
                occupant: id("P02"),
            }
        );
        assert_eq!(b.position_of(&id("P01")), Some(pos(0, 0)));
        assert_eq!(b.agent_at(pos(0, 1)), Some(&id("P02")));
        assert!(b.is_consistent());
    }

    #[test]
    fn side_agent_needs_two() {
        let scenario = ScenarioController::default();
        let one = board(&[("P01", Tribe::Blue, 0, 2), ("P03", Tribe::Blue, 0, 1)]);
        assert_eq!(HappinessEvaluator::new(&one, &scenario).is_happy(&id("P01")), Ok(false));

        let two = board(&[
            ("P01", Tribe::Blue, 0, 2),
            ("P03", Tribe::Blue, 0, 1),
            ("P05", Tribe::Blue, 1, 3),
        ]);
        assert_eq!(HappinessEvaluator::new(&two, &scenario).is_happy(&id("P01")), Ok(true));
    }

    #[test]
    fn middle_agent_follows_scenario_threshold() {
        let b = board(&[
            ("P01", Tribe::Blue, 2, 2),
            ("P03", Tribe::Blue, 1, 1),
            ("P05", Tribe::Blue, 1, 2),
            ("P07", Tribe::Blue, 3, 3),
            ("P02", Tribe::Grey, 2, 1),
        ]);
        let mut scenario = ScenarioController::default();
        let report = HappinessEvaluator::new(&b, &scenario).report(&id("P01")).unwrap();
        assert_eq!(report.cell_class, CellClass::Middle);
        assert_eq!(report.same_tribe_neighbors, 3);
        assert_eq!(report.occupied_neighbors, 4);
        assert!(report.happy);

        scenario.set_threshold(4).unwrap();
        assert_eq!(HappinessEvaluator::new(&b, &scenario).is_happy(&id("P01")), Ok(false));
    }

    #[test]
    fn raising_threshold_never_makes_anyone_happier() {
        let b = GridState::standard(Some(17)).unwrap();
        for seed_board in [b, standard_board()] {
            let mut previous: Option<Vec<AgentId>> = None;
            for t in 0..=8 {
                let scenario = ScenarioController::new(t).unwrap();
                let unhappy = HappinessEvaluator::new(&seed_board, &scenario).unhappy_agents();
                if let Some(prev) = &previous {
                    for agent in prev {
                        assert!(unhappy.contains(agent), "{agent} became happy at {t}");
                    }
                }
                previous = Some(unhappy);
            }
        }
    }

    #[test]
    fn threshold_only_affects_middle_cells() {
        let b = standard_board();
        let low = ScenarioController::new(0).unwrap();
        let high = ScenarioController::new(8).unwrap();
        for agent in b.agent_ids() {
            let p = b.position_of(agent).unwrap();
            if grid::cell_class(p) != CellClass::Middle {
                assert_eq!(
                    HappinessEvaluator::new(&b, &low).is_happy(agent),
                    HappinessEvaluator::new(&b, &high).is_happy(agent),
                );
            }
        }
    }

    #[test]
    fn unhappy_agents_in_roster_order() {
        let b = standard_board();
        let scenario = ScenarioController::new(8).unwrap();
        let unhappy = HappinessEvaluator::new(&b, &scenario).unhappy_agents();
        let mut sorted = unhappy.clone();
        sorted.sort();
        assert_eq!(unhappy, sorted);
        assert_eq!(unhappy, HappinessEvaluator::new(&b, &scenario).unhappy_agents());
    }

    #[test]
    fn unhappy_set_tracks_moves() {
        let mut b = board(&[("P01", Tribe::Blue, 0, 0), ("P03", Tribe::Blue, 4, 4)]);
        let scenario = ScenarioController::default();
        assert_eq!(
            HappinessEvaluator::new(&b, &scenario).unhappy_agents(),
            vec![id("P01"), id("P03")]
        );

        // P03 lands on a side cell next to P01: the corner agent is now
        // content, the side agent still needs a second neighbor.
        b.move_agent(&id("P03"), 1, 0).unwrap();
        assert_eq!(
            HappinessEvaluator::new(&b, &scenario).unhappy_agents(),
            vec![id("P03")]
        );
    }

    #[test]
    fn unknown_agent_is_an_error() {
        let b = standard_board();
        let scenario = ScenarioController::default();
        assert_eq!(
            HappinessEvaluator::new(&b, &scenario).is_happy(&id("P42")),
            Err(SimulationError::UnknownAgent(id("P42")))
        );
    }

    #[test]
    fn self_move_leaves_happiness_unchanged() {
        let mut b = GridState::standard(Some(4)).unwrap();
        let scenario = ScenarioController::default();
        let before = HappinessEvaluator::new(&b, &scenario).unhappy_agents();
        let p = b.position_of(&id("P06")).unwrap();
        b.move_to(&id("P06"), p).unwrap();
        assert_eq!(HappinessEvaluator::new(&b, &scenario).unhappy_agents(), before);
    }
}
