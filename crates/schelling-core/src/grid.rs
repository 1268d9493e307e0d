//! Board geometry and the agent/cell bijection.
//!
//! [`GridState`] owns the roster, the cell array, and the agent-to-position
//! map. The cell array and the position map are two views of one bijection
//! between a subset of cells and the roster; every mutation updates both
//! before returning, and rejected mutations touch neither.
//!
//! Cells are stored row-major in a flat vector indexed by
//! [`Position::index`].

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use schelling_types::{Agent, AgentId, CELL_COUNT, CellClass, GRID_SIZE, Position, Tribe};
use tracing::debug;

use crate::error::SimulationError;

/// Number of agents on the standard roster.
pub const STANDARD_ROSTER_SIZE: usize = 17;

/// Offsets of the eight cells at Chebyshev distance 1.
const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// The in-bounds cells adjacent to `pos`, including diagonals.
///
/// Order is fixed (row by row, left to right) and depends only on the
/// board dimensions.
pub fn neighbors(pos: Position) -> Vec<Position> {
    let (Ok(x), Ok(y)) = (i64::try_from(pos.x()), i64::try_from(pos.y())) else {
        return Vec::new();
    };
    NEIGHBOR_OFFSETS
        .iter()
        .filter_map(|&(dx, dy)| Position::from_signed(x.checked_add(dx)?, y.checked_add(dy)?))
        .collect()
}

/// Classify a cell by the number of board edges it touches.
pub const fn cell_class(pos: Position) -> CellClass {
    let last = GRID_SIZE.saturating_sub(1);
    let on_x_edge = pos.x() == 0 || pos.x() == last;
    let on_y_edge = pos.y() == 0 || pos.y() == last;
    match (on_x_edge, on_y_edge) {
        (true, true) => CellClass::Corner,
        (true, false) | (false, true) => CellClass::Side,
        (false, false) => CellClass::Middle,
    }
}

/// The roster the board starts with: `P01`..`P17`, odd numbers blue and
/// even numbers grey.
pub fn standard_roster() -> Vec<Agent> {
    (1..=STANDARD_ROSTER_SIZE)
        .map(|n| {
            let tribe = if n % 2 == 1 { Tribe::Blue } else { Tribe::Grey };
            Agent::new(AgentId::numbered(n), tribe)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// GridState
// ---------------------------------------------------------------------------

/// Result of a successful move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The agent left `from` and now sits on `to`.
    Moved {
        /// Previous cell, now empty.
        from: Position,
        /// New cell.
        to: Position,
    },
    /// The target was the agent's own cell; nothing changed.
    Unchanged,
}

/// The board: roster, cells, and positions kept in lock-step.
#[derive(Debug, Clone)]
pub struct GridState {
    /// Tribe of every agent, keyed and iterated in roster order.
    roster: BTreeMap<AgentId, Tribe>,
    /// Occupant of each cell, row-major, length [`CELL_COUNT`].
    cells: Vec<Option<AgentId>>,
    /// Current cell of each agent.
    positions: BTreeMap<AgentId, Position>,
    /// Source of placement shuffles.
    rng: StdRng,
}

impl GridState {
    /// Create a board with the given roster placed at random.
    ///
    /// With `seed` set, the initial placement and every later reset are
    /// reproducible.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::RosterTooLarge`] if the roster has more
    /// agents than the board has cells, or
    /// [`SimulationError::InvalidPlacement`] if two agents share an id.
    pub fn new(roster: Vec<Agent>, seed: Option<u64>) -> Result<Self, SimulationError> {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let mut grid = Self {
            roster: build_roster(roster)?,
            cells: vec![None; CELL_COUNT],
            positions: BTreeMap::new(),
            rng,
        };
        grid.reset();
        Ok(grid)
    }

    /// Create a board from the standard roster.
    ///
    /// # Errors
    ///
    /// Never fails for the standard roster; the signature matches
    /// [`GridState::new`].
    pub fn standard(seed: Option<u64>) -> Result<Self, SimulationError> {
        Self::new(standard_roster(), seed)
    }

    /// Create a board with every agent at an explicit cell.
    ///
    /// Later resets shuffle with an OS-seeded generator.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidPlacement`] if the placement names
    /// an agent not on the roster, leaves a roster agent unplaced, or puts
    /// two agents on one cell.
    pub fn with_placement(
        roster: Vec<Agent>,
        placement: &BTreeMap<AgentId, Position>,
    ) -> Result<Self, SimulationError> {
        let roster = build_roster(roster)?;
        let mut grid = Self {
            roster,
            cells: vec![None; CELL_COUNT],
            positions: BTreeMap::new(),
            rng: StdRng::from_os_rng(),
        };

        for (agent, &pos) in placement {
            if !grid.roster.contains_key(agent) {
                return Err(SimulationError::InvalidPlacement(format!(
                    "{agent} is not on the roster"
                )));
            }
            if let Some(occupant) = grid.agent_at(pos) {
                return Err(SimulationError::InvalidPlacement(format!(
                    "{agent} and {occupant} both placed at {pos}"
                )));
            }
            grid.place(agent.clone(), pos);
        }

        if let Some(missing) = grid.roster.keys().find(|id| !grid.positions.contains_key(*id)) {
            return Err(SimulationError::InvalidPlacement(format!(
                "{missing} has no position"
            )));
        }

        debug_assert!(grid.is_consistent());
        Ok(grid)
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Iterate over the roster in id order.
    pub fn agents(&self) -> impl Iterator<Item = Agent> + '_ {
        self.roster
            .iter()
            .map(|(id, &tribe)| Agent::new(id.clone(), tribe))
    }

    /// Roster ids in iteration order.
    pub fn agent_ids(&self) -> impl Iterator<Item = &AgentId> {
        self.roster.keys()
    }

    /// Number of agents on the roster.
    pub fn agent_count(&self) -> usize {
        self.roster.len()
    }

    /// Tribe of an agent, if it is on the roster.
    pub fn tribe_of(&self, agent: &AgentId) -> Option<Tribe> {
        self.roster.get(agent).copied()
    }

    /// Current cell of an agent, if it is on the roster.
    pub fn position_of(&self, agent: &AgentId) -> Option<Position> {
        self.positions.get(agent).copied()
    }

    /// Occupant of a cell.
    pub fn agent_at(&self, pos: Position) -> Option<&AgentId> {
        self.cells.get(pos.index()).and_then(Option::as_ref)
    }

    /// All cells with no occupant, row-major.
    pub fn empty_cells(&self) -> Vec<Position> {
        Position::all()
            .filter(|&pos| self.agent_at(pos).is_none())
            .collect()
    }

    /// The board as `rows[x][y]`.
    pub fn rows(&self) -> Vec<Vec<Option<AgentId>>> {
        self.cells.chunks(GRID_SIZE).map(<[_]>::to_vec).collect()
    }

    /// Whether the cell array and the position map describe the same
    /// bijection over the whole roster.
    pub fn is_consistent(&self) -> bool {
        if self.positions.len() != self.roster.len() {
            return false;
        }
        let every_agent_matches = self.roster.keys().all(|id| {
            self.positions
                .get(id)
                .is_some_and(|&pos| self.agent_at(pos) == Some(id))
        });
        let occupied = self.cells.iter().filter(|cell| cell.is_some()).count();
        every_agent_matches && occupied == self.positions.len()
    }

    // -------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------

    /// Move an agent to the cell at raw client coordinates.
    ///
    /// Checks run in order: the agent must exist, the coordinates must be
    /// on the board, and the target must be empty or already the agent's
    /// own cell.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::UnknownAgent`],
    /// [`SimulationError::OutOfBounds`], or
    /// [`SimulationError::CellOccupied`]; the board is unchanged on error.
    pub fn move_agent(
        &mut self,
        agent: &AgentId,
        x: i64,
        y: i64,
    ) -> Result<MoveOutcome, SimulationError> {
        if !self.roster.contains_key(agent) {
            return Err(SimulationError::UnknownAgent(agent.clone()));
        }
        let target = Position::from_signed(x, y).ok_or(SimulationError::OutOfBounds { x, y })?;
        self.move_to(agent, target)
    }

    /// Move an agent to an in-bounds cell.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::UnknownAgent`] or
    /// [`SimulationError::CellOccupied`]; the board is unchanged on error.
    pub fn move_to(&mut self, agent: &AgentId, target: Position) -> Result<MoveOutcome, SimulationError> {
        let from = self
            .position_of(agent)
            .ok_or_else(|| SimulationError::UnknownAgent(agent.clone()))?;

        if from == target {
            return Ok(MoveOutcome::Unchanged);
        }
        if let Some(occupant) = self.agent_at(target) {
            return Err(SimulationError::CellOccupied {
                position: target,
                occupant: occupant.clone(),
            });
        }

        self.set_cell(from, None);
        self.place(agent.clone(), target);
        debug_assert!(self.is_consistent());

        debug!(agent = %agent, %from, to = %target, "agent moved");
        Ok(MoveOutcome::Moved { from, to: target })
    }

    /// Scatter the roster over a fresh random permutation of all cells.
    ///
    /// Same agents, same tribes; every agent gets a distinct cell.
    pub fn reset(&mut self) {
        let mut cells: Vec<Position> = Position::all().collect();
        cells.shuffle(&mut self.rng);

        self.cells = vec![None; CELL_COUNT];
        self.positions.clear();

        let ids: Vec<AgentId> = self.roster.keys().cloned().collect();
        for (id, pos) in ids.into_iter().zip(cells) {
            self.place(id, pos);
        }
        debug_assert!(self.is_consistent());

        debug!(agents = self.positions.len(), "board reshuffled");
    }

    fn place(&mut self, agent: AgentId, pos: Position) {
        self.set_cell(pos, Some(agent.clone()));
        self.positions.insert(agent, pos);
    }

    fn set_cell(&mut self, pos: Position, occupant: Option<AgentId>) {
        if let Some(cell) = self.cells.get_mut(pos.index()) {
            *cell = occupant;
        }
    }
}

/// Index a roster by id, rejecting duplicates and oversized rosters.
fn build_roster(roster: Vec<Agent>) -> Result<BTreeMap<AgentId, Tribe>, SimulationError> {
    if roster.len() > CELL_COUNT {
        return Err(SimulationError::RosterTooLarge {
            agents: roster.len(),
            cells: CELL_COUNT,
        });
    }
    let mut indexed = BTreeMap::new();
    for agent in roster {
        let id = agent.id.clone();
        if indexed.insert(agent.id, agent.tribe).is_some() {
            return Err(SimulationError::InvalidPlacement(format!(
                "duplicate agent id {id}"
            )));
        }
    }
    Ok(indexed)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn pos(x: usize, y: usize) -> Position {
        Position::new(x, y).unwrap()
    }

    fn id(token: &str) -> AgentId {
        AgentId::from(token)
    }

    #[test]
    fn neighbor_counts_match_cell_class() {
        for p in Position::all() {
            let count = neighbors(p).len();
            assert_eq!(count, usize::from(cell_class(p).max_neighbors()), "at {p}");
        }
    }

    #[test]
    fn neighbors_are_adjacent_and_exclude_self() {
        let center = pos(2, 2);
        let around = neighbors(center);
        assert!(!around.contains(&center));
        for n in around {
            assert!(n.x().abs_diff(2) <= 1 && n.y().abs_diff(2) <= 1);
        }
    }

    #[test]
    fn cell_classes_partition_the_board() {
        let mut corners = 0;
        let mut sides = 0;
        let mut middles = 0;
        for p in Position::all() {
            match cell_class(p) {
                CellClass::Corner => corners += 1,
                CellClass::Side => sides += 1,
                CellClass::Middle => middles += 1,
            }
        }
        assert_eq!((corners, sides, middles), (4, 12, 9));
        assert_eq!(cell_class(pos(0, 4)), CellClass::Corner);
        assert_eq!(cell_class(pos(0, 2)), CellClass::Side);
        assert_eq!(cell_class(pos(3, 4)), CellClass::Side);
        assert_eq!(cell_class(pos(1, 3)), CellClass::Middle);
    }

    #[test]
    fn standard_roster_alternates_tribes() {
        let roster = standard_roster();
        assert_eq!(roster.len(), STANDARD_ROSTER_SIZE);
        assert_eq!(roster.first().map(|a| a.tribe), Some(Tribe::Blue));
        assert_eq!(roster.get(1).map(|a| a.tribe), Some(Tribe::Grey));
        let blues = roster.iter().filter(|a| a.tribe == Tribe::Blue).count();
        assert_eq!(blues, 9);
    }

    #[test]
    fn reset_always_yields_a_bijection_over_the_roster() {
        let mut grid = GridState::standard(Some(7)).unwrap();
        let roster: BTreeSet<AgentId> = grid.agent_ids().cloned().collect();
        for _ in 0..200 {
            grid.reset();
            assert!(grid.is_consistent());
            let placed: BTreeSet<Position> =
                roster.iter().filter_map(|a| grid.position_of(a)).collect();
            assert_eq!(placed.len(), roster.len());
            assert_eq!(grid.empty_cells().len(), CELL_COUNT - roster.len());
        }
    }

    #[test]
    fn reset_keeps_tribes() {
        let mut grid = GridState::standard(Some(1)).unwrap();
        let before: Vec<Agent> = grid.agents().collect();
        grid.reset();
        let after: Vec<Agent> = grid.agents().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn seeded_boards_are_reproducible() {
        let a = GridState::standard(Some(99)).unwrap();
        let b = GridState::standard(Some(99)).unwrap();
        assert_eq!(a.rows(), b.rows());
    }

    #[test]
    fn move_to_empty_cell_updates_both_views() {
        let mut grid = GridState::standard(Some(3)).unwrap();
        let agent = id("P05");
        let from = grid.position_of(&agent).unwrap();
        let target = grid.empty_cells()[0];

        let outcome = grid.move_agent(&agent, target.x() as i64, target.y() as i64);
        assert_eq!(outcome, Ok(MoveOutcome::Moved { from, to: target }));
        assert_eq!(grid.position_of(&agent), Some(target));
        assert_eq!(grid.agent_at(target), Some(&agent));
        assert_eq!(grid.agent_at(from), None);
        assert!(grid.is_consistent());
    }

    #[test]
    fn move_onto_occupied_cell_is_rejected_without_change() {
        let mut grid = GridState::standard(Some(11)).unwrap();
        let p01 = id("P01");
        let p02 = id("P02");
        let p01_at = grid.position_of(&p01).unwrap();
        let p02_at = grid.position_of(&p02).unwrap();
        let rows_before = grid.rows();

        let result = grid.move_agent(&p01, p02_at.x() as i64, p02_at.y() as i64);
        assert_eq!(
            result,
            Err(SimulationError::CellOccupied {
                position: p02_at,
                occupant: p02.clone(),
            })
        );
        assert_eq!(grid.position_of(&p01), Some(p01_at));
        assert_eq!(grid.position_of(&p02), Some(p02_at));
        assert_eq!(grid.rows(), rows_before);
    }

    #[test]
    fn move_to_own_cell_is_a_no_op() {
        let mut grid = GridState::standard(Some(5)).unwrap();
        let agent = id("P09");
        let at = grid.position_of(&agent).unwrap();
        let rows_before = grid.rows();

        let outcome = grid.move_agent(&agent, at.x() as i64, at.y() as i64);
        assert_eq!(outcome, Ok(MoveOutcome::Unchanged));
        assert_eq!(grid.rows(), rows_before);
        assert!(grid.is_consistent());
    }

    #[test]
    fn move_rejects_unknown_agent_before_bounds() {
        let mut grid = GridState::standard(Some(5)).unwrap();
        let result = grid.move_agent(&id("P99"), -1, 40);
        assert_eq!(result, Err(SimulationError::UnknownAgent(id("P99"))));
    }

    #[test]
    fn move_rejects_out_of_bounds() {
        let mut grid = GridState::standard(Some(5)).unwrap();
        let rows_before = grid.rows();
        for (x, y) in [(-1, 0), (0, 5), (5, 5), (i64::MIN, 0)] {
            let result = grid.move_agent(&id("P01"), x, y);
            assert_eq!(result, Err(SimulationError::OutOfBounds { x, y }));
        }
        assert_eq!(grid.rows(), rows_before);
    }

    #[test]
    fn random_move_sequences_preserve_the_bijection() {
        let mut grid = GridState::standard(Some(2024)).unwrap();
        let ids: Vec<AgentId> = grid.agent_ids().cloned().collect();
        for step in 0..500_i64 {
            let agent = &ids[(step as usize) % ids.len()];
            let _ = grid.move_agent(agent, (step * 7) % 6 - 1, (step * 3) % 6);
            assert!(grid.is_consistent());
            if step % 97 == 0 {
                grid.reset();
            }
        }
    }

    #[test]
    fn oversized_roster_is_rejected() {
        let roster: Vec<Agent> = (1..=CELL_COUNT + 1)
            .map(|n| Agent::new(AgentId::numbered(n), Tribe::Blue))
            .collect();
        let result = GridState::new(roster, Some(0));
        assert!(matches!(
            result,
            Err(SimulationError::RosterTooLarge { agents: 26, cells: 25 })
        ));
    }

    #[test]
    fn full_board_is_allowed() {
        let roster: Vec<Agent> = (1..=CELL_COUNT)
            .map(|n| Agent::new(AgentId::numbered(n), Tribe::Grey))
            .collect();
        let grid = GridState::new(roster, Some(0)).unwrap();
        assert!(grid.empty_cells().is_empty());
        assert!(grid.is_consistent());
    }

    #[test]
    fn duplicate_roster_ids_are_rejected() {
        let roster = vec![
            Agent::new(id("P01"), Tribe::Blue),
            Agent::new(id("P01"), Tribe::Grey),
        ];
        assert!(matches!(
            GridState::new(roster, None),
            Err(SimulationError::InvalidPlacement(_))
        ));
    }

    #[test]
    fn explicit_placement_is_validated() {
        let roster = vec![
            Agent::new(id("P01"), Tribe::Blue),
            Agent::new(id("P02"), Tribe::Grey),
        ];

        let mut shared = BTreeMap::new();
        shared.insert(id("P01"), pos(0, 0));
        shared.insert(id("P02"), pos(0, 0));
        assert!(GridState::with_placement(roster.clone(), &shared).is_err());

        let mut partial = BTreeMap::new();
        partial.insert(id("P01"), pos(0, 0));
        assert!(GridState::with_placement(roster.clone(), &partial).is_err());

        let mut stranger = partial.clone();
        stranger.insert(id("P02"), pos(1, 1));
        stranger.insert(id("P03"), pos(2, 2));
        assert!(GridState::with_placement(roster.clone(), &stranger).is_err());

        let mut valid = partial;
        valid.insert(id("P02"), pos(1, 1));
        let grid = GridState::with_placement(roster, &valid).unwrap();
        assert_eq!(grid.agent_at(pos(1, 1)), Some(&id("P02")));
        assert!(grid.is_consistent());
    }

    #[test]
    fn rows_mirror_cells() {
        let grid = GridState::standard(Some(8)).unwrap();
        let rows = grid.rows();
        assert_eq!(rows.len(), GRID_SIZE);
        for p in Position::all() {
            assert_eq!(rows[p.x()][p.y()].as_ref(), grid.agent_at(p));
        }
    }
}
