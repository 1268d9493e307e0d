//! The single owner of all mutable simulation state.
//!
//! [`Session`] keeps the board, the scenario, and the viewer hub behind one
//! [`tokio::sync::Mutex`]. Every operation takes the lock, applies its
//! change, builds a snapshot of the committed state, and queues it to the
//! viewers before releasing the lock. Two mutations therefore never
//! interleave, a snapshot never observes a half-applied move, and viewers
//! receive snapshots in exactly the order the mutations committed.
//!
//! Queueing is non-blocking (see [`crate::hub`]), so holding the lock across
//! it never waits on the network.

use std::sync::Arc;

use schelling_types::{Agent, AgentId, AgentInfo, BoardSnapshot, ConnectionId, HappinessReport};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::SchellingConfig;
use crate::error::SimulationError;
use crate::grid::{GridState, MoveOutcome};
use crate::happiness::HappinessEvaluator;
use crate::hub::{BroadcastHub, Subscription};
use crate::scenario::ScenarioController;

/// Point-in-time counters for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    /// Registered viewers.
    pub viewers: usize,
    /// Commit counter of the current state.
    pub version: u64,
    /// Current middle-cell threshold.
    pub middle_threshold: u8,
    /// Agents on the roster.
    pub agents: usize,
    /// Agents currently missing their threshold.
    pub unhappy: usize,
    /// Cells with no agent.
    pub empty_cells: usize,
}

/// Everything guarded by the session lock.
#[derive(Debug)]
struct SessionState {
    grid: GridState,
    scenario: ScenarioController,
    hub: BroadcastHub,
    version: u64,
}

impl SessionState {
    fn evaluator(&self) -> HappinessEvaluator<'_> {
        HappinessEvaluator::new(&self.grid, &self.scenario)
    }

    /// Record that a mutation committed.
    fn commit(&mut self) {
        self.version = self.version.saturating_add(1);
    }

    /// Snapshot of the state as it is right now.
    fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            version: self.version,
            middle_threshold: self.scenario.threshold(),
            grid: self.grid.rows(),
            agents: self
                .grid
                .agents()
                .map(|agent| (agent.id, AgentInfo { tribe: agent.tribe }))
                .collect(),
            unhappy: self.evaluator().unhappy_agents(),
        }
    }

    /// Queue the current snapshot to every viewer.
    fn publish(&mut self) -> usize {
        if self.hub.is_empty() {
            return 0;
        }
        let snapshot = Arc::new(self.snapshot());
        self.hub.broadcast(&snapshot)
    }
}

/// Shared handle to the simulation. Wrap in [`Arc`] to share across tasks.
#[derive(Debug)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    /// Create a session from an existing board and scenario.
    pub fn new(grid: GridState, scenario: ScenarioController, viewer_queue_capacity: usize) -> Self {
        Self {
            state: Mutex::new(SessionState {
                grid,
                scenario,
                hub: BroadcastHub::new(viewer_queue_capacity),
                version: 0,
            }),
        }
    }

    /// Create a session with the standard roster from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidThreshold`] if the configured middle
    /// threshold is out of range.
    pub fn from_config(config: &SchellingConfig) -> Result<Self, SimulationError> {
        let grid = GridState::standard(config.simulation.seed)?;
        let scenario = ScenarioController::new(config.simulation.middle_threshold)?;
        info!(
            agents = grid.agent_count(),
            middle_threshold = scenario.threshold(),
            seeded = config.simulation.seed.is_some(),
            "session created"
        );
        Ok(Self::new(
            grid,
            scenario,
            config.broadcast.viewer_queue_capacity,
        ))
    }

    // -------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------

    /// Move an agent to `(x, y)` and push the result to every viewer.
    ///
    /// A move onto the agent's own cell succeeds without changing the
    /// version; viewers still get a push.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::UnknownAgent`],
    /// [`SimulationError::OutOfBounds`], or
    /// [`SimulationError::CellOccupied`]. Nothing changes and nothing is
    /// pushed on error.
    pub async fn move_agent(
        &self,
        agent: &AgentId,
        x: i64,
        y: i64,
    ) -> Result<MoveOutcome, SimulationError> {
        let mut state = self.state.lock().await;
        let outcome = state.grid.move_agent(agent, x, y)?;
        if matches!(outcome, MoveOutcome::Moved { .. }) {
            state.commit();
        }
        let delivered = state.publish();
        info!(agent = %agent, x, y, version = state.version, delivered, "move applied");
        Ok(outcome)
    }

    /// Reshuffle the board and push the result to every viewer.
    pub async fn reset(&self) -> u64 {
        let mut state = self.state.lock().await;
        state.grid.reset();
        state.commit();
        let delivered = state.publish();
        info!(version = state.version, delivered, "board reset");
        state.version
    }

    /// Change the middle-cell threshold and push the result to every viewer.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidThreshold`] for values outside
    /// `0..=8`; nothing changes and nothing is pushed.
    pub async fn set_scenario(&self, threshold: i64) -> Result<u8, SimulationError> {
        let mut state = self.state.lock().await;
        let applied = state.scenario.set_threshold(threshold)?;
        state.commit();
        let delivered = state.publish();
        info!(threshold = applied, version = state.version, delivered, "scenario changed");
        Ok(applied)
    }

    // -------------------------------------------------------------------
    // Viewers
    // -------------------------------------------------------------------

    /// Register a viewer. The current snapshot is already queued on the
    /// returned subscription.
    pub async fn connect(&self) -> Subscription {
        let mut state = self.state.lock().await;
        let snapshot = Arc::new(state.snapshot());
        let subscription = state.hub.register(snapshot);
        info!(connection = %subscription.id, viewers = state.hub.len(), "viewer connected");
        subscription
    }

    /// Remove a viewer. Safe to call more than once.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.hub.unregister(id);
        if removed {
            info!(connection = %id, viewers = state.hub.len(), "viewer disconnected");
        }
        removed
    }

    /// Push the current snapshot to every viewer without changing anything.
    pub async fn heartbeat(&self) -> usize {
        let mut state = self.state.lock().await;
        let delivered = state.publish();
        debug!(version = state.version, delivered, "heartbeat pushed");
        delivered
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Snapshot of the committed state.
    pub async fn snapshot(&self) -> BoardSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Agents currently missing their threshold, in roster order.
    pub async fn unhappy_agents(&self) -> Vec<AgentId> {
        self.state.lock().await.evaluator().unhappy_agents()
    }

    /// Happiness breakdown for one agent.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::UnknownAgent`] if the agent is not on the
    /// roster.
    pub async fn report(&self, agent: &AgentId) -> Result<HappinessReport, SimulationError> {
        self.state.lock().await.evaluator().report(agent)
    }

    /// The roster in id order, for rendering agent pickers.
    pub async fn roster(&self) -> Vec<Agent> {
        self.state.lock().await.grid.agents().collect()
    }

    /// Current counters.
    pub async fn status(&self) -> SessionStatus {
        let state = self.state.lock().await;
        SessionStatus {
            viewers: state.hub.len(),
            version: state.version,
            middle_threshold: state.scenario.threshold(),
            agents: state.grid.agent_count(),
            unhappy: state.evaluator().unhappy_agents().len(),
            empty_cells: state.grid.empty_cells().len(),
        }
    }

    /// Whether the board and position map agree. Used by tests.
    pub async fn is_consistent(&self) -> bool {
        self.state.lock().await.grid.is_consistent()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::cast_possible_wrap)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use schelling_types::{Position, Tribe};

    use super::*;
    use crate::grid::standard_roster;

    fn id(token: &str) -> AgentId {
        AgentId::from(token)
    }

    fn seeded_session(seed: u64) -> Session {
        Session::new(
            GridState::standard(Some(seed)).unwrap(),
            ScenarioController::default(),
            16,
        )
    }

    #[tokio::test]
    async fn new_viewer_gets_consistent_snapshot_immediately() {
        let session = seeded_session(1);
        session.reset().await;

        let mut sub = session.connect().await;
        let first = sub.receiver.try_recv().unwrap();

        assert_eq!(first.unhappy, session.unhappy_agents().await);
        assert_eq!(*first, session.snapshot().await);
        assert_eq!(first.version, 1);
        assert_eq!(first.agents.len(), 17);
    }

    #[tokio::test]
    async fn next_broadcast_after_scenario_change_reflects_it() {
        // Everyone on a middle cell happy at 3 but not at 4.
        let roster = vec![
            Agent::new(id("P01"), Tribe::Blue),
            Agent::new(id("P03"), Tribe::Blue),
            Agent::new(id("P05"), Tribe::Blue),
            Agent::new(id("P07"), Tribe::Blue),
        ];
        let placement: BTreeMap<AgentId, Position> = [
            ("P01", 2, 2),
            ("P03", 1, 1),
            ("P05", 1, 2),
            ("P07", 1, 3),
        ]
        .into_iter()
        .map(|(t, x, y)| (id(t), Position::new(x, y).unwrap()))
        .collect();
        let session = Session::new(
            GridState::with_placement(roster, &placement).unwrap(),
            ScenarioController::default(),
            16,
        );

        let mut sub = session.connect().await;
        let initial = sub.receiver.recv().await.unwrap();
        assert!(!initial.is_unhappy(&id("P01")));

        assert_eq!(session.set_scenario(4).await, Ok(4));
        let next = sub.receiver.recv().await.unwrap();
        assert_eq!(next.middle_threshold, 4);
        assert!(next.is_unhappy(&id("P01")));
        assert!(next.version > initial.version);
    }

    #[tokio::test]
    async fn rejected_operations_change_nothing_and_push_nothing() {
        let session = seeded_session(2);
        let mut sub = session.connect().await;
        let initial = sub.receiver.recv().await.unwrap();

        let p02_at = initial
            .grid
            .iter()
            .enumerate()
            .find_map(|(x, row)| {
                row.iter()
                    .position(|cell| cell.as_ref() == Some(&id("P02")))
                    .map(|y| (x as i64, y as i64))
            })
            .unwrap();

        assert!(matches!(
            session.move_agent(&id("P01"), p02_at.0, p02_at.1).await,
            Err(SimulationError::CellOccupied { .. })
        ));
        assert!(matches!(
            session.move_agent(&id("P01"), 9, 9).await,
            Err(SimulationError::OutOfBounds { x: 9, y: 9 })
        ));
        assert!(matches!(
            session.move_agent(&id("nobody"), 0, 0).await,
            Err(SimulationError::UnknownAgent(_))
        ));
        assert!(matches!(
            session.set_scenario(-3).await,
            Err(SimulationError::InvalidThreshold { value: -3, .. })
        ));

        assert!(sub.receiver.try_recv().is_err());
        assert_eq!(session.snapshot().await, *initial);
    }

    #[tokio::test]
    async fn self_move_pushes_without_new_version() {
        let session = seeded_session(3);
        let mut sub = session.connect().await;
        let initial = sub.receiver.recv().await.unwrap();
        let report = session.report(&id("P04")).await.unwrap();

        let outcome = session
            .move_agent(&id("P04"), report.position.x() as i64, report.position.y() as i64)
            .await;
        assert_eq!(outcome, Ok(MoveOutcome::Unchanged));

        let pushed = sub.receiver.recv().await.unwrap();
        assert_eq!(*pushed, *initial);
    }

    #[tokio::test]
    async fn threshold_survives_reset() {
        let session = seeded_session(4);
        session.set_scenario(6).await.unwrap();
        session.reset().await;
        assert_eq!(session.status().await.middle_threshold, 6);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let session = seeded_session(5);
        let sub = session.connect().await;
        assert_eq!(session.status().await.viewers, 1);
        assert!(session.disconnect(sub.id).await);
        assert!(!session.disconnect(sub.id).await);
        assert_eq!(session.status().await.viewers, 0);
        assert_eq!(session.heartbeat().await, 0);
    }

    #[tokio::test]
    async fn dead_viewer_is_pruned_on_next_push() {
        let session = seeded_session(6);
        let dead = session.connect().await;
        let mut alive = session.connect().await;
        drop(dead);

        assert_eq!(session.heartbeat().await, 1);
        assert_eq!(session.status().await.viewers, 1);
        let _ = alive.receiver.recv().await;
        assert!(alive.receiver.recv().await.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mutations_keep_board_consistent_and_ordered() {
        let session = Arc::new(Session::new(
            GridState::standard(Some(99)).unwrap(),
            ScenarioController::default(),
            4096,
        ));
        let mut sub = session.connect().await;

        let ids: Vec<AgentId> = standard_roster().into_iter().map(|a| a.id).collect();
        let mut tasks = Vec::new();
        for worker in 0..8_i64 {
            let session = Arc::clone(&session);
            let ids = ids.clone();
            tasks.push(tokio::spawn(async move {
                for step in 0..50_i64 {
                    let agent = &ids[usize::try_from(worker * 50 + step).unwrap() % ids.len()];
                    match step % 10 {
                        0 => {
                            session.reset().await;
                        }
                        1 => {
                            let _ = session.set_scenario(step % 9).await;
                        }
                        2 => {
                            session.heartbeat().await;
                        }
                        _ => {
                            let _ = session.move_agent(agent, (step + worker) % 5, step % 5).await;
                        }
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(session.is_consistent().await);

        let mut last_version = 0;
        let mut received = 0;
        while let Ok(Some(snapshot)) =
            tokio::time::timeout(Duration::from_millis(50), sub.receiver.recv()).await
        {
            assert!(snapshot.version >= last_version, "snapshot out of order");
            last_version = snapshot.version;
            received += 1;

            let mut seen = std::collections::BTreeSet::new();
            for agent in snapshot.grid.iter().flatten().flatten() {
                assert!(seen.insert(agent.clone()), "{agent} appears twice");
            }
            assert_eq!(seen.len(), 17);
        }
        assert!(received > 1);
        assert_eq!(last_version, session.status().await.version);
    }
}
