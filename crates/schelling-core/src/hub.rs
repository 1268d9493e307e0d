//! Fan-out of board snapshots to live viewers.
//!
//! Each registered viewer owns a bounded [`mpsc`] queue. The hub only ever
//! enqueues with `try_send`, so a broadcast never waits on a viewer; the
//! transport layer drains each queue on its own task and does the actual
//! network send.
//!
//! A viewer whose queue is full (stalled) or closed (gone) is dropped from
//! the set on the spot. Delivery to the remaining viewers is unaffected and
//! the failure is never reported to whoever triggered the broadcast.
//!
//! Callers hold the session lock while calling [`BroadcastHub::broadcast`],
//! and each queue is FIFO, so every viewer sees snapshots in commit order.

use std::collections::BTreeMap;
use std::sync::Arc;

use schelling_types::{BoardSnapshot, ConnectionId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Queue depth used when none is configured.
pub const DEFAULT_VIEWER_QUEUE_CAPACITY: usize = 64;

/// Receiving half handed to a newly registered viewer.
#[derive(Debug)]
pub struct Subscription {
    /// Identifier to pass to [`BroadcastHub::unregister`].
    pub id: ConnectionId,
    /// Snapshots for this viewer, oldest first. Yields `None` once the hub
    /// has dropped the viewer.
    pub receiver: mpsc::Receiver<Arc<BoardSnapshot>>,
}

/// The set of live viewer queues.
#[derive(Debug)]
pub struct BroadcastHub {
    connections: BTreeMap<ConnectionId, mpsc::Sender<Arc<BoardSnapshot>>>,
    queue_capacity: usize,
}

impl BroadcastHub {
    /// Create an empty hub whose viewer queues hold up to `queue_capacity`
    /// undelivered snapshots (at least one).
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            connections: BTreeMap::new(),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Add a viewer and queue `initial` as its first snapshot.
    pub fn register(&mut self, initial: Arc<BoardSnapshot>) -> Subscription {
        let (tx, receiver) = mpsc::channel(self.queue_capacity);
        let id = ConnectionId::new();

        // A fresh queue with a live receiver has room for one message.
        if let Err(e) = tx.try_send(initial) {
            warn!(connection = %id, error = %e, "failed to queue initial snapshot");
        }

        self.connections.insert(id, tx);
        debug!(connection = %id, viewers = self.connections.len(), "viewer registered");

        Subscription { id, receiver }
    }

    /// Remove a viewer. Returns `false` if it was already gone.
    pub fn unregister(&mut self, id: ConnectionId) -> bool {
        let removed = self.connections.remove(&id).is_some();
        if removed {
            debug!(connection = %id, viewers = self.connections.len(), "viewer unregistered");
        }
        removed
    }

    /// Queue `snapshot` for every viewer.
    ///
    /// Returns the number of viewers it was queued for. Viewers that could
    /// not take it are unregistered.
    pub fn broadcast(&mut self, snapshot: &Arc<BoardSnapshot>) -> usize {
        let mut delivered: usize = 0;
        self.connections.retain(|id, tx| match tx.try_send(Arc::clone(snapshot)) {
            Ok(()) => {
                delivered = delivered.saturating_add(1);
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(connection = %id, version = snapshot.version, "viewer stalled, dropping");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection = %id, "viewer gone, dropping");
                false
            }
        });
        delivered
    }

    /// Number of registered viewers.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no viewer is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Whether `id` is currently registered.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWER_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn snapshot(version: u64) -> Arc<BoardSnapshot> {
        Arc::new(BoardSnapshot {
            version,
            middle_threshold: 3,
            grid: Vec::new(),
            agents: BTreeMap::new(),
            unhappy: Vec::new(),
        })
    }

    #[test]
    fn register_queues_initial_snapshot() {
        let mut hub = BroadcastHub::default();
        let mut sub = hub.register(snapshot(7));
        assert_eq!(sub.receiver.try_recv().unwrap().version, 7);
        assert!(hub.contains(sub.id));
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn broadcast_reaches_every_viewer_in_order() {
        let mut hub = BroadcastHub::default();
        let mut a = hub.register(snapshot(0));
        let mut b = hub.register(snapshot(0));

        assert_eq!(hub.broadcast(&snapshot(1)), 2);
        assert_eq!(hub.broadcast(&snapshot(2)), 2);

        for sub in [&mut a, &mut b] {
            let versions: Vec<u64> = std::iter::from_fn(|| sub.receiver.try_recv().ok())
                .map(|s| s.version)
                .collect();
            assert_eq!(versions, [0, 1, 2]);
        }
    }

    #[test]
    fn closed_viewer_is_dropped_without_affecting_others() {
        let mut hub = BroadcastHub::default();
        let gone = hub.register(snapshot(0));
        let mut alive = hub.register(snapshot(0));
        let gone_id = gone.id;
        drop(gone);

        assert_eq!(hub.broadcast(&snapshot(1)), 1);
        assert!(!hub.contains(gone_id));
        assert_eq!(hub.len(), 1);

        let _ = alive.receiver.try_recv();
        assert_eq!(alive.receiver.try_recv().unwrap().version, 1);
    }

    #[test]
    fn stalled_viewer_is_dropped() {
        let mut hub = BroadcastHub::new(2);
        let stalled = hub.register(snapshot(0));
        let mut reader = hub.register(snapshot(0));

        assert_eq!(hub.broadcast(&snapshot(1)), 2);
        let _ = reader.receiver.try_recv();
        let _ = reader.receiver.try_recv();

        // `stalled` never reads: its queue (0, 1) is full now.
        assert_eq!(hub.broadcast(&snapshot(2)), 1);
        assert!(!hub.contains(stalled.id));
        assert!(hub.contains(reader.id));
    }

    #[test]
    fn dropped_viewer_sees_end_of_stream_after_backlog() {
        let mut hub = BroadcastHub::new(1);
        let mut sub = hub.register(snapshot(0));
        hub.broadcast(&snapshot(1));
        assert!(hub.is_empty());
        assert_eq!(sub.receiver.try_recv().unwrap().version, 0);
        assert!(sub.receiver.try_recv().is_err());
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut hub = BroadcastHub::default();
        let sub = hub.register(snapshot(0));
        assert!(hub.unregister(sub.id));
        assert!(!hub.unregister(sub.id));
        assert!(hub.is_empty());
        assert_eq!(hub.broadcast(&snapshot(1)), 0);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut hub = BroadcastHub::new(0);
        let mut sub = hub.register(snapshot(5));
        assert_eq!(sub.receiver.try_recv().unwrap().version, 5);
    }
}
