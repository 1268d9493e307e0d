//! Periodic re-broadcast of the current board.
//!
//! Viewers that missed a push (for example because they reconnected while
//! a move was being broadcast) converge within one period. The task goes
//! through [`Session::heartbeat`], so it takes the same lock as every
//! mutation and its pushes are ordered with theirs.
//!
//! The task runs until [`Heartbeat::stop`] is called, whether or not any
//! viewer is connected.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::session::Session;

/// Handle to the running heartbeat task.
#[derive(Debug)]
pub struct Heartbeat {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Start pushing the current snapshot every `period`.
    ///
    /// The first push happens one full period after the call. Periods below
    /// one millisecond are raised to one millisecond.
    pub fn spawn(session: Arc<Session>, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = signal.notified() => {
                        debug!("heartbeat stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let delivered = session.heartbeat().await;
                        trace!(delivered, "heartbeat tick");
                    }
                }
            }
        });

        info!(period_ms = period.as_millis(), "heartbeat started");
        Self { shutdown, handle }
    }

    /// Signal the task to stop and wait for it to finish.
    pub async fn stop(self) {
        // notify_one stores a permit, so the signal is not lost if the task
        // is mid-push rather than parked on `notified()`.
        self.shutdown.notify_one();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "heartbeat task ended abnormally");
        }
        info!("heartbeat stopped");
    }
}
