//! Fixed-interval polling with cooperative cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::controller::SnapshotController;

pub struct Poller;

/// Cancellation handle for a running poller. Dropping it does not stop the
/// loop; call [`PollerHandle::cancel`] or [`PollerHandle::shutdown`].
pub struct PollerHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Poller {
    /// Drive the controller: one cycle immediately, then one per
    /// `interval`, on a single timeline. Cycles never overlap because the
    /// loop awaits each one; a cycle that overruns the interval delays the
    /// next tick rather than stacking a second fetch.
    pub fn start(controller: Arc<SnapshotController>, interval: Duration) -> PollerHandle {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                controller.begin_cycle();
                let outcome = tokio::select! {
                    biased;
                    _ = cancel_rx.changed() => break,
                    outcome = controller.execute_cycle() => outcome,
                };
                if *cancel_rx.borrow() {
                    // Cancelled while the cycle was in flight: the work
                    // finished but its result must not be published.
                    debug!("poller cancelled mid-cycle, discarding outcome");
                    break;
                }
                controller.publish(outcome);
            }
            info!("poller stopped");
        });

        PollerHandle {
            cancel: cancel_tx,
            task,
        }
    }
}

impl PollerHandle {
    /// Stop all future ticks. An in-flight cycle is allowed to finish but
    /// its outcome is discarded rather than published.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Cancel and wait for the polling task to wind down.
    pub async fn shutdown(self) {
        self.cancel();
        let _ = self.task.await;
    }
}
