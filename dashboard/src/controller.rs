//! The snapshot controller: owns published state and the display
//! preference, and runs one fetch-merge-derive cycle at a time.

use std::sync::{Arc, RwLock};

use tracing::{debug, error};

use chainstats::derived::{self, DerivedMetrics};
use chainstats::issuance::{self, IssuanceError};
use chainstats::snapshot::MetricsSnapshot;
use feeds::{fetch_all, FeedEndpoints, FeedTransport, RawSourceBundle};

use crate::clock::Clock;

/// Where the controller is in its poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, no cycle started yet.
    Idle,
    /// A cycle is in flight.
    Loading,
    /// The last cycle produced a snapshot.
    Ready,
    /// The last cycle failed; `error` carries the cause.
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::Failed => "failed",
        }
    }
}

/// Everything the view layer sees, cloned out under one lock so a reader
/// never observes a mix of two cycles.
#[derive(Debug, Clone)]
pub struct PublishedState {
    pub phase: Phase,
    /// Present only when `phase` is `Ready`.
    pub snapshot: Option<Arc<MetricsSnapshot>>,
    /// Present only when `phase` is `Ready`.
    pub derived: Option<DerivedMetrics>,
    /// Present only when `phase` is `Failed`.
    pub error: Option<String>,
    /// Most recent successful snapshot, retained across failed cycles for
    /// display continuity. Check `phase` before trusting it.
    pub last_good: Option<Arc<MetricsSnapshot>>,
    /// Fiat values in millions notation when true.
    pub display_millions: bool,
}

impl PublishedState {
    fn initial() -> Self {
        Self {
            phase: Phase::Idle,
            snapshot: None,
            derived: None,
            error: None,
            last_good: None,
            display_millions: false,
        }
    }
}

/// Result of one cycle, not yet published. The poller decides whether it
/// gets published or discarded (on cancellation).
#[derive(Debug)]
pub enum CycleOutcome {
    Success {
        snapshot: Arc<MetricsSnapshot>,
        derived: DerivedMetrics,
    },
    Failure {
        cause: String,
    },
}

pub struct SnapshotController {
    transport: Arc<dyn FeedTransport>,
    endpoints: FeedEndpoints,
    clock: Arc<dyn Clock>,
    gold_supply_oz: f64,
    state: RwLock<PublishedState>,
}

impl SnapshotController {
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        endpoints: FeedEndpoints,
        clock: Arc<dyn Clock>,
        gold_supply_oz: f64,
    ) -> Self {
        Self {
            transport,
            endpoints,
            clock,
            gold_supply_oz,
            state: RwLock::new(PublishedState::initial()),
        }
    }

    /// A poll tick fired: enter `Loading`. Prior snapshot or error stay
    /// published until the cycle resolves.
    pub fn begin_cycle(&self) {
        let mut state = self.state.write().unwrap();
        state.phase = Phase::Loading;
    }

    /// Fetch, merge, and derive without touching published state.
    pub async fn execute_cycle(&self) -> CycleOutcome {
        match fetch_all(self.transport.as_ref(), &self.endpoints).await {
            Ok(bundle) => match self.build_snapshot(bundle) {
                Ok((snapshot, derived)) => CycleOutcome::Success { snapshot, derived },
                Err(e) => CycleOutcome::Failure {
                    cause: e.to_string(),
                },
            },
            Err(e) => CycleOutcome::Failure {
                cause: e.to_string(),
            },
        }
    }

    fn build_snapshot(
        &self,
        bundle: RawSourceBundle,
    ) -> Result<(Arc<MetricsSnapshot>, DerivedMetrics), IssuanceError> {
        let issued_supply_sat = issuance::total_issued(bundle.chain.height as i64)?;
        let snapshot = Arc::new(MetricsSnapshot {
            mempool: bundle.mempool,
            fiat: bundle.fiat,
            lightning: bundle.lightning,
            chain: bundle.chain,
            gold_usd_per_oz: bundle.gold_usd_per_oz,
            issued_supply_sat,
            timestamp: self.clock.now_unix(),
        });
        let derived = derived::derive(&snapshot, self.gold_supply_oz);
        Ok((snapshot, derived))
    }

    /// Publish a resolved cycle: `Ready` on success, `Failed` with the
    /// cause on failure. A failure clears the canonical snapshot but keeps
    /// the last successful one in `last_good`.
    pub fn publish(&self, outcome: CycleOutcome) {
        let mut state = self.state.write().unwrap();
        match outcome {
            CycleOutcome::Success { snapshot, derived } => {
                debug!(height = snapshot.chain.height, "publishing snapshot");
                state.last_good = Some(snapshot.clone());
                state.snapshot = Some(snapshot);
                state.derived = Some(derived);
                state.error = None;
                state.phase = Phase::Ready;
            }
            CycleOutcome::Failure { cause } => {
                error!("poll cycle failed: {cause}");
                state.snapshot = None;
                state.derived = None;
                state.error = Some(cause);
                state.phase = Phase::Failed;
            }
        }
    }

    /// One full cycle: begin, execute, publish. The poller uses the split
    /// calls so it can discard an outcome on cancellation.
    pub async fn run_cycle(&self) {
        self.begin_cycle();
        let outcome = self.execute_cycle().await;
        self.publish(outcome);
    }

    pub fn state(&self) -> PublishedState {
        self.state.read().unwrap().clone()
    }

    pub fn display_millions(&self) -> bool {
        self.state.read().unwrap().display_millions
    }

    pub fn set_display_preference(&self, millions: bool) {
        let mut state = self.state.write().unwrap();
        state.display_millions = millions;
    }

    /// Flip the fiat notation preference; returns the new value. Touches
    /// nothing else - formatted views are recomputed on demand.
    pub fn toggle_display_preference(&self) -> bool {
        let mut state = self.state.write().unwrap();
        state.display_millions = !state.display_millions;
        state.display_millions
    }

    /// True when no successful snapshot has landed within `threshold_secs`.
    pub fn is_stale(&self, threshold_secs: u64) -> bool {
        let state = self.state.read().unwrap();
        match state.last_good.as_ref() {
            Some(snapshot) => self.clock.now_unix().saturating_sub(snapshot.timestamp) > threshold_secs,
            None => true,
        }
    }
}
