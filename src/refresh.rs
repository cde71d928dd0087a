//! Scheduled dashboard refresh
//!
//! The dashboard re-fetches its four collections on a fixed interval and
//! recomputes everything from scratch. A refresh that is still running when the
//! next tick fires causes that tick to be skipped. Fetch failures are published
//! as [`RefreshState::Failed`] together with the last good snapshot.

use crate::error::FetchError;
use crate::pipeline::DashboardProcessor;
use crate::types::{CognitiveSession, DashboardSnapshot, MedicationEvent, MotorSession, PipelineInputs, SeizureEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Source of the four event collections
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch_seizures(&self) -> Result<Vec<SeizureEvent>, FetchError>;

    async fn fetch_medications(&self) -> Result<Vec<MedicationEvent>, FetchError>;

    async fn fetch_cognitive_sessions(&self) -> Result<Vec<CognitiveSession>, FetchError>;

    async fn fetch_motor_sessions(&self) -> Result<Vec<MotorSession>, FetchError>;
}

/// Fetch the four collections concurrently; the first failure wins
pub async fn fetch_all(source: &dyn DataSource) -> Result<PipelineInputs, FetchError> {
    let (seizures, medications, cognitive_sessions, motor_sessions) = tokio::try_join!(
        source.fetch_seizures(),
        source.fetch_medications(),
        source.fetch_cognitive_sessions(),
        source.fetch_motor_sessions(),
    )?;

    Ok(PipelineInputs {
        seizures,
        medications,
        cognitive_sessions,
        motor_sessions,
    })
}

/// Reference-time provider
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Latest result published to subscribers
#[derive(Debug, Clone, Default)]
pub enum RefreshState {
    /// Nothing fetched yet
    #[default]
    Idle,
    Ready(Arc<DashboardSnapshot>),
    Failed {
        error: FetchError,
        last_good: Option<Arc<DashboardSnapshot>>,
    },
}

impl RefreshState {
    /// Snapshot to display: the fresh one, or the last good one after a failure
    pub fn snapshot(&self) -> Option<&Arc<DashboardSnapshot>> {
        match self {
            RefreshState::Idle => None,
            RefreshState::Ready(snapshot) => Some(snapshot),
            RefreshState::Failed { last_good, .. } => last_good.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            RefreshState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// Another refresh was in flight
    Skipped,
    Failed,
}

/// Clears the in-flight flag even if the refresh future is dropped
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Single-flight refresher publishing snapshots on a watch channel
pub struct DashboardRefresher {
    source: Arc<dyn DataSource>,
    processor: DashboardProcessor,
    clock: Clock,
    interval: Duration,
    in_flight: AtomicBool,
    state: watch::Sender<RefreshState>,
}

impl DashboardRefresher {
    /// Refresher using the processor's configured interval and the system clock
    pub fn new(source: Arc<dyn DataSource>, processor: DashboardProcessor) -> Self {
        let interval = processor.config().refresh_interval();
        let (state, _) = watch::channel(RefreshState::Idle);
        Self {
            source,
            processor,
            clock: Arc::new(Utc::now),
            interval,
            in_flight: AtomicBool::new(false),
            state,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.state.subscribe()
    }

    /// Current published state
    pub fn latest(&self) -> RefreshState {
        self.state.borrow().clone()
    }

    /// Fetch, recompute and publish once
    pub async fn refresh(&self) -> RefreshOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(target: "epiflux::refresh", "Refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        }
        let _guard = InFlight(&self.in_flight);

        match fetch_all(self.source.as_ref()).await {
            Ok(inputs) => {
                let snapshot = self.processor.analyze(&inputs, (self.clock)());
                info!(
                    target: "epiflux::refresh",
                    records = inputs.total_records(),
                    points = snapshot.timeline.len(),
                    stability = snapshot.metrics.stability,
                    "Dashboard refreshed"
                );
                self.state.send_replace(RefreshState::Ready(Arc::new(snapshot)));
                RefreshOutcome::Applied
            }
            Err(error) => {
                warn!(
                    target: "epiflux::refresh",
                    resource = error.resource().unwrap_or("unknown"),
                    error = %error,
                    "Dashboard refresh failed"
                );
                let last_good = self.state.borrow().snapshot().cloned();
                self.state
                    .send_replace(RefreshState::Failed { error, last_good });
                RefreshOutcome::Failed
            }
        }
    }

    /// Refresh now, then on every interval tick until `token` is cancelled
    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                target: "epiflux::refresh",
                interval_secs = self.interval.as_secs(),
                "Refresh task started"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => break,
                            _ = self.refresh() => {}
                        }
                    }
                }
            }

            info!(target: "epiflux::refresh", "Refresh task cancelled");
        })
    }
}
