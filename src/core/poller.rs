use crate::core::{ConfigProvider, Display, Fetcher};
use crate::domain::model::{
    CycleReport, DisplayTarget, FailurePolicy, FetchOutcome, PollState, RunExit,
};
use crate::utils::error::Result;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub target: DisplayTarget,
    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
    pub failure_policy: FailurePolicy,
    pub max_cycles: Option<u64>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            target: DisplayTarget::default(),
            interval: DEFAULT_INTERVAL,
            failure_policy: FailurePolicy::default(),
            max_cycles: None,
        }
    }
}

impl PollerConfig {
    pub fn from_provider<C: ConfigProvider>(config: &C) -> Self {
        Self {
            target: DisplayTarget::new(config.target()),
            interval: config.interval(),
            failure_policy: config.failure_policy(),
            max_cycles: config.max_cycles(),
        }
    }
}

/// Publishes `AwaitingResponse` while any chain of a poller has a request in flight.
#[derive(Debug)]
struct StateTracker {
    in_flight: Mutex<usize>,
    state: watch::Sender<PollState>,
}

impl StateTracker {
    fn new() -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            in_flight: Mutex::new(0),
            state,
        }
    }

    fn begin(&self) -> InFlight<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        *in_flight += 1;
        self.state.send_replace(PollState::AwaitingResponse);
        InFlight { tracker: self }
    }
}

/// Held for the duration of one request; dropping it (also on cancellation) ends it.
struct InFlight<'a> {
    tracker: &'a StateTracker,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .tracker
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *in_flight -= 1;
        if *in_flight == 0 {
            self.tracker.state.send_replace(PollState::Idle);
        }
    }
}

/// Fetches the update endpoint and mirrors the body into one display region,
/// one cycle at a time.
///
/// Clones share the fetcher, display and state channel. Each call to [`Poller::start`]
/// spawns its own chain; nothing prevents two chains from running side by side. The
/// shared state reads `AwaitingResponse` while at least one chain is waiting.
pub struct Poller<F, D> {
    fetcher: Arc<F>,
    display: Arc<D>,
    config: Arc<PollerConfig>,
    state: Arc<StateTracker>,
    observer: Option<mpsc::UnboundedSender<CycleReport>>,
}

impl<F, D> Clone for Poller<F, D> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            display: Arc::clone(&self.display),
            config: Arc::clone(&self.config),
            state: Arc::clone(&self.state),
            observer: self.observer.clone(),
        }
    }
}

impl<F: Fetcher, D: Display> Poller<F, D> {
    pub fn new(fetcher: F, display: D, config: PollerConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            display: Arc::new(display),
            config: Arc::new(config),
            state: Arc::new(StateTracker::new()),
            observer: None,
        }
    }

    /// Send a [`CycleReport`] for every finished cycle to `observer`.
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<CycleReport>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn state(&self) -> PollState {
        *self.state.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PollState> {
        self.state.state.subscribe()
    }

    /// Spawn a chain that starts its first fetch right away.
    pub fn start(&self, token: CancellationToken) -> JoinHandle<Result<RunExit>>
    where
        F: 'static,
        D: 'static,
    {
        let poller = self.clone();
        tokio::spawn(async move { poller.run(token).await })
    }

    /// One complete cycle without the trailing delay.
    ///
    /// The display is only touched when the fetch succeeded.
    pub async fn fetch_and_update(&self) -> Result<FetchOutcome> {
        let outcome = self.request().await;
        self.settle(&outcome).await?;
        Ok(outcome)
    }

    pub async fn apply_update(&self, body: &str) -> Result<()> {
        self.display
            .replace_content(&self.config.target, body)
            .await?;
        tracing::debug!(
            "Updated '{}' with {} bytes",
            self.config.target,
            body.len()
        );
        Ok(())
    }

    /// Cycle until cancelled, stalled by a failure, or out of cycles.
    ///
    /// The token is honored while a request is in flight and during the delay, never
    /// in the middle of writing to the display. A limit of 0 cycles sends no request.
    pub async fn run(&self, token: CancellationToken) -> Result<RunExit> {
        let mut cycle: u64 = 0;

        if self.config.max_cycles == Some(0) {
            tracing::info!("Poll chain has a limit of 0 cycles, nothing to do");
            return Ok(RunExit::CycleLimitReached);
        }

        loop {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!("Poll chain cancelled while awaiting response");
                    return Ok(RunExit::Cancelled);
                }
                outcome = self.request() => outcome,
            };

            self.settle(&outcome).await?;
            cycle += 1;
            self.report(cycle, &outcome);

            if !outcome.is_success() && self.config.failure_policy == FailurePolicy::Stall {
                tracing::warn!("Poll chain stalled after failed cycle {}", cycle);
                return Ok(RunExit::Stalled);
            }

            if self.config.max_cycles.is_some_and(|max| cycle >= max) {
                tracing::info!("Poll chain reached its limit of {} cycles", cycle);
                return Ok(RunExit::CycleLimitReached);
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!("Poll chain cancelled while waiting for next cycle");
                    return Ok(RunExit::Cancelled);
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    async fn request(&self) -> FetchOutcome {
        let _in_flight = self.state.begin();
        self.fetcher.fetch().await
    }

    async fn settle(&self, outcome: &FetchOutcome) -> Result<()> {
        match outcome {
            FetchOutcome::Success { body } => self.apply_update(body).await,
            FetchOutcome::Failure { reason } => {
                tracing::warn!("Update request failed: {}", reason);
                Ok(())
            }
        }
    }

    fn report(&self, cycle: u64, outcome: &FetchOutcome) {
        if let Some(observer) = &self.observer {
            // a dropped receiver only means nobody is listening anymore
            let _ = observer.send(CycleReport {
                cycle,
                outcome: outcome.clone(),
                completed_at: Utc::now(),
            });
        }
    }
}
