use crate::core::poller::{Poller, PollerConfig};
use crate::core::{CycleReport, Display, Fetcher, Result, RunExit};
use crate::utils::monitor::PollMonitor;
use std::future::Future;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Drives one poll chain to completion and keeps its statistics.
pub struct PollEngine<F: Fetcher, D: Display> {
    poller: Poller<F, D>,
    reports: mpsc::UnboundedReceiver<CycleReport>,
    monitor: PollMonitor,
    shutdown: CancellationToken,
}

impl<F, D> PollEngine<F, D>
where
    F: Fetcher + 'static,
    D: Display + 'static,
{
    pub fn new(fetcher: F, display: D, config: PollerConfig) -> Self {
        let (tx, reports) = mpsc::unbounded_channel();
        Self {
            poller: Poller::new(fetcher, display, config).with_observer(tx),
            reports,
            monitor: PollMonitor::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn poller(&self) -> &Poller<F, D> {
        &self.poller
    }

    pub fn monitor(&self) -> &PollMonitor {
        &self.monitor
    }

    /// Token that stops the engine from anywhere, equivalent to the shutdown future firing.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Poll until the chain ends on its own or `shutdown` resolves.
    pub async fn run_until<S>(&mut self, shutdown: S) -> Result<RunExit>
    where
        S: Future<Output = ()>,
    {
        let token = self.shutdown.child_token();
        let target = self.poller.config().target.clone();
        tracing::info!(
            "Starting poll chain for '{}' every {:?}",
            target,
            self.poller.config().interval
        );

        let mut handle = self.poller.start(token.clone());
        tokio::pin!(shutdown);

        let exit = loop {
            tokio::select! {
                Some(report) = self.reports.recv() => self.record(&report),
                joined = &mut handle => break joined??,
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping poll chain");
                    token.cancel();
                    break (&mut handle).await??;
                }
            }
        };

        while let Ok(report) = self.reports.try_recv() {
            self.record(&report);
        }

        tracing::info!("Poll chain for '{}' ended: {:?}", target, exit);
        self.monitor.log_final_stats();
        Ok(exit)
    }

    pub async fn run(&mut self) -> Result<RunExit> {
        self.run_until(std::future::pending()).await
    }

    fn record(&self, report: &CycleReport) {
        if report.outcome.is_success() {
            tracing::info!("✅ Cycle {} applied", report.cycle);
        } else {
            tracing::warn!("⚠️ Cycle {} failed", report.cycle);
        }
        self.monitor.record(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryDisplay;
    use crate::domain::model::{DisplayTarget, FailurePolicy, FailureReason, FetchOutcome};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    /// Counts up: `<p>1</p>`, `<p>2</p>`, ... failing on the listed call numbers.
    struct CounterFetcher {
        calls: AtomicU64,
        fail_on: Vec<u64>,
    }

    #[async_trait]
    impl Fetcher for CounterFetcher {
        async fn fetch(&self) -> FetchOutcome {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on.contains(&n) {
                FetchOutcome::failure(FailureReason::Status(500))
            } else {
                FetchOutcome::success(format!("<p>{}</p>", n))
            }
        }
    }

    fn engine(fail_on: Vec<u64>, config: PollerConfig) -> PollEngine<CounterFetcher, MemoryDisplay> {
        let fetcher = CounterFetcher {
            calls: AtomicU64::new(0),
            fail_on,
        };
        let display = MemoryDisplay::with_region(&config.target);
        PollEngine::new(fetcher, display, config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_records_every_cycle_until_limit() {
        let mut engine = engine(
            vec![2],
            PollerConfig {
                failure_policy: FailurePolicy::Reschedule,
                max_cycles: Some(4),
                ..PollerConfig::default()
            },
        );

        let exit = engine.run().await.unwrap();

        assert_eq!(exit, RunExit::CycleLimitReached);
        let stats = engine.monitor().get_stats().unwrap();
        assert_eq!(stats.cycles, 4);
        assert_eq!(stats.successes, 3);
        assert_eq!(stats.failures, 1);

        let content = engine
            .poller()
            .display()
            .content(&DisplayTarget::default())
            .await
            .unwrap();
        assert_eq!(content, "<p>4</p>");
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_stops_on_shutdown_future() {
        let mut engine = engine(vec![], PollerConfig::default());

        let exit = engine
            .run_until(tokio::time::sleep(Duration::from_millis(2500)))
            .await
            .unwrap();

        assert_eq!(exit, RunExit::Cancelled);
        assert_eq!(engine.monitor().get_stats().unwrap().cycles, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_stops_on_shutdown_token() {
        let mut engine = engine(vec![], PollerConfig::default());
        let token = engine.shutdown_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            token.cancel();
        });

        let exit = engine.run().await.unwrap();

        assert_eq!(exit, RunExit::Cancelled);
        assert_eq!(engine.monitor().get_stats().unwrap().cycles, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_reports_stall() {
        let mut engine = engine(vec![1], PollerConfig::default());

        assert_eq!(engine.run().await.unwrap(), RunExit::Stalled);
        let stats = engine.monitor().get_stats().unwrap();
        assert_eq!(stats.successes, 0);
        assert_eq!(stats.failures, 1);
    }
}
