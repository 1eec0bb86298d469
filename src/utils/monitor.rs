use crate::domain::model::{CycleReport, FetchOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct PollStats {
    pub cycles: u64,
    pub successes: u64,
    pub failures: u64,
    pub last_update_at: Option<DateTime<Utc>>,
    pub last_failure: Option<String>,
    #[serde(with = "duration_ms")]
    pub elapsed_time: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    cycles: u64,
    successes: u64,
    failures: u64,
    last_update_at: Option<DateTime<Utc>>,
    last_failure: Option<String>,
}

/// Tallies cycle reports for a running engine. Clones share the same counters.
#[derive(Debug, Clone)]
pub struct PollMonitor {
    counters: Arc<Mutex<Counters>>,
    start_time: Instant,
}

impl PollMonitor {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Mutex::new(Counters::default())),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, report: &CycleReport) {
        let Ok(mut counters) = self.counters.lock() else {
            return;
        };

        counters.cycles += 1;
        match &report.outcome {
            FetchOutcome::Success { .. } => {
                counters.successes += 1;
                counters.last_update_at = Some(report.completed_at);
            }
            FetchOutcome::Failure { reason } => {
                counters.failures += 1;
                counters.last_failure = Some(reason.to_string());
            }
        }
    }

    pub fn get_stats(&self) -> Option<PollStats> {
        let counters = self.counters.lock().ok()?;
        Some(PollStats {
            cycles: counters.cycles,
            successes: counters.successes,
            failures: counters.failures,
            last_update_at: counters.last_update_at,
            last_failure: counters.last_failure.clone(),
            elapsed_time: self.start_time.elapsed(),
        })
    }

    pub fn log_final_stats(&self) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 Final Stats - Cycles: {}, Updates: {}, Failures: {}, Total Time: {:?}",
                stats.cycles,
                stats.successes,
                stats.failures,
                stats.elapsed_time
            );
        }
    }
}

impl Default for PollMonitor {
    fn default() -> Self {
        Self::new()
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}
