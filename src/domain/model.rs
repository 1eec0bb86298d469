use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the region whose markup is replaced every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayTarget(String);

impl DisplayTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl Default for DisplayTarget {
    fn default() -> Self {
        Self::new("container")
    }
}

impl fmt::Display for DisplayTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// No response at all (connect error, reset, body read error).
    Transport(String),
    /// A response arrived but its status was not 200.
    Status(u16),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport failure: {}", msg),
            Self::Status(code) => write!(f, "unexpected status {}", code),
        }
    }
}

/// Result of a single request to the update endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchOutcome {
    Success { body: String },
    Failure { reason: FailureReason },
}

impl FetchOutcome {
    pub fn success(body: impl Into<String>) -> Self {
        Self::Success { body: body.into() }
    }

    pub fn failure(reason: FailureReason) -> Self {
        Self::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollState {
    Idle,
    AwaitingResponse,
}

/// What a chain does after a cycle whose fetch failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The chain ends; only a successful apply schedules the next cycle.
    #[default]
    Stall,
    /// The next cycle is scheduled after the regular interval.
    Reschedule,
}

/// One finished cycle, as seen by observers and the stats monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub outcome: FetchOutcome,
    pub completed_at: DateTime<Utc>,
}

/// Why a poll chain stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunExit {
    Cancelled,
    Stalled,
    CycleLimitReached,
}
