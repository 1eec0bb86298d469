pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{FileDisplay, HttpFetcher, MemoryDisplay};
pub use crate::core::{
    engine::PollEngine,
    poller::{Poller, PollerConfig},
};
pub use domain::model::{
    DisplayTarget, FailurePolicy, FailureReason, FetchOutcome, PollState, RunExit,
};
pub use utils::error::{PollerError, Result};
