pub mod engine;
pub mod poller;

pub use crate::domain::model::{CycleReport, FetchOutcome, PollState, RunExit};
pub use crate::domain::ports::{ConfigProvider, Display, Fetcher};
pub use crate::utils::error::Result;
