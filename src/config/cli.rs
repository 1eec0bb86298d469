use crate::config::{
    validate_settings, DEFAULT_BASE_URL, DEFAULT_ENDPOINT, DEFAULT_INTERVAL_MS,
    DEFAULT_OUTPUT_DIR, DEFAULT_TARGET,
};
use crate::core::ConfigProvider;
use crate::domain::model::FailurePolicy;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "update-poller")]
#[command(about = "Poll an update endpoint and mirror its body into a display region")]
pub struct CliConfig {
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    #[arg(long, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval_ms: u64,

    #[arg(long, value_enum, default_value_t = FailurePolicy::Stall)]
    pub on_failure: FailurePolicy,

    #[arg(long, help = "Stop after this many cycles")]
    pub max_cycles: Option<u64>,

    #[arg(long, default_value = DEFAULT_TARGET)]
    pub target: String,

    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: String,

    #[arg(long, help = "Load poll settings from a TOML file instead of flags")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Validate settings and show the resolved endpoint without polling")]
    pub dry_run: bool,

    #[arg(long, help = "Print final poll statistics as JSON")]
    pub print_stats: bool,
}

impl ConfigProvider for CliConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.on_failure
    }

    fn max_cycles(&self) -> Option<u64> {
        self.max_cycles
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn output_dir(&self) -> &str {
        &self.output_dir
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_settings(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_page_script() {
        let config = CliConfig::parse_from(["update-poller"]);

        assert_eq!(config.endpoint(), "update");
        assert_eq!(config.interval(), Duration::from_millis(1000));
        assert_eq!(config.target(), "container");
        assert_eq!(config.failure_policy(), FailurePolicy::Stall);
        assert!(config.max_cycles().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = CliConfig::parse_from([
            "update-poller",
            "--base-url",
            "http://example.com/index.html",
            "--interval-ms",
            "250",
            "--on-failure",
            "reschedule",
            "--max-cycles",
            "3",
        ]);

        assert_eq!(config.base_url(), "http://example.com/index.html");
        assert_eq!(config.interval(), Duration::from_millis(250));
        assert_eq!(config.failure_policy(), FailurePolicy::Reschedule);
        assert_eq!(config.max_cycles(), Some(3));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let config = CliConfig::parse_from(["update-poller", "--interval-ms", "0"]);
        assert!(config.validate().is_err());
    }
}
