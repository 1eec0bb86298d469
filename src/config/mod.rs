#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url,
};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/";
pub const DEFAULT_ENDPOINT: &str = "update";
pub const DEFAULT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_TARGET: &str = "container";
pub const DEFAULT_OUTPUT_DIR: &str = "./display";

const MAX_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// Checks shared by every configuration source.
pub fn validate_settings<C: ConfigProvider>(config: &C) -> Result<()> {
    validate_url("base_url", config.base_url())?;
    validate_non_empty_string("endpoint", config.endpoint())?;
    validate_range(
        "interval_ms",
        config.interval().as_millis() as u64,
        1,
        MAX_INTERVAL_MS,
    )?;
    if let Some(max) = config.max_cycles() {
        validate_positive_number("max_cycles", max, 1)?;
    }
    validate_non_empty_string("target", config.target())?;
    validate_path("output_dir", config.output_dir())?;
    Ok(())
}
