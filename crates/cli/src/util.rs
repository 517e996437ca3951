//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use settle_core::DebounceConfig;
use std::path::Path;

/// Load the config file, then apply a `--delay-ms` override
pub fn resolve_config(path: Option<&Path>, delay_ms: Option<i64>) -> Result<DebounceConfig> {
    let config = DebounceConfig::load_or_default(path).context("Failed to load configuration")?;

    match delay_ms {
        Some(delay_ms) => DebounceConfig::with_delay_ms(delay_ms).context("Invalid --delay-ms"),
        None => Ok(config),
    }
}
