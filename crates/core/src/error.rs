//! Error types for settle
//!
//! The debounce machinery itself never fails. These errors come from the
//! surrounding layers: runtime discovery and configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised outside the debounce core
#[derive(Debug, Error)]
pub enum SettleError {
    /// A delay below zero was supplied
    #[error("delay must be non-negative, got {0}ms")]
    NegativeDelay(i64),

    /// `TokioScheduler::current` was called outside a tokio runtime
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// Config file could not be read
    #[error("failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for `DebounceConfig`
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
