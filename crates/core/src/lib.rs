//! Debounced invocation and debounced state
//!
//! This crate provides:
//! - A timer facility abstraction (`Scheduler`) with tokio and manual clocks
//! - `DebouncedInvoker`: runs a callable once a delay passes with no new trigger
//! - `DebouncedState`: a live value plus a settled value that trails it
//! - TOML-loadable configuration

pub mod config;
pub mod error;
pub mod invoker;
pub mod state;
pub mod timer;

// Re-exports
pub use config::{DebounceConfig, DEFAULT_DELAY_MS};
pub use error::SettleError;
pub use invoker::{DebouncedInvoker, InvokerStatus};
pub use state::{DebouncedState, DebouncedStateBuilder, Update};
pub use timer::{ManualScheduler, Scheduler, TimerHandle, TimerTask, TokioScheduler};

/// Result type for settle operations
pub type Result<T> = std::result::Result<T, SettleError>;
