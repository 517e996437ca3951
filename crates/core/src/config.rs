//! Debounce configuration
//!
//! Loaded from TOML:
//! ```toml
//! delay_ms = 500
//! ```
//! Missing keys fall back to defaults. Negative delays are rejected here,
//! before any timer sees them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::SettleError;
use crate::Result;

/// Default quiescence window in milliseconds
pub const DEFAULT_DELAY_MS: u64 = 500;

/// Validated debounce configuration
///
/// Only built through `with_delay_ms` or parsing, so the delay always fits
/// a TOML integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DebounceConfig {
    /// Quiescence window in milliseconds, at most `i64::MAX`
    delay_ms: u64,
}

/// On-disk shape, before validation
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    delay_ms: Option<i64>,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

impl DebounceConfig {
    /// Build a config from a signed millisecond count
    pub fn with_delay_ms(delay_ms: i64) -> Result<Self> {
        let delay_ms = u64::try_from(delay_ms).map_err(|_| SettleError::NegativeDelay(delay_ms))?;
        Ok(Self { delay_ms })
    }

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(source)?;
        match raw.delay_ms {
            Some(delay_ms) => Self::with_delay_ms(delay_ms),
            None => Ok(Self::default()),
        }
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| SettleError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&source)?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> String {
        // Serializing a single in-range integer cannot fail
        toml::to_string(self).unwrap_or_else(|_| format!("delay_ms = {}\n", self.delay_ms))
    }

    /// Quiescence window in milliseconds
    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// Quiescence window as a `Duration`
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_delay_is_500ms() {
        let config = DebounceConfig::default();
        assert_eq!(config.delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_parse_delay() {
        let config = DebounceConfig::from_toml_str("delay_ms = 250").unwrap();
        assert_eq!(config.delay_ms(), 250);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = DebounceConfig::from_toml_str("").unwrap();
        assert_eq!(config, DebounceConfig::default());
    }

    #[test]
    fn test_negative_delay_rejected() {
        let err = DebounceConfig::from_toml_str("delay_ms = -1").unwrap_err();
        assert!(matches!(err, SettleError::NegativeDelay(-1)));
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = DebounceConfig::from_toml_str("delay = 10").unwrap_err();
        assert!(matches!(err, SettleError::ConfigParse(_)));
    }

    #[test]
    fn test_zero_delay_allowed() {
        let config = DebounceConfig::with_delay_ms(0).unwrap();
        assert_eq!(config.delay(), Duration::ZERO);
    }

    #[test]
    fn test_load_from_file() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("settle.toml");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "delay_ms = 42")?;
        drop(file);

        let config = DebounceConfig::load(&path)?;
        assert_eq!(config.delay_ms(), 42);
        Ok(())
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("missing.toml");

        let err = DebounceConfig::load(&path).unwrap_err();
        assert!(matches!(err, SettleError::ConfigRead { .. }));
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn test_load_or_default_without_path() {
        let config = DebounceConfig::load_or_default(None).unwrap();
        assert_eq!(config, DebounceConfig::default());
    }

    #[test]
    fn test_toml_output_parses_back() {
        let config = DebounceConfig::with_delay_ms(75).unwrap();
        let rendered = config.to_toml_string();
        assert_eq!(DebounceConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_largest_delay_parses_back() {
        let config = DebounceConfig::with_delay_ms(i64::MAX).unwrap();
        let rendered = config.to_toml_string();
        assert_eq!(rendered.trim(), format!("delay_ms = {}", i64::MAX));
        assert_eq!(DebounceConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_delay_past_toml_range_rejected() {
        let err = DebounceConfig::from_toml_str("delay_ms = 9223372036854775808").unwrap_err();
        assert!(matches!(err, SettleError::ConfigParse(_)));
    }
}
