// this_file: src/config.rs

//! Construction-time configuration for the reuse cache.

use crate::error::{Error, Result};
use crate::matcher::ReusePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const MIB: usize = 1024 * 1024;

/// Pool configuration.
///
/// Every field has a default, so a JSON file only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Idle-tier size that triggers eviction
    pub high_watermark_bytes: usize,
    /// Idle-tier size eviction drains down to
    pub low_watermark_bytes: usize,
    /// Log per-operation detail at debug level
    pub verbose_logging: bool,
    pub reuse_policy: ReusePolicy,
    /// Period of the stats dump, 0 disables it
    pub stats_interval_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            high_watermark_bytes: 32 * MIB,
            low_watermark_bytes: 24 * MIB,
            verbose_logging: false,
            reuse_policy: ReusePolicy::default(),
            stats_interval_ms: 5000,
        }
    }
}

impl PoolConfig {
    /// Defaults with the given watermarks.
    pub fn with_watermarks(high_watermark_bytes: usize, low_watermark_bytes: usize) -> Self {
        Self {
            high_watermark_bytes,
            low_watermark_bytes,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: ReusePolicy) -> Self {
        self.reuse_policy = policy;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose_logging = verbose;
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Check that both watermarks are positive and ordered.
    pub fn validate(&self) -> Result<()> {
        if self.high_watermark_bytes == 0 || self.low_watermark_bytes == 0 {
            return Err(Error::Config(format!(
                "watermarks must be positive (high={}, low={})",
                self.high_watermark_bytes, self.low_watermark_bytes
            )));
        }
        if self.low_watermark_bytes > self.high_watermark_bytes {
            return Err(Error::Config(format!(
                "low watermark {} exceeds high watermark {}",
                self.low_watermark_bytes, self.high_watermark_bytes
            )));
        }
        Ok(())
    }

    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_ms > 0).then(|| Duration::from_millis(self.stats_interval_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        let config = PoolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reuse_policy, ReusePolicy::Capacity);
        assert_eq!(config.stats_interval(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = PoolConfig::from_json(
            r#"{"high_watermark_bytes": 1000, "low_watermark_bytes": 500, "reuse_policy": "exact"}"#,
        )
        .unwrap();
        assert_eq!(config.high_watermark_bytes, 1000);
        assert_eq!(config.low_watermark_bytes, 500);
        assert_eq!(config.reuse_policy, ReusePolicy::Exact);
        assert!(!config.verbose_logging);
    }

    #[test]
    fn inverted_watermarks_are_rejected() {
        let err = PoolConfig::with_watermarks(100, 200).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(PoolConfig::with_watermarks(0, 0).validate().is_err());
        assert!(PoolConfig::with_watermarks(100, 100).validate().is_ok());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = PoolConfig::from_json(r#"{"high_water": 1}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"stats_interval_ms": 0, "verbose_logging": true}}"#).unwrap();
        let config = PoolConfig::from_json_file(file.path()).unwrap();
        assert!(config.verbose_logging);
        assert_eq!(config.stats_interval(), None);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = PoolConfig::from_json_file("/nonexistent/pixpool.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
