//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (explicit path, must exist)
//! 2. `~/.chatguard/config.toml` (user)
//! 3. `/etc/chatguard/config.toml` (system)
//!
//! If no file is found, built-in defaults are used. Every section is
//! optional; omitted keys take their defaults.
//!
//! ```toml
//! [cache]
//! enabled = true
//! max_entries = 10000
//!
//! [cache.ttl]
//! profile = 300
//! messages = 30
//!
//! [rate_limit]
//! enabled = true
//!
//! [rate_limit.buckets.server-create]
//! max_requests = 5
//! window_secs = 3600
//!
//! [metrics]
//! capacity = 1000
//! ```
//!
//! Validation runs at load time: a bad TTL table or bucket fails startup,
//! never a request.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::cache::TtlTable;
use crate::perf::DEFAULT_CAPACITY;
use crate::ratelimit::{Bucket, BucketConfig, LimiterConfig};
use crate::store::MemoryStoreConfig;
use crate::{GuardError, Result};

/// Subsystem configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub rate_limit: RateLimitSection,
    #[serde(default)]
    pub metrics: MetricsSection,
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// When false, reads pass straight through to the store (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum cached values in the in-process store (default: 10,000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Per-namespace TTLs in seconds.
    #[serde(default)]
    pub ttl: TtlTable,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
            ttl: TtlTable::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> u64 {
    10_000
}

/// Rate limit configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSection {
    /// When false, every check is admitted (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum tracked identifiers across all buckets (default: 100,000).
    #[serde(default = "default_max_identifiers")]
    pub max_tracked_identifiers: u64,
    /// Per-bucket overrides, keyed by bucket name (e.g. `server-create`).
    /// Buckets not listed keep their defaults.
    #[serde(default)]
    pub buckets: BTreeMap<String, BucketConfig>,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tracked_identifiers: default_max_identifiers(),
            buckets: BTreeMap::new(),
        }
    }
}

fn default_max_identifiers() -> u64 {
    100_000
}

/// Metrics collector configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSection {
    /// Retained samples (default: 1,000).
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Config {
    /// Load configuration from the standard locations and validate it.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let Some(path) = Self::resolve_config_path(explicit_path)? else {
            debug!("no config file found, using defaults");
            return Ok(Self::default());
        };
        let content = fs::read_to_string(&path).map_err(|e| {
            GuardError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            GuardError::Configuration(msg) => {
                GuardError::Configuration(format!("{msg} (in {path:?})"))
            }
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| GuardError::Configuration(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the TTL table, bucket overrides and metrics capacity.
    pub fn validate(&self) -> Result<()> {
        self.cache.ttl.validate()?;
        self.limiter_config()?;
        if self.metrics.capacity == 0 {
            return Err(GuardError::Configuration(
                "metrics capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Default buckets with the configured overrides applied.
    pub fn limiter_config(&self) -> Result<LimiterConfig> {
        let mut limiter = LimiterConfig::default();
        for (name, bucket_config) in &self.rate_limit.buckets {
            let bucket: Bucket = name.parse()?;
            limiter = limiter.bucket(bucket, *bucket_config);
        }
        limiter.validate()?;
        Ok(limiter)
    }

    /// In-process store sizing derived from this config.
    ///
    /// Window logs idle for longer than the longest bucket window hold
    /// nothing that could still count, so that is the idle timeout.
    pub fn memory_store_config(&self) -> Result<MemoryStoreConfig> {
        let limiter = self.limiter_config()?;
        let longest_window = limiter
            .longest_window()
            .map_or(Duration::from_secs(3600), |(_, window)| window);
        Ok(MemoryStoreConfig::new()
            .max_entries(self.cache.max_entries)
            .max_windows(self.rate_limit.max_tracked_identifiers)
            .window_idle(longest_window))
    }

    /// Resolve the config file path, if any.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(GuardError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".chatguard").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/chatguard/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.cache.enabled);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.metrics.capacity, 1_000);
        assert_eq!(config.cache.ttl, TtlTable::default());
    }

    #[test]
    fn memory_store_idle_matches_longest_window() {
        let config = Config::default();
        let store = config.memory_store_config().unwrap();
        assert_eq!(store.window_idle, Duration::from_secs(3600));
        assert_eq!(store.max_entries, 10_000);
    }
}
