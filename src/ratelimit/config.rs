//! Bucket definitions and limiter configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{GuardError, Result};

/// A named rate limit bucket.
///
/// Buckets never share state: exhausting `ServerCreate` for an identifier
/// has no effect on `ChannelCreate` or `Messages` for the same identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    /// Posting messages.
    Messages,
    /// General API traffic.
    Api,
    /// File uploads.
    Uploads,
    /// Creating servers.
    ServerCreate,
    /// Creating channels.
    ChannelCreate,
}

impl Bucket {
    pub const ALL: [Bucket; 5] = [
        Bucket::Messages,
        Bucket::Api,
        Bucket::Uploads,
        Bucket::ServerCreate,
        Bucket::ChannelCreate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Messages => "messages",
            Bucket::Api => "api",
            Bucket::Uploads => "uploads",
            Bucket::ServerCreate => "server-create",
            Bucket::ChannelCreate => "channel-create",
        }
    }

    /// Default limits: messages 30/10s, api 100/min, uploads 10/min,
    /// server-create 5/h, channel-create 20/h.
    pub fn default_config(self) -> BucketConfig {
        match self {
            Bucket::Messages => BucketConfig::new(30, 10),
            Bucket::Api => BucketConfig::new(100, 60),
            Bucket::Uploads => BucketConfig::new(10, 60),
            Bucket::ServerCreate => BucketConfig::new(5, 3600),
            Bucket::ChannelCreate => BucketConfig::new(20, 3600),
        }
    }

    /// Store key for an identifier in this bucket.
    pub(crate) fn key_for(self, identifier: &str) -> String {
        format!("ratelimit:{}:{identifier}", self.as_str())
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        Bucket::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| GuardError::Configuration(format!("unknown rate limit bucket '{s}'")))
    }
}

/// Window and quota for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Maximum admitted requests per window.
    pub max_requests: u32,
    /// Sliding window length in seconds.
    pub window_secs: u64,
}

impl BucketConfig {
    /// Windows are whole seconds, matching the `X-RateLimit-*` contract.
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    fn validate(&self, bucket: Bucket) -> Result<()> {
        if self.window_secs == 0 {
            return Err(GuardError::Configuration(format!(
                "rate limit bucket '{bucket}' has a zero-length window"
            )));
        }
        if self.max_requests == 0 {
            return Err(GuardError::Configuration(format!(
                "rate limit bucket '{bucket}' admits no requests (max_requests = 0)"
            )));
        }
        Ok(())
    }
}

/// Configuration for every bucket. Immutable once a limiter is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    buckets: BTreeMap<Bucket, BucketConfig>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            buckets: Bucket::ALL
                .into_iter()
                .map(|b| (b, b.default_config()))
                .collect(),
        }
    }
}

impl LimiterConfig {
    /// Defaults for every bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// A config with no buckets; every bucket must be added before
    /// [`validate`](Self::validate) passes.
    pub fn empty() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    /// Override one bucket.
    pub fn bucket(mut self, bucket: Bucket, config: BucketConfig) -> Self {
        self.buckets.insert(bucket, config);
        self
    }

    /// Look up a bucket's config.
    pub fn get(&self, bucket: Bucket) -> Option<BucketConfig> {
        self.buckets.get(&bucket).copied()
    }

    /// The bucket with the longest window, if any are configured.
    pub fn longest_window(&self) -> Option<(Bucket, Duration)> {
        self.buckets
            .iter()
            .map(|(&bucket, config)| (bucket, config.window()))
            .max_by_key(|&(_, window)| window)
    }

    /// Every bucket must be configured with a non-zero window and quota.
    pub fn validate(&self) -> Result<()> {
        for bucket in Bucket::ALL {
            match self.buckets.get(&bucket) {
                Some(config) => config.validate(bucket)?,
                None => {
                    return Err(GuardError::Configuration(format!(
                        "rate limit bucket '{bucket}' is not configured"
                    )));
                }
            }
        }
        Ok(())
    }
}
