//! Sliding-window rate limiter.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use super::config::{Bucket, BucketConfig, LimiterConfig};
use crate::clock::{Clock, SystemClock};
use crate::store::WindowStore;
use crate::{GuardError, Result, telemetry};

/// Header names for the rate limit response contract.
pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RESET: &str = "X-RateLimit-Reset";

/// Result of a single [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Bucket quota; `None` when the limiter failed open.
    pub limit: Option<u32>,
    /// Requests left in the current window; `None` when unlimited.
    pub remaining: Option<u32>,
    /// Epoch milliseconds at which the oldest request in the window
    /// leaves it. `0` when the limiter failed open.
    pub reset_epoch_ms: u64,
}

impl RateLimitDecision {
    /// The fail-open decision.
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            limit: None,
            remaining: None,
            reset_epoch_ms: 0,
        }
    }

    /// Whether this decision came from a fail-open path.
    pub fn is_unlimited(&self) -> bool {
        self.limit.is_none()
    }

    /// `X-RateLimit-*` header pairs.
    pub fn headers(&self) -> [(&'static str, String); 3] {
        let quota = |v: Option<u32>| v.map_or_else(|| "unlimited".to_string(), |n| n.to_string());
        [
            (HEADER_LIMIT, quota(self.limit)),
            (HEADER_REMAINING, quota(self.remaining)),
            (HEADER_RESET, self.reset_epoch_ms.to_string()),
        ]
    }

    /// Seconds until a retry may succeed: `ceil((reset - now) / 1000)`.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_epoch_ms.saturating_sub(now_ms).div_ceil(1000)
    }

    pub fn retry_after(&self, now_ms: u64) -> Duration {
        Duration::from_secs(self.retry_after_secs(now_ms))
    }
}

/// Limiter backed by a [`WindowStore`].
pub struct SlidingWindowLimiter {
    store: Arc<dyn WindowStore>,
    config: LimiterConfig,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    /// Build a limiter on the system clock. Fails if any bucket is
    /// missing or misconfigured, or if a bucket window outlives the
    /// store's [`retention`](WindowStore::retention).
    pub fn new(store: Arc<dyn WindowStore>, config: LimiterConfig) -> Result<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn WindowStore>,
        config: LimiterConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(retention) = store.retention() {
            if let Some((bucket, window)) = config.longest_window() {
                if window > retention {
                    return Err(GuardError::Configuration(format!(
                        "rate limit bucket '{bucket}' window of {}s exceeds the '{}' store's \
                         window retention of {}s",
                        window.as_secs(),
                        store.name(),
                        retention.as_secs()
                    )));
                }
            }
        }
        Ok(Self {
            store,
            config,
            clock,
        })
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    async fn check(&self, bucket: Bucket, identifier: &str) -> RateLimitDecision {
        let Some(BucketConfig {
            max_requests,
            window_secs,
        }) = self.config.get(bucket)
        else {
            // Unreachable after validate().
            warn!(bucket = %bucket, "rate limit bucket missing at request time, failing open");
            return fail_open(bucket);
        };

        let window_ms = window_secs.saturating_mul(1000);
        let now_ms = self.clock.now_ms();
        let key = bucket.key_for(identifier);

        let outcome = match self.store.hit(&key, now_ms, window_ms, max_requests).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    bucket = %bucket,
                    backend = self.store.name(),
                    error = %e,
                    "rate limit store unavailable, failing open"
                );
                return fail_open(bucket);
            }
        };

        let reset_epoch_ms = outcome
            .oldest_ms
            .unwrap_or(now_ms)
            .saturating_add(window_ms);
        let remaining = if outcome.admitted {
            max_requests.saturating_sub(outcome.count)
        } else {
            0
        };

        let label = if outcome.admitted { "allowed" } else { "rejected" };
        metrics::counter!(telemetry::RATE_LIMIT_DECISIONS_TOTAL,
            "bucket" => bucket.as_str(),
            "outcome" => label
        )
        .increment(1);
        if !outcome.admitted {
            debug!(bucket = %bucket, identifier, reset_epoch_ms, "rate limit exceeded");
        }

        RateLimitDecision {
            allowed: outcome.admitted,
            limit: Some(max_requests),
            remaining: Some(remaining),
            reset_epoch_ms,
        }
    }
}

fn fail_open(bucket: Bucket) -> RateLimitDecision {
    metrics::counter!(telemetry::RATE_LIMIT_DECISIONS_TOTAL,
        "bucket" => bucket.as_str(),
        "outcome" => "fail_open"
    )
    .increment(1);
    RateLimitDecision::unlimited()
}

/// Rate limiting strategy, selected once at startup.
pub enum RateLimiter {
    SlidingWindow(SlidingWindowLimiter),
    /// No backing store configured; every check is admitted.
    Disabled,
}

impl RateLimiter {
    pub fn sliding_window(limiter: SlidingWindowLimiter) -> Self {
        RateLimiter::SlidingWindow(limiter)
    }

    pub fn disabled() -> Self {
        RateLimiter::Disabled
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, RateLimiter::SlidingWindow(_))
    }

    /// Admit or reject one action by `identifier` in `bucket`.
    ///
    /// An admitted check counts against the window; there is no separate
    /// commit step. Backend failures fail open.
    pub async fn check(&self, bucket: Bucket, identifier: &str) -> RateLimitDecision {
        match self {
            RateLimiter::SlidingWindow(limiter) => limiter.check(bucket, identifier).await,
            RateLimiter::Disabled => fail_open(bucket),
        }
    }

    /// Current time on the limiter's clock, for retry-after computation.
    pub fn now_ms(&self) -> u64 {
        match self {
            RateLimiter::SlidingWindow(limiter) => limiter.now_ms(),
            RateLimiter::Disabled => SystemClock.now_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_rounds_up() {
        let decision = RateLimitDecision {
            allowed: false,
            limit: Some(5),
            remaining: Some(0),
            reset_epoch_ms: 10_001,
        };
        assert_eq!(decision.retry_after_secs(9_000), 2);
        assert_eq!(decision.retry_after_secs(10_001), 0);
        assert_eq!(decision.retry_after_secs(20_000), 0);
    }

    #[test]
    fn unlimited_headers() {
        let headers = RateLimitDecision::unlimited().headers();
        assert_eq!(headers[0], (HEADER_LIMIT, "unlimited".to_string()));
        assert_eq!(headers[1], (HEADER_REMAINING, "unlimited".to_string()));
        assert_eq!(headers[2], (HEADER_RESET, "0".to_string()));
    }

    #[test]
    fn finite_headers() {
        let decision = RateLimitDecision {
            allowed: true,
            limit: Some(30),
            remaining: Some(29),
            reset_epoch_ms: 1_700_000_010_000,
        };
        let headers = decision.headers();
        assert_eq!(headers[0].1, "30");
        assert_eq!(headers[1].1, "29");
        assert_eq!(headers[2].1, "1700000010000");
    }
}
