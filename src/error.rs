//! chatguard error types

use std::time::Duration;

use crate::ratelimit::RateLimitDecision;

/// chatguard error types
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    // Infrastructure errors (absorbed inside the subsystem)
    #[error("cache backend unavailable: {0}")]
    Backend(String),

    // Source-of-truth errors, propagated from compute closures
    #[error("store error: {0}")]
    Store(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors (fatal at startup)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A mutation was rejected by the rate limiter.
    ///
    /// Carries the full decision so the HTTP layer can emit the
    /// `X-RateLimit-*` headers alongside the retry hint.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        retry_after: Duration,
        decision: RateLimitDecision,
    },

    /// The spawned compute task panicked or was aborted by runtime shutdown.
    #[error("compute task failed: {0}")]
    TaskFailed(String),
}

impl GuardError {
    /// Whether this error originates from the cache or limiter backend
    /// (and should therefore be degraded rather than surfaced).
    pub fn is_backend(&self) -> bool {
        matches!(self, GuardError::Backend(_))
    }

    /// Retry hint for rate limit rejections.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GuardError::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Result type alias for chatguard operations
pub type Result<T> = std::result::Result<T, GuardError>;
