//! Multi-bucket sliding-window rate limiting.
//!
//! [`RateLimiter::check`] admits an action iff fewer than `max_requests`
//! actions by the same identifier fall inside the last `window` for that
//! bucket. This is a true sliding log: the reset time is when the oldest
//! in-window request leaves the window, not a fixed bucket boundary.
//!
//! # Fail-open
//!
//! [`RateLimiter::Disabled`] (no store configured) and any store error
//! both produce [`RateLimitDecision::unlimited()`].
//!
//! # Configuration
//!
//! [`LimiterConfig`] is validated when the limiter is built: a missing
//! bucket, zero window, or zero quota fails startup rather than a request.

pub mod config;
pub mod limiter;

pub use config::{Bucket, BucketConfig, LimiterConfig};
pub use limiter::{
    HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET, RateLimitDecision, RateLimiter,
    SlidingWindowLimiter,
};
