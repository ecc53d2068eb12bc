//! Telemetry metric name constants.
//!
//! Centralised metric names for chatguard operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! These are process-level counters for an external scraper. They are
//! independent of [`MetricsCollector`](crate::perf::MetricsCollector),
//! which keeps its own in-memory samples for baseline comparison.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `chatguard_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `namespace`: cache key namespace (e.g. "profile", "messages")
//! - `operation`: backend call: "get", "set", "delete"
//! - `bucket`: rate limit bucket (e.g. "messages", "server-create")
//! - `outcome`: limiter outcome: "allowed", "rejected", "fail_open"

/// Total cache-aside reads served from cache.
///
/// Labels: `namespace`.
pub const CACHE_HITS_TOTAL: &str = "chatguard_cache_hits_total";

/// Total cache-aside reads that fell through to the store.
///
/// Labels: `namespace`.
pub const CACHE_MISSES_TOTAL: &str = "chatguard_cache_misses_total";

/// Total cache backend failures that were degraded to a miss or ignored.
///
/// Labels: `operation` ("get" | "set" | "delete").
pub const CACHE_BACKEND_ERRORS_TOTAL: &str = "chatguard_cache_backend_errors_total";

/// Total cache invalidations attempted.
///
/// Labels: `namespace`.
pub const CACHE_INVALIDATIONS_TOTAL: &str = "chatguard_cache_invalidations_total";

/// Total rate limit decisions.
///
/// Labels: `bucket`, `outcome` ("allowed" | "rejected" | "fail_open").
pub const RATE_LIMIT_DECISIONS_TOTAL: &str = "chatguard_rate_limit_decisions_total";

/// Latency of instrumented operations in seconds.
///
/// Labels: `source` ("cache" | "store").
pub const OPERATION_DURATION_SECONDS: &str = "chatguard_operation_duration_seconds";
