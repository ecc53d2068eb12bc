//! Latency and cache-provenance metrics with baseline comparison.
//!
//! [`MetricsCollector`] keeps the most recent N [`MetricSample`]s in a
//! ring buffer (insertion order, oldest evicted first) and derives a
//! [`MetricsSummary`] on demand. A baseline can be frozen with
//! [`MetricsCollector::capture_baseline`] and later compared against the
//! then-current samples, which is how the effect of enabling the cache is
//! measured: capture with caching off, clear, re-run with caching on,
//! compare.
//!
//! This is separate from the process-level counters in
//! [`telemetry`](crate::telemetry); both are fed on every recorded sample.

pub mod baseline;
pub mod collector;
pub mod report;
pub mod stats;

pub use baseline::{
    BaselineSnapshot, HitRateChange, INSUFFICIENT_DATA, Improvements, LatencyChange,
    PerformanceComparison, ThroughputChange,
};
pub use collector::{DEFAULT_BASELINE_LABEL, DEFAULT_CAPACITY, MetricsCollector};
pub use report::{MetricsReport, ObservabilityEndpoint, ReportConfig};
pub use stats::{MetricSample, MetricsSummary};
