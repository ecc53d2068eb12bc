//! Baseline snapshots and before/after comparison.
//!
//! A baseline is an explicit, frozen copy of a [`MetricsSummary`]. It is
//! never updated in the background: comparisons always pit the frozen
//! snapshot against whatever samples are in the collector right now.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::stats::MetricsSummary;

/// Line emitted when no comparison line applies.
pub const INSUFFICIENT_DATA: &str =
    "Insufficient data: collect more metrics to generate a comparison summary";

/// A frozen summary used as the reference point for comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    pub summary: MetricsSummary,
    pub captured_at: DateTime<Utc>,
    pub label: String,
}

/// Relative change in a latency metric.
///
/// Lower latency is better, so a decrease is reported as "faster".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencyChange {
    Faster(f64),
    Slower(f64),
    /// The baseline value was zero.
    NotApplicable,
}

impl LatencyChange {
    pub fn between(before: f64, after: f64) -> Self {
        if before == 0.0 {
            return LatencyChange::NotApplicable;
        }
        let reduction = (before - after) / before * 100.0;
        if reduction > 0.0 {
            LatencyChange::Faster(reduction)
        } else {
            LatencyChange::Slower(reduction.abs())
        }
    }

    /// Signed percentage change (negative = faster).
    pub fn percent(&self) -> Option<f64> {
        match *self {
            LatencyChange::Faster(p) => Some(-p),
            LatencyChange::Slower(p) => Some(p),
            LatencyChange::NotApplicable => None,
        }
    }
}

impl fmt::Display for LatencyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatencyChange::Faster(p) => write!(f, "{p:.1}% faster"),
            LatencyChange::Slower(p) => write!(f, "{p:.1}% slower"),
            LatencyChange::NotApplicable => f.write_str("N/A"),
        }
    }
}

/// Hit rate before and after, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRateChange {
    pub before: f64,
    pub after: f64,
}

impl HitRateChange {
    /// Change in percentage points.
    pub fn points(&self) -> f64 {
        self.after - self.before
    }
}

impl fmt::Display for HitRateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.after > self.before { "+" } else { "" };
        write!(
            f,
            "{:.1}% → {:.1}% ({sign}{:.1}pp)",
            self.before,
            self.after,
            self.points()
        )
    }
}

/// Implied throughput change from average latency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThroughputChange {
    /// Percent more requests per second at the current average latency.
    MoreRequests(f64),
    NotApplicable,
}

impl ThroughputChange {
    pub fn between(before_avg: f64, after_avg: f64) -> Self {
        if before_avg > 0.0 && after_avg > 0.0 {
            ThroughputChange::MoreRequests((before_avg / after_avg - 1.0) * 100.0)
        } else {
            ThroughputChange::NotApplicable
        }
    }
}

impl fmt::Display for ThroughputChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThroughputChange::MoreRequests(p) => write!(f, "{p:.1}% more requests/sec"),
            ThroughputChange::NotApplicable => f.write_str("N/A"),
        }
    }
}

fn as_display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Paired metric changes between a baseline and the current summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Improvements {
    #[serde(serialize_with = "as_display")]
    pub avg_latency_change: LatencyChange,
    #[serde(serialize_with = "as_display")]
    pub cache_hit_rate_change: HitRateChange,
    #[serde(serialize_with = "as_display")]
    pub p50_change: LatencyChange,
    #[serde(serialize_with = "as_display")]
    pub p95_change: LatencyChange,
    #[serde(serialize_with = "as_display")]
    pub p99_change: LatencyChange,
    /// Baseline store latency vs current cache latency.
    #[serde(serialize_with = "as_display")]
    pub cache_latency_reduction: LatencyChange,
    #[serde(serialize_with = "as_display")]
    pub throughput_improvement: ThroughputChange,
}

impl Improvements {
    pub fn between(base: &MetricsSummary, current: &MetricsSummary) -> Self {
        let cache_latency_reduction =
            if base.avg_cache_latency_ms > 0.0 && current.avg_cache_latency_ms > 0.0 {
                LatencyChange::between(base.avg_store_latency_ms, current.avg_cache_latency_ms)
            } else {
                LatencyChange::NotApplicable
            };

        Self {
            avg_latency_change: LatencyChange::between(base.avg_latency_ms, current.avg_latency_ms),
            cache_hit_rate_change: HitRateChange {
                before: base.cache_hit_rate_percent,
                after: current.cache_hit_rate_percent,
            },
            p50_change: LatencyChange::between(base.p50_latency_ms, current.p50_latency_ms),
            p95_change: LatencyChange::between(base.p95_latency_ms, current.p95_latency_ms),
            p99_change: LatencyChange::between(base.p99_latency_ms, current.p99_latency_ms),
            cache_latency_reduction,
            throughput_improvement: ThroughputChange::between(
                base.avg_latency_ms,
                current.avg_latency_ms,
            ),
        }
    }
}

/// Result of comparing the current summary against the live baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceComparison {
    pub baseline: BaselineSnapshot,
    pub current: MetricsSummary,
    pub current_captured_at: DateTime<Utc>,
    pub improvements: Improvements,
    /// Newline-separated highlights; see [`summary_lines`].
    pub summary: String,
}

impl PerformanceComparison {
    pub fn new(baseline: BaselineSnapshot, current: MetricsSummary, now: DateTime<Utc>) -> Self {
        let improvements = Improvements::between(&baseline.summary, &current);
        let summary = summary_lines(&baseline.summary, &current).join("\n");
        Self {
            baseline,
            current,
            current_captured_at: now,
            improvements,
            summary,
        }
    }
}

/// Highlights of a comparison, one per positive improvement.
///
/// Covers hit-rate gain, average latency reduction, cache-vs-store
/// speedup and p95 gain. If none apply, returns the single
/// [`INSUFFICIENT_DATA`] line.
pub fn summary_lines(base: &MetricsSummary, current: &MetricsSummary) -> Vec<String> {
    let mut lines = Vec::new();

    if current.cache_hit_rate_percent > base.cache_hit_rate_percent {
        lines.push(format!(
            "- Achieved {:.0}% cache hit rate with caching",
            current.cache_hit_rate_percent
        ));
    }

    if base.avg_latency_ms > current.avg_latency_ms {
        let reduction = (base.avg_latency_ms - current.avg_latency_ms) / base.avg_latency_ms * 100.0;
        lines.push(format!(
            "- Reduced average latency by {reduction:.0}% ({:.0}ms → {:.0}ms)",
            base.avg_latency_ms, current.avg_latency_ms
        ));
    }

    if current.avg_cache_latency_ms > 0.0 && current.avg_store_latency_ms > 0.0 {
        let speedup = current.avg_store_latency_ms / current.avg_cache_latency_ms;
        if speedup > 1.0 {
            lines.push(format!(
                "- Cache responses {speedup:.1}x faster than store queries"
            ));
        }
    }

    if base.p95_latency_ms > current.p95_latency_ms {
        let reduction = (base.p95_latency_ms - current.p95_latency_ms) / base.p95_latency_ms * 100.0;
        lines.push(format!("- Improved P95 latency by {reduction:.0}%"));
    }

    if lines.is_empty() {
        lines.push(INSUFFICIENT_DATA.to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_change_formats() {
        assert_eq!(LatencyChange::between(100.0, 50.0).to_string(), "50.0% faster");
        assert_eq!(LatencyChange::between(100.0, 125.0).to_string(), "25.0% slower");
        assert_eq!(LatencyChange::between(0.0, 10.0).to_string(), "N/A");
        assert_eq!(LatencyChange::between(100.0, 100.0).to_string(), "0.0% slower");
    }

    #[test]
    fn latency_change_percent_is_signed() {
        assert_eq!(LatencyChange::between(100.0, 50.0).percent(), Some(-50.0));
        assert_eq!(LatencyChange::between(100.0, 150.0).percent(), Some(50.0));
        assert_eq!(LatencyChange::NotApplicable.percent(), None);
    }

    #[test]
    fn hit_rate_change_formats() {
        let up = HitRateChange {
            before: 0.0,
            after: 80.0,
        };
        assert_eq!(up.to_string(), "0.0% → 80.0% (+80.0pp)");
        let down = HitRateChange {
            before: 50.0,
            after: 40.0,
        };
        assert_eq!(down.to_string(), "50.0% → 40.0% (-10.0pp)");
    }

    #[test]
    fn throughput_needs_both_averages() {
        assert_eq!(
            ThroughputChange::between(100.0, 50.0).to_string(),
            "100.0% more requests/sec"
        );
        assert_eq!(ThroughputChange::between(0.0, 50.0).to_string(), "N/A");
        assert_eq!(ThroughputChange::between(50.0, 0.0).to_string(), "N/A");
    }

    #[test]
    fn no_improvement_yields_single_line() {
        let base = MetricsSummary::empty();
        let current = MetricsSummary::empty();
        assert_eq!(summary_lines(&base, &current), vec![INSUFFICIENT_DATA.to_string()]);
    }

    #[test]
    fn slower_store_only_speedup_not_reported() {
        let mut current = MetricsSummary::empty();
        current.avg_cache_latency_ms = 20.0;
        current.avg_store_latency_ms = 10.0;
        let lines = summary_lines(&MetricsSummary::empty(), &current);
        assert_eq!(lines, vec![INSUFFICIENT_DATA.to_string()]);
    }
}
