//! Samples and summary statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub operation: String,
    pub latency_ms: f64,
    /// Served from cache (`true`) or from the store (`false`).
    pub from_cache: bool,
    pub captured_at: DateTime<Utc>,
}

/// Statistics derived from a set of samples.
///
/// Never stored: computed on demand by
/// [`MetricsCollector::summary`](super::MetricsCollector::summary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_samples: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Hit rate formatted to one decimal (`"87.5%"`), or `"0%"` with no samples.
    pub cache_hit_rate: String,
    pub cache_hit_rate_percent: f64,
    pub avg_latency_ms: f64,
    pub avg_cache_latency_ms: f64,
    pub avg_store_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
}

impl Default for MetricsSummary {
    fn default() -> Self {
        Self::empty()
    }
}

impl MetricsSummary {
    /// The all-zero summary of an empty sample set.
    pub fn empty() -> Self {
        Self {
            total_samples: 0,
            cache_hits: 0,
            cache_misses: 0,
            cache_hit_rate: "0%".to_string(),
            cache_hit_rate_percent: 0.0,
            avg_latency_ms: 0.0,
            avg_cache_latency_ms: 0.0,
            avg_store_latency_ms: 0.0,
            p50_latency_ms: 0.0,
            p95_latency_ms: 0.0,
            p99_latency_ms: 0.0,
        }
    }

    /// Summarize a set of samples.
    pub fn from_samples<'a>(samples: impl IntoIterator<Item = &'a MetricSample>) -> Self {
        let mut all = Vec::new();
        let mut cached = Vec::new();
        let mut stored = Vec::new();
        for sample in samples {
            all.push(sample.latency_ms);
            if sample.from_cache {
                cached.push(sample.latency_ms);
            } else {
                stored.push(sample.latency_ms);
            }
        }

        if all.is_empty() {
            return Self::empty();
        }

        all.sort_by(f64::total_cmp);
        let total = all.len();
        let hit_rate = cached.len() as f64 / total as f64 * 100.0;

        Self {
            total_samples: total,
            cache_hits: cached.len(),
            cache_misses: stored.len(),
            cache_hit_rate: format!("{hit_rate:.1}%"),
            cache_hit_rate_percent: round_to(hit_rate, 1),
            avg_latency_ms: average(&all),
            avg_cache_latency_ms: average(&cached),
            avg_store_latency_ms: average(&stored),
            p50_latency_ms: percentile(&all, 50.0),
            p95_latency_ms: percentile(&all, 95.0),
            p99_latency_ms: percentile(&all, 99.0),
        }
    }
}

/// Mean rounded to two decimals; `0` for an empty slice.
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    round_to(values.iter().sum::<f64>() / values.len() as f64, 2)
}

/// Nearest-rank percentile over ascending `sorted` values, rounded to two
/// decimals.
///
/// The index is `ceil(p/100 * n) - 1`, clamped to `[0, n-1]`. No
/// interpolation. `0` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let rank = (p * n as f64 / 100.0).ceil() as i64 - 1;
    let index = rank.clamp(0, n as i64 - 1) as usize;
    round_to(sorted[index], 2)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_rank_on_five_samples() {
        let sorted = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&sorted, 50.0), 30.0);
        assert_eq!(percentile(&sorted, 95.0), 50.0);
        assert_eq!(percentile(&sorted, 99.0), 50.0);
    }

    #[test]
    fn percentile_clamps_low_ranks() {
        let sorted = [7.0, 8.0];
        assert_eq!(percentile(&sorted, 0.0), 7.0);
        assert_eq!(percentile(&[4.0], 50.0), 4.0);
    }

    #[test]
    fn percentile_on_hundred_samples() {
        let sorted: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(percentile(&sorted, 50.0), 50.0);
        assert_eq!(percentile(&sorted, 95.0), 95.0);
        assert_eq!(percentile(&sorted, 99.0), 99.0);
    }

    #[test]
    fn empty_inputs_are_zero() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(percentile(&[], 95.0), 0.0);
    }

    #[test]
    fn average_rounds_to_cents() {
        assert_eq!(average(&[1.0, 2.0, 2.0]), 1.67);
    }
}
