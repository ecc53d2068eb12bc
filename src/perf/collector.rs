//! Bounded in-memory latency collector.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::time::Instant;
use tracing::info;

use super::baseline::{BaselineSnapshot, PerformanceComparison};
use super::report::MetricsReport;
use super::stats::{MetricSample, MetricsSummary};
use crate::clock::elapsed_ms;
use crate::telemetry;

/// Default number of retained samples.
pub const DEFAULT_CAPACITY: usize = 1_000;

/// Label used when a baseline is captured without one.
pub const DEFAULT_BASELINE_LABEL: &str = "Before Optimization";

/// Number of recent samples included in [`MetricsCollector::export`].
pub const EXPORT_RECENT_SAMPLES: usize = 50;

/// Ring buffer of [`MetricSample`]s plus at most one live baseline.
///
/// The sample buffer and the baseline have independent lifecycles:
/// [`clear`](Self::clear) empties samples and keeps the baseline, so one
/// baseline can be compared against several successive windows.
pub struct MetricsCollector {
    capacity: usize,
    samples: Mutex<VecDeque<MetricSample>>,
    baseline: Mutex<Option<BaselineSnapshot>>,
}

impl MetricsCollector {
    /// Collector retaining the last [`DEFAULT_CAPACITY`] samples.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Collector retaining the last `capacity` samples (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            baseline: Mutex::new(None),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a sample, evicting the oldest once full.
    ///
    /// Negative or NaN latencies are recorded as zero.
    pub fn record(&self, operation: impl Into<String>, latency_ms: f64, from_cache: bool) {
        let latency_ms = if latency_ms.is_finite() && latency_ms > 0.0 {
            latency_ms
        } else {
            0.0
        };
        let sample = MetricSample {
            operation: operation.into(),
            latency_ms,
            from_cache,
            captured_at: Utc::now(),
        };

        {
            let mut samples = self.samples();
            if samples.len() == self.capacity {
                samples.pop_front();
            }
            samples.push_back(sample);
        }

        let source = if from_cache { "cache" } else { "store" };
        metrics::histogram!(telemetry::OPERATION_DURATION_SECONDS, "source" => source)
            .record(latency_ms / 1000.0);
    }

    /// Await `fut`, recording its wall time under `operation`.
    pub async fn measure<F: Future>(
        &self,
        operation: impl Into<String>,
        from_cache: bool,
        fut: F,
    ) -> (F::Output, f64) {
        let start = Instant::now();
        let output = fut.await;
        let latency_ms = elapsed_ms(start);
        self.record(operation, latency_ms, from_cache);
        (output, latency_ms)
    }

    /// Summary over all retained samples.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary::from_samples(self.samples().iter())
    }

    /// Summary over the retained samples of one operation.
    pub fn operation_summary(&self, operation: &str) -> MetricsSummary {
        MetricsSummary::from_samples(self.samples().iter().filter(|s| s.operation == operation))
    }

    /// The last `min(n, len)` samples, most recent last.
    pub fn recent(&self, n: usize) -> Vec<MetricSample> {
        let samples = self.samples();
        let skip = samples.len().saturating_sub(n);
        samples.iter().skip(skip).cloned().collect()
    }

    /// Drop all samples. The baseline is kept.
    pub fn clear(&self) {
        self.samples().clear();
    }

    /// Freeze the current summary as the live baseline, replacing any
    /// previous one.
    pub fn capture_baseline(&self, label: impl Into<String>) -> BaselineSnapshot {
        let snapshot = BaselineSnapshot {
            summary: self.summary(),
            captured_at: Utc::now(),
            label: label.into(),
        };
        *self.baseline_slot() = Some(snapshot.clone());
        info!(
            label = %snapshot.label,
            samples = snapshot.summary.total_samples,
            "performance baseline captured"
        );
        snapshot
    }

    pub fn baseline(&self) -> Option<BaselineSnapshot> {
        self.baseline_slot().clone()
    }

    /// Install a baseline obtained elsewhere (e.g. restored from storage).
    pub fn set_baseline(&self, baseline: BaselineSnapshot) {
        *self.baseline_slot() = Some(baseline);
    }

    pub fn clear_baseline(&self) {
        *self.baseline_slot() = None;
    }

    /// Compare the current summary against the live baseline, if any.
    pub fn compare_with_baseline(&self) -> Option<PerformanceComparison> {
        let baseline = self.baseline()?;
        Some(PerformanceComparison::new(
            baseline,
            self.summary(),
            Utc::now(),
        ))
    }

    /// Everything the observability endpoint reports.
    pub fn export(&self) -> MetricsReport {
        MetricsReport {
            summary: self.summary(),
            recent_metrics: self.recent(EXPORT_RECENT_SAMPLES),
            baseline: self.baseline(),
            comparison: self.compare_with_baseline(),
            timestamp: Utc::now(),
        }
    }

    /// Emit the current summary to the log.
    pub fn log_summary(&self, label: &str) {
        let s = self.summary();
        info!(
            label,
            total = s.total_samples,
            cache_hits = s.cache_hits,
            cache_misses = s.cache_misses,
            hit_rate = %s.cache_hit_rate,
            avg_ms = s.avg_latency_ms,
            avg_cache_ms = s.avg_cache_latency_ms,
            avg_store_ms = s.avg_store_latency_ms,
            p50_ms = s.p50_latency_ms,
            p95_ms = s.p95_latency_ms,
            p99_ms = s.p99_latency_ms,
            "performance summary"
        );
    }

    fn samples(&self) -> MutexGuard<'_, VecDeque<MetricSample>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn baseline_slot(&self) -> MutexGuard<'_, Option<BaselineSnapshot>> {
        self.baseline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_latencies_clamp_to_zero() {
        let collector = MetricsCollector::with_capacity(4);
        collector.record("op", -3.0, false);
        collector.record("op", f64::NAN, false);
        let recent = collector.recent(2);
        assert!(recent.iter().all(|s| s.latency_ms == 0.0));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let collector = MetricsCollector::with_capacity(0);
        collector.record("a", 1.0, false);
        collector.record("b", 2.0, false);
        assert_eq!(collector.capacity(), 1);
        assert_eq!(collector.recent(10)[0].operation, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn measure_records_elapsed_time() {
        let collector = MetricsCollector::new();
        let (value, latency) = collector
            .measure("sleepy", false, async {
                tokio::time::sleep(std::time::Duration::from_millis(40)).await;
                7
            })
            .await;
        assert_eq!(value, 7);
        assert!(latency >= 40.0);
        assert_eq!(collector.len(), 1);
    }
}
