//! Tests for `metrics` crate instrumentation.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use chatguard::ratelimit::SlidingWindowLimiter;
use chatguard::store::{WindowOutcome, WindowStore};
use chatguard::{
    Bucket, CacheAside, CacheKey, GuardError, KeyValueCache, KeyValueStore, MemoryStore,
    MetricsCollector, RateLimiter, Result, TtlTable, telemetry,
};

// ============================================================================
// Failing stores
// ============================================================================

struct DownStore;

#[async_trait]
impl KeyValueStore for DownStore {
    fn name(&self) -> &str {
        "down"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(GuardError::Backend("refused".into()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
        Err(GuardError::Backend("refused".into()))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(GuardError::Backend("refused".into()))
    }

    async fn ping(&self) -> bool {
        false
    }
}

#[async_trait]
impl WindowStore for DownStore {
    fn name(&self) -> &str {
        "down"
    }

    async fn hit(&self, _: &str, _: u64, _: u64, _: u32) -> Result<WindowOutcome> {
        Err(GuardError::Backend("refused".into()))
    }
}

// ============================================================================
// Snapshot helpers
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

/// Sum counter values matching a name and, optionally, one label.
fn counter_total(snapshot: &SnapshotVec, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| {
            label.is_none_or(|(k, v)| key.key().labels().any(|l| l.key() == k && l.value() == v))
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

/// Runs async code within a local recorder scope on the multi-thread runtime.
fn with_recorder<F: std::future::Future>(fut: F) -> (F::Output, SnapshotVec) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let output = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    });
    (output, snapshotter.snapshot().into_vec())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_hits_and_misses_are_counted() {
    let ((), snapshot) = with_recorder(async {
        let cache = CacheAside::live(KeyValueCache::new(
            Arc::new(MemoryStore::default()),
            TtlTable::default(),
        ));
        let key = CacheKey::profile("u1");
        for _ in 0..3 {
            cache
                .get_or_set(&key, Duration::from_secs(60), || async { Ok(1u32) })
                .await
                .unwrap();
        }
    });

    assert_eq!(
        counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL, Some(("namespace", "profile"))),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL, None), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn backend_errors_are_counted() {
    let ((), snapshot) = with_recorder(async {
        let cache = KeyValueCache::new(Arc::new(DownStore), TtlTable::default());
        let key = CacheKey::server("s1");
        assert!(cache.get::<u32>(&key).await.is_none());
        assert!(!cache.delete(&key).await);
    });

    assert_eq!(
        counter_total(&snapshot, telemetry::CACHE_BACKEND_ERRORS_TOTAL, Some(("operation", "get"))),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_BACKEND_ERRORS_TOTAL, None), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn rate_limit_outcomes_are_counted() {
    let ((), snapshot) = with_recorder(async {
        let limiter = RateLimiter::sliding_window(
            SlidingWindowLimiter::new(Arc::new(MemoryStore::default()), Default::default())
                .unwrap(),
        );
        for _ in 0..7 {
            limiter.check(Bucket::ServerCreate, "u1").await;
        }

        let down = RateLimiter::sliding_window(
            SlidingWindowLimiter::new(Arc::new(DownStore), Default::default()).unwrap(),
        );
        down.check(Bucket::Api, "u1").await;
    });

    let name = telemetry::RATE_LIMIT_DECISIONS_TOTAL;
    assert_eq!(counter_total(&snapshot, name, Some(("outcome", "allowed"))), 5);
    assert_eq!(counter_total(&snapshot, name, Some(("outcome", "rejected"))), 2);
    assert_eq!(counter_total(&snapshot, name, Some(("outcome", "fail_open"))), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn recorded_samples_emit_histogram() {
    let ((), snapshot) = with_recorder(async {
        MetricsCollector::new().record("op", 12.0, true);
    });
    assert!(has_histogram(&snapshot, telemetry::OPERATION_DURATION_SECONDS));
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let collector = MetricsCollector::new();
    collector.record("op", 1.0, false);
    RateLimiter::disabled().check(Bucket::Api, "u1").await;
}
