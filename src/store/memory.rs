//! In-process backing store.
//!
//! [`MemoryStore`] implements both [`KeyValueStore`] and [`WindowStore`]
//! on top of moka's bounded caches, so a single-process deployment (and
//! every test) gets the same semantics a shared remote store would give.
//!
//! Expiry is evaluated against an injected [`Clock`] rather than moka's
//! own timer, which lets tests step time explicitly. Moka still bounds
//! memory: entries past `max_entries` are evicted LRU-style, and idle
//! window logs are dropped after `window_idle`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;

use super::{KeyValueStore, WindowOutcome, WindowStore};
use crate::Result;
use crate::clock::{Clock, SystemClock};

/// Configuration for [`MemoryStore`].
///
/// ```rust
/// # use chatguard::store::MemoryStoreConfig;
/// # use std::time::Duration;
/// let config = MemoryStoreConfig::new()
///     .max_entries(50_000)
///     .window_idle(Duration::from_secs(7200));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Maximum cached values. Default: 10,000.
    pub max_entries: u64,
    /// Maximum tracked rate limit identifiers. Default: 100,000.
    pub max_windows: u64,
    /// Drop a window log after this long without a hit. Must be at least
    /// the longest bucket window. Default: 1 hour.
    pub window_idle: Duration,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_windows: 100_000,
            window_idle: Duration::from_secs(3600),
        }
    }
}

impl MemoryStoreConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached values.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the maximum number of tracked window logs.
    pub fn max_windows(mut self, n: u64) -> Self {
        self.max_windows = n;
        self
    }

    /// Set the idle timeout for window logs.
    pub fn window_idle(mut self, idle: Duration) -> Self {
        self.window_idle = idle;
        self
    }
}

#[derive(Clone)]
struct StoredValue {
    bytes: Arc<Vec<u8>>,
    expires_at_ms: u64,
}

type WindowLog = Arc<Mutex<VecDeque<u64>>>;

/// Moka-backed key-value and window store.
pub struct MemoryStore {
    entries: Cache<String, StoredValue>,
    windows: Cache<String, WindowLog>,
    window_idle: Duration,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create a store on the system clock.
    pub fn new(config: &MemoryStoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store that evaluates expiry against `clock`.
    pub fn with_clock(config: &MemoryStoreConfig, clock: Arc<dyn Clock>) -> Self {
        let entries = Cache::builder().max_capacity(config.max_entries).build();
        let windows = Cache::builder()
            .max_capacity(config.max_windows)
            .time_to_idle(config.window_idle)
            .build();
        Self {
            entries,
            windows,
            window_idle: config.window_idle,
            clock,
        }
    }

    /// Number of stored values, including ones whose TTL has elapsed but
    /// which have not been read since.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Whether the store holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(&MemoryStoreConfig::default())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(stored) = self.entries.get(key) else {
            return Ok(None);
        };
        if self.clock.now_ms() >= stored.expires_at_ms {
            self.entries.invalidate(key);
            return Ok(None);
        }
        Ok(Some(stored.bytes.as_ref().clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let expires_at_ms = self
            .clock
            .now_ms()
            .saturating_add(ttl.as_millis() as u64);
        self.entries.insert(
            key.to_string(),
            StoredValue {
                bytes: Arc::new(value),
                expires_at_ms,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.invalidate(key);
        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[async_trait]
impl WindowStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn hit(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
        max_requests: u32,
    ) -> Result<WindowOutcome> {
        let log = self
            .windows
            .get_with(key.to_string(), || Arc::new(Mutex::new(VecDeque::new())));
        let mut log = log.lock().unwrap_or_else(PoisonError::into_inner);

        let window_start = now_ms.saturating_sub(window_ms);
        while log.front().is_some_and(|&t| t <= window_start) {
            log.pop_front();
        }

        let admitted = (log.len() as u64) < u64::from(max_requests);
        if admitted {
            log.push_back(now_ms);
        }

        Ok(WindowOutcome {
            admitted,
            count: log.len() as u32,
            oldest_ms: log.front().copied(),
        })
    }

    fn retention(&self) -> Option<Duration> {
        Some(self.window_idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store_at(start_ms: u64) -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start_ms));
        let store = MemoryStore::with_clock(&MemoryStoreConfig::default(), clock.clone());
        (store, clock)
    }

    #[tokio::test]
    async fn value_expires_exactly_at_ttl() {
        let (store, clock) = store_at(0);
        store
            .set("k", b"v".to_vec(), Duration::from_secs(10))
            .await
            .unwrap();

        clock.set(9_999);
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));

        clock.set(10_000);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwrite_resets_ttl() {
        let (store, clock) = store_at(0);
        store
            .set("k", b"a".to_vec(), Duration::from_secs(5))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(4));
        store
            .set("k", b"b".to_vec(), Duration::from_secs(5))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(4));
        assert_eq!(store.get("k").await.unwrap(), Some(b"b".to_vec()));
    }

    #[tokio::test]
    async fn window_drops_requests_older_than_window() {
        let (store, _clock) = store_at(0);
        let a = store.hit("w", 1_000, 10_000, 2).await.unwrap();
        let b = store.hit("w", 2_000, 10_000, 2).await.unwrap();
        let c = store.hit("w", 3_000, 10_000, 2).await.unwrap();
        assert!(a.admitted && b.admitted);
        assert!(!c.admitted);
        assert_eq!(c.count, 2);
        assert_eq!(c.oldest_ms, Some(1_000));

        // 1_000 falls out once now - window reaches it
        let d = store.hit("w", 11_000, 10_000, 2).await.unwrap();
        assert!(d.admitted);
        assert_eq!(d.oldest_ms, Some(2_000));
    }

    #[tokio::test]
    async fn zero_max_never_admits() {
        let (store, _clock) = store_at(0);
        let outcome = store.hit("w", 5, 1_000, 0).await.unwrap();
        assert!(!outcome.admitted);
        assert_eq!(outcome.count, 0);
        assert_eq!(outcome.oldest_ms, None);
    }
}
