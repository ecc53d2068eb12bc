//! Builder for configuring [`Guard`] instances

use std::sync::Arc;

use tracing::{info, warn};

use super::Guard;
use crate::cache::{CacheAside, KeyValueCache, TtlTable};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::perf::{DEFAULT_CAPACITY, MetricsCollector};
use crate::ratelimit::{LimiterConfig, RateLimiter, SlidingWindowLimiter};
use crate::store::{KeyValueStore, MemoryStore, MemoryStoreConfig, WindowStore};
use crate::{GuardError, Result};

/// In-process store requested by [`GuardBuilder::from_config`]. Created at
/// build time so it shares the builder's final clock.
struct ConfiguredMemory {
    config: MemoryStoreConfig,
    cache: bool,
    rate_limit: bool,
}

/// Builder for configuring guard instances.
///
/// Without a cache store the guard passes reads straight through; without
/// a window store the limiter fails open.
pub struct GuardBuilder {
    cache_store: Option<Arc<dyn KeyValueStore>>,
    window_store: Option<Arc<dyn WindowStore>>,
    ttl: TtlTable,
    limits: LimiterConfig,
    metrics_capacity: usize,
    metrics: Option<Arc<MetricsCollector>>,
    clock: Arc<dyn Clock>,
    configured_memory: Option<ConfiguredMemory>,
}

impl GuardBuilder {
    pub fn new() -> Self {
        Self {
            cache_store: None,
            window_store: None,
            ttl: TtlTable::default(),
            limits: LimiterConfig::default(),
            metrics_capacity: DEFAULT_CAPACITY,
            metrics: None,
            clock: Arc::new(SystemClock),
            configured_memory: None,
        }
    }

    /// Builder preconfigured from a loaded [`Config`], using an in-process
    /// [`MemoryStore`] for whichever of cache and rate limiting is enabled.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let mut builder = Self::new()
            .ttl(config.cache.ttl)
            .rate_limits(config.limiter_config()?)
            .metrics_capacity(config.metrics.capacity);

        if config.cache.enabled || config.rate_limit.enabled {
            builder.configured_memory = Some(ConfiguredMemory {
                config: config.memory_store_config()?,
                cache: config.cache.enabled,
                rate_limit: config.rate_limit.enabled,
            });
        }
        Ok(builder)
    }

    /// Back the cache with `store`.
    pub fn cache_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Back the rate limiter with `store`.
    pub fn window_store(mut self, store: Arc<dyn WindowStore>) -> Self {
        self.window_store = Some(store);
        self
    }

    /// Use one in-process store for both cache and rate limiting.
    pub fn memory_store(self, store: Arc<MemoryStore>) -> Self {
        self.cache_store(store.clone()).window_store(store)
    }

    /// Set the per-namespace TTLs.
    pub fn ttl(mut self, ttl: TtlTable) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the rate limit buckets.
    pub fn rate_limits(mut self, limits: LimiterConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Set how many samples the metrics collector retains.
    pub fn metrics_capacity(mut self, capacity: usize) -> Self {
        self.metrics_capacity = capacity;
        self
    }

    /// Share an existing collector instead of creating one.
    pub fn metrics_collector(mut self, collector: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(collector);
        self
    }

    /// Clock used by the rate limiter and by the store requested in
    /// [`from_config`](Self::from_config). May be set in any order.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the guard. Configuration errors are returned here, at
    /// startup, and never at request time.
    pub fn build(mut self) -> Result<Guard> {
        self.create_configured_memory();
        self.ttl.validate()?;
        self.limits.validate()?;
        if self.metrics_capacity == 0 && self.metrics.is_none() {
            return Err(GuardError::Configuration(
                "metrics capacity must be greater than zero".to_string(),
            ));
        }

        let cache = match self.cache_store {
            Some(store) => CacheAside::live(KeyValueCache::new(store, self.ttl)),
            None => CacheAside::PassThrough(self.ttl),
        };

        let limiter = match self.window_store {
            Some(store) => RateLimiter::sliding_window(SlidingWindowLimiter::with_clock(
                store,
                self.limits,
                self.clock,
            )?),
            None => RateLimiter::disabled(),
        };

        let metrics = self
            .metrics
            .unwrap_or_else(|| Arc::new(MetricsCollector::with_capacity(self.metrics_capacity)));

        let cache_mode = if cache.is_enabled() { "live" } else { "pass-through" };
        let limit_mode = if limiter.is_enabled() { "sliding-window" } else { "disabled" };
        info!(
            cache = cache_mode,
            rate_limit = limit_mode,
            metrics_capacity = metrics.capacity(),
            "guard initialized"
        );

        Ok(Guard {
            cache,
            limiter,
            metrics,
        })
    }

    /// Like [`build`](Self::build), but first pings the cache store and
    /// drops to pass-through if it does not answer.
    pub async fn build_checked(mut self) -> Result<Guard> {
        self.create_configured_memory();
        let reachable = match &self.cache_store {
            Some(store) => {
                let ok = store.ping().await;
                if !ok {
                    warn!(
                        backend = store.name(),
                        "cache backend unreachable, caching disabled"
                    );
                }
                ok
            }
            None => true,
        };
        if !reachable {
            self.cache_store = None;
        }
        self.build()
    }

    /// Explicitly set stores take precedence over the configured one.
    fn create_configured_memory(&mut self) {
        let Some(memory) = self.configured_memory.take() else {
            return;
        };
        let store = Arc::new(MemoryStore::with_clock(
            &memory.config,
            Arc::clone(&self.clock),
        ));
        if memory.cache && self.cache_store.is_none() {
            self.cache_store = Some(store.clone());
        }
        if memory.rate_limit && self.window_store.is_none() {
            self.window_store = Some(store);
        }
    }
}

impl Default for GuardBuilder {
    fn default() -> Self {
        Self::new()
    }
}
