//! The per-process protection context.
//!
//! [`Guard`] owns one [`CacheAside`], one [`RateLimiter`] and one shared
//! [`MetricsCollector`]. Build it once at startup with
//! [`Guard::builder()`] and hand an `Arc<Guard>` to every call site; it is
//! never recreated per request.
//!
//! Call sites go through the composed flows here, which fix the order of
//! operations:
//!
//! - reads: cache-aside lookup → record metric
//! - mutations: rate limit check → write → record metric → invalidate
//!
//! Invalidation after a successful write is always attempted, even when
//! the cache degraded to pass-through for earlier reads.

mod builder;

pub use builder::GuardBuilder;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::warn;

use crate::cache::{CacheAside, CacheKey, Namespace};
use crate::clock::elapsed_ms;
use crate::perf::{MetricsCollector, ObservabilityEndpoint, ReportConfig};
use crate::ratelimit::{Bucket, RateLimitDecision, RateLimiter};
use crate::store::EntityStore;
use crate::{GuardError, Result};

/// Rate limit attribution for a mutation.
#[derive(Debug, Clone, Copy)]
pub struct Throttle<'a> {
    pub bucket: Bucket,
    pub identifier: &'a str,
}

impl<'a> Throttle<'a> {
    pub fn new(bucket: Bucket, identifier: &'a str) -> Self {
        Self { bucket, identifier }
    }
}

/// Cache, limiter and metrics for one process.
pub struct Guard {
    cache: CacheAside,
    limiter: RateLimiter,
    metrics: Arc<MetricsCollector>,
}

impl Guard {
    /// Create a new builder.
    pub fn builder() -> GuardBuilder {
        GuardBuilder::new()
    }

    pub fn cache(&self) -> &CacheAside {
        &self.cache
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Observability endpoint over this guard's collector.
    pub fn observability(&self) -> ObservabilityEndpoint {
        ObservabilityEndpoint::new(
            Arc::clone(&self.metrics),
            ReportConfig {
                cache_configured: self.cache.is_enabled(),
                rate_limit_configured: self.limiter.is_enabled(),
            },
        )
    }

    /// Cached read of `key`, recorded under `operation`.
    ///
    /// Uses the TTL of the key's namespace. Store errors from `compute`
    /// propagate and are not recorded.
    pub async fn read<T, F, Fut>(&self, operation: &str, key: &CacheKey, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let ttl = self.cache.ttl_for(key.namespace());
        let fetched = self.cache.get_or_set(key, ttl, compute).await?;
        self.metrics
            .record(operation, fetched.latency_ms, fetched.from_cache);
        Ok(fetched.value)
    }

    /// Paginated read: the first page goes through the cache, cursor
    /// pages are always served live.
    pub async fn read_page<T, F, Fut>(
        &self,
        operation: &str,
        namespace: Namespace,
        id: &str,
        cursor: Option<&str>,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        match CacheKey::page(namespace, id, cursor) {
            Some(key) => self.read(operation, &key, compute).await,
            None => {
                let start = Instant::now();
                let value = compute().await?;
                self.metrics.record(operation, elapsed_ms(start), false);
                Ok(value)
            }
        }
    }

    /// Load one entity through the cache. `None` (not found) is never cached.
    pub async fn read_entity(
        &self,
        store: &Arc<dyn EntityStore>,
        kind: Namespace,
        id: &str,
    ) -> Result<Option<serde_json::Value>> {
        let key = CacheKey::entity(kind, id);
        let store = Arc::clone(store);
        let query = id.to_string();
        let operation = format!("{kind}:load");
        self.read(&operation, &key, move || async move {
            store.load(kind, &query).await
        })
        .await
    }

    /// Check the rate limit for `throttle` without doing any work.
    ///
    /// Returns the decision on admission, or [`GuardError::RateLimited`]
    /// carrying it on rejection.
    pub async fn admit(&self, throttle: Throttle<'_>) -> Result<RateLimitDecision> {
        let decision = self
            .limiter
            .check(throttle.bucket, throttle.identifier)
            .await;
        if decision.allowed {
            Ok(decision)
        } else {
            Err(GuardError::RateLimited {
                retry_after: decision.retry_after(self.limiter.now_ms()),
                decision,
            })
        }
    }

    /// Run a write: rate limit (if `throttle` is given) → `work` → record
    /// metric → invalidate `stale` keys.
    ///
    /// Nothing is invalidated if `work` fails.
    pub async fn mutate<T, F, Fut>(
        &self,
        operation: &str,
        throttle: Option<Throttle<'_>>,
        stale: &[CacheKey],
        work: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(throttle) = throttle {
            self.admit(throttle).await?;
        }

        let start = Instant::now();
        let value = work().await?;
        self.metrics.record(operation, elapsed_ms(start), false);

        if !self.cache.invalidate_all(stale).await {
            warn!(
                operation,
                keys = stale.len(),
                "cache invalidation incomplete, entries will expire by TTL"
            );
        }
        Ok(value)
    }
}
