//! Cache-aside accessor.
//!
//! [`CacheAside`] serves a value from cache when present, otherwise
//! computes it from the source of truth, caches it, and returns it. The
//! strategy is chosen once at startup:
//!
//! - [`CacheAside::Live`]: backed by a [`KeyValueCache`].
//! - [`CacheAside::PassThrough`]: no cache configured; every read goes
//!   to the store and invalidation is a no-op.
//!
//! Caching is strictly an optimization. A failed cache read is a miss, a
//! failed cache write is logged and the computed value is still returned.
//! Only errors from the compute closure itself reach the caller.
//!
//! # Cancellation
//!
//! On a miss, the compute closure and the cache write run on a spawned
//! task. If the caller's future is dropped mid-compute, the task still
//! finishes and populates the cache, so the work is not wasted.
//!
//! # Concurrent misses
//!
//! There is no single-flight deduplication: concurrent misses on the same
//! key each invoke their own compute closure.

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::keys::{CacheKey, Namespace, TtlTable};
use super::kv::KeyValueCache;
use crate::clock::elapsed_ms;
use crate::{GuardError, Result, telemetry};

/// A value together with how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    /// `true` when served from cache, `false` when computed.
    pub from_cache: bool,
    /// Wall time of the whole lookup, in milliseconds.
    pub latency_ms: f64,
}

/// Cache-aside strategy, selected once at startup.
#[derive(Clone)]
pub enum CacheAside {
    Live(KeyValueCache),
    PassThrough(TtlTable),
}

impl CacheAside {
    /// Cache-aside over a live key-value cache.
    pub fn live(cache: KeyValueCache) -> Self {
        CacheAside::Live(cache)
    }

    /// No caching. TTLs are still reported so call sites stay uniform.
    pub fn pass_through() -> Self {
        CacheAside::PassThrough(TtlTable::default())
    }

    /// Whether reads can be served from cache.
    pub fn is_enabled(&self) -> bool {
        matches!(self, CacheAside::Live(_))
    }

    /// TTL for a namespace.
    pub fn ttl_for(&self, namespace: Namespace) -> Duration {
        match self {
            CacheAside::Live(cache) => cache.ttl_for(namespace),
            CacheAside::PassThrough(ttl) => ttl.ttl(namespace),
        }
    }

    /// Serve `key` from cache, or run `compute` and cache its result.
    ///
    /// `compute` runs at most once and is never retried.
    pub async fn get_or_set<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<Fetched<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let start = Instant::now();

        let cache = match self {
            CacheAside::Live(cache) => cache,
            CacheAside::PassThrough(_) => {
                let value = compute().await?;
                return Ok(Fetched {
                    value,
                    from_cache: false,
                    latency_ms: elapsed_ms(start),
                });
            }
        };

        let namespace = key.namespace().as_str();
        if let Some(value) = cache.get::<T>(key).await {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "namespace" => namespace).increment(1);
            return Ok(Fetched {
                value,
                from_cache: true,
                latency_ms: elapsed_ms(start),
            });
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "namespace" => namespace).increment(1);

        let cache = cache.clone();
        let owned_key = key.clone();
        let task: JoinHandle<Result<T>> = tokio::spawn(async move {
            let value = compute().await?;
            cache.set(&owned_key, &value, ttl).await;
            Ok(value)
        });

        let value = join_compute(task).await?;
        Ok(Fetched {
            value,
            from_cache: false,
            latency_ms: elapsed_ms(start),
        })
    }

    /// Remove `key` after a mutation that could have made it stale.
    ///
    /// Returns `false` if the delete failed; the TTL still bounds staleness.
    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        match self {
            CacheAside::Live(cache) => {
                metrics::counter!(
                    telemetry::CACHE_INVALIDATIONS_TOTAL,
                    "namespace" => key.namespace().as_str()
                )
                .increment(1);
                let deleted = cache.delete(key).await;
                debug!(key = %key, deleted, "cache invalidated");
                deleted
            }
            CacheAside::PassThrough(_) => true,
        }
    }

    /// Invalidate several keys concurrently; returns `true` only if every
    /// delete succeeded.
    pub async fn invalidate_all(&self, keys: &[CacheKey]) -> bool {
        join_all(keys.iter().map(|key| self.invalidate(key)))
            .await
            .into_iter()
            .all(|deleted| deleted)
    }
}

async fn join_compute<T>(task: JoinHandle<Result<T>>) -> Result<T> {
    match task.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(GuardError::TaskFailed(e.to_string())),
    }
}
