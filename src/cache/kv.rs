//! Typed access to the remote key-value store.
//!
//! [`KeyValueCache`] serializes values as JSON and absorbs every backend
//! failure: reads degrade to `None`, writes and deletes report `false`.
//! Each failure is logged and counted under
//! [`CACHE_BACKEND_ERRORS_TOTAL`](crate::telemetry::CACHE_BACKEND_ERRORS_TOTAL).
//!
//! A value that serializes to JSON `null` (e.g. a `None` lookup result)
//! is never written, so "not found" is not cached.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::keys::{CacheKey, Namespace, TtlTable};
use crate::store::KeyValueStore;
use crate::{GuardError, Result, telemetry};

const JSON_NULL: &[u8] = b"null";

/// JSON-typed cache over a [`KeyValueStore`].
#[derive(Clone)]
pub struct KeyValueCache {
    store: Arc<dyn KeyValueStore>,
    ttl: TtlTable,
}

impl KeyValueCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: TtlTable) -> Self {
        Self { store, ttl }
    }

    /// Name of the underlying backend.
    pub fn backend(&self) -> &str {
        self.store.name()
    }

    /// The TTL table this cache was configured with.
    pub fn ttl_table(&self) -> &TtlTable {
        &self.ttl
    }

    /// TTL for a namespace.
    pub fn ttl_for(&self, namespace: Namespace) -> Duration {
        self.ttl.ttl(namespace)
    }

    /// Read and decode a value, surfacing backend and decode errors.
    pub async fn try_get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>> {
        match self.store.get(key.as_str()).await? {
            None => Ok(None),
            Some(bytes) if bytes == JSON_NULL => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }

    /// Read a value; any failure is logged and treated as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, backend = self.backend(), error = %e, "cache get failed");
                metrics::counter!(telemetry::CACHE_BACKEND_ERRORS_TOTAL, "operation" => "get")
                    .increment(1);
                None
            }
        }
    }

    /// Encode and write a value, surfacing errors.
    pub async fn try_set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        if bytes == JSON_NULL {
            debug!(key = %key, "skipping cache write for null value");
            return Ok(());
        }
        self.store.set(key.as_str(), bytes, ttl).await
    }

    /// Write a value; returns `false` (after logging) on failure.
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) -> bool {
        match self.try_set(key, value, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, backend = self.backend(), error = %e, "cache set failed");
                metrics::counter!(telemetry::CACHE_BACKEND_ERRORS_TOTAL, "operation" => "set")
                    .increment(1);
                false
            }
        }
    }

    /// Delete a key; returns `false` (after logging) on failure.
    pub async fn delete(&self, key: &CacheKey) -> bool {
        match self.store.delete(key.as_str()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, backend = self.backend(), error = %e, "cache delete failed");
                metrics::counter!(telemetry::CACHE_BACKEND_ERRORS_TOTAL, "operation" => "delete")
                    .increment(1);
                false
            }
        }
    }

    /// Probe the backend.
    pub async fn ping(&self) -> bool {
        self.store.ping().await
    }

    /// Probe the backend, converting a failed ping into an error.
    pub async fn ensure_reachable(&self) -> Result<()> {
        if self.ping().await {
            Ok(())
        } else {
            Err(GuardError::Backend(format!(
                "cache backend '{}' did not answer ping",
                self.backend()
            )))
        }
    }
}
