//! Backing store traits.
//!
//! The subsystem consumes three external collaborators:
//!
//! - [`KeyValueStore`]: the remote cache (`get` / `set` with TTL /
//!   `delete` / `ping`).
//! - [`WindowStore`]: sliding-window counters for the rate limiter. The
//!   check-and-increment must be atomic per key, the way a server-side
//!   script on a shared key-value store would run it.
//! - [`EntityStore`]: the relational source of truth, consulted on cache
//!   misses.
//!
//! # Failure semantics
//!
//! Implementations return [`GuardError::Backend`](crate::GuardError::Backend)
//! when the backing service is unreachable. Callers in this crate never
//! surface those errors: the cache degrades to a miss and the limiter
//! fails open. Implementations must not retry internally; timeouts are
//! the caller's policy.

pub mod memory;

pub use memory::{MemoryStore, MemoryStoreConfig};

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;
use crate::cache::Namespace;

// ============================================================================
// Remote cache
// ============================================================================

/// Byte-oriented key-value store with per-entry TTL.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Fetch the raw value for `key`.
    ///
    /// Returns `Ok(None)` when the key was never written or its TTL has
    /// elapsed; the two cases are indistinguishable.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Liveness probe used at startup to decide whether caching is enabled.
    async fn ping(&self) -> bool;
}

// ============================================================================
// Rate limiter counters
// ============================================================================

/// Outcome of a single sliding-window evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOutcome {
    /// Whether the request was admitted (and therefore recorded).
    pub admitted: bool,
    /// Requests inside the window after this evaluation.
    pub count: u32,
    /// Timestamp of the oldest request still inside the window.
    pub oldest_ms: Option<u64>,
}

/// Sliding-log counters keyed by an opaque string.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Evaluate one request at `now_ms` against the window
    /// `(now_ms - window_ms, now_ms]`.
    ///
    /// Admits iff fewer than `max_requests` requests are inside the
    /// window, and records the admitted request in the same atomic step.
    /// Rejected requests are not recorded.
    async fn hit(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
        max_requests: u32,
    ) -> Result<WindowOutcome>;

    /// Longest time an idle window log is kept, if bounded.
    ///
    /// A limiter refuses to start with a bucket window longer than this,
    /// since the log would be dropped while its requests still count.
    fn retention(&self) -> Option<Duration> {
        None
    }
}

// ============================================================================
// Source of truth
// ============================================================================

/// The persistent store the cache sits in front of.
///
/// `query` is an entity-specific lookup (usually an id). Values are
/// returned as JSON so the cache can store them without knowing the
/// entity schema.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn load(&self, kind: Namespace, query: &str) -> Result<Option<serde_json::Value>>;
}
