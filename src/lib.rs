//! chatguard - performance protection for chat request paths
//!
//! This crate provides the three pieces every read and write path of a
//! chat backend shares:
//!
//! - [`CacheAside`]: get-or-compute over a TTL key-value store, with
//!   explicit invalidation after writes.
//! - [`RateLimiter`]: independent sliding-window buckets per identifier,
//!   failing open when its store is unavailable.
//! - [`MetricsCollector`]: bounded latency samples with percentile
//!   summaries and before/after baseline comparison.
//!
//! They are composed only in [`Guard`], one instance per process.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chatguard::{CacheKey, Guard, MemoryStore};
//! use chatguard::ratelimit::Bucket;
//! use chatguard::guard::Throttle;
//!
//! #[tokio::main]
//! async fn main() -> chatguard::Result<()> {
//!     let guard = Guard::builder()
//!         .memory_store(Arc::new(MemoryStore::default()))
//!         .build()?;
//!
//!     // Read path: served from cache after the first call.
//!     let page: Vec<String> = guard
//!         .read("messages:first_page", &CacheKey::channel_messages("c1"), || async {
//!             Ok(vec!["hello".to_string()])
//!         })
//!         .await?;
//!
//!     // Write path: rate limited, then the first page is invalidated.
//!     guard
//!         .mutate(
//!             "messages:send",
//!             Some(Throttle::new(Bucket::Messages, "profile_1")),
//!             &[CacheKey::channel_messages("c1")],
//!             || async { Ok(()) },
//!         )
//!         .await?;
//!
//!     println!("{} messages, {}", page.len(), guard.metrics().summary().cache_hit_rate);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod perf;
pub mod ratelimit;
pub mod store;
pub mod telemetry;

// Re-export main types at crate root
pub use cache::{CacheAside, CacheKey, Fetched, KeyValueCache, Namespace, TtlTable};
pub use config::Config;
pub use error::{GuardError, Result};
pub use guard::{Guard, GuardBuilder};
pub use perf::{BaselineSnapshot, MetricsCollector, MetricsSummary, PerformanceComparison};
pub use ratelimit::{Bucket, RateLimitDecision, RateLimiter};
pub use store::{EntityStore, KeyValueStore, MemoryStore, WindowStore};
