//! Caching subsystem.
//!
//! Three layers, leaves first:
//!
//! - [`keys`]: [`Namespace`] prefixes, deterministic [`CacheKey`]s and
//!   the per-namespace [`TtlTable`].
//!
//! - [`KeyValueCache`]: JSON-typed get/set/delete over a
//!   [`KeyValueStore`](crate::store::KeyValueStore). Backend failures are
//!   logged and absorbed here.
//!
//! - [`CacheAside`]: the get-or-compute pattern on top of
//!   [`KeyValueCache`], reporting whether each read was a hit and how long
//!   it took. Selected once at startup as either live or pass-through.
//!
//! # Pagination policy
//!
//! Only the first page of a paginated list is cached
//! ([`CacheKey::page`] returns `None` for cursor pages), so a mutation
//! only has one list key to invalidate.

pub mod aside;
pub mod keys;
pub mod kv;

pub use aside::{CacheAside, Fetched};
pub use keys::{CacheKey, Namespace, TtlTable};
pub use kv::KeyValueCache;
