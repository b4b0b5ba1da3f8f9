//! In-memory caching.
//!
//! - [`CacheStore`]: bounded key/value store with per-entry TTL and LRU eviction
//! - [`Clock`]: time source, swappable for a [`ManualClock`] in tests
//!
//! The store never runs timers of its own. Periodic sweeping is done by the
//! process that owns the store, calling [`CacheStore::cleanup_expired`].

mod clock;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{CacheStats, CacheStore};
