//! Bounded in-memory cache with per-entry expiry and LRU eviction.
//!
//! A read hit counts as use: it refreshes the entry's recency, so eviction
//! removes the entry whose most recent read (or write) is oldest, not the one
//! inserted first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use super::clock::{Clock, SystemClock};

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Utc>,
    ttl: Duration,
    last_accessed_at: DateTime<Utc>,
    /// Monotonic recency stamp; orders entries whose access times tie.
    last_touch: u64,
}

impl<V> CacheEntry<V> {
    /// Live iff `now < stored_at + ttl`.
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        match (now - self.stored_at).to_std() {
            Ok(elapsed) => elapsed < self.ttl,
            // Clock moved backwards: nothing has elapsed yet.
            Err(_) => !self.ttl.is_zero(),
        }
    }
}

#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    hits: u64,
    misses: u64,
    sequence: u64,
}

impl<V> CacheState<V> {
    fn next_touch(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before - self.entries.len()
    }

    fn evict_least_recently_used(&mut self) -> Option<String> {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.last_accessed_at, entry.last_touch))
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&victim);
        Some(victim)
    }
}

/// Cache statistics.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Bounded key/value store with expiry and least-recently-used eviction.
///
/// Thread-safe; every operation takes the internal lock for its whole
/// duration, so `set` and its eviction are one critical section. The store is
/// meant to be built once at startup and shared by `Arc` for the lifetime of
/// the process.
pub struct CacheStore<V> {
    state: Mutex<CacheState<V>>,
    capacity: usize,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> CacheStore<V> {
    /// Create a store that reads wall-clock time.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self::with_clock(capacity, default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
                sequence: 0,
            }),
            capacity,
            default_ttl,
            clock,
        }
    }

    /// Lock the state mutex, recovering from poison if necessary.
    fn lock_state(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Get a live value, refreshing its recency.
    ///
    /// Expired entries are treated as absent and removed on the spot.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut state = self.lock_state();

        let live = match state.entries.get(key).map(|entry| entry.is_live(now)) {
            Some(live) => live,
            None => {
                state.misses += 1;
                return None;
            }
        };

        if !live {
            state.entries.remove(key);
            state.misses += 1;
            debug!("Cache: '{}' expired, removed on read", key);
            return None;
        }

        let touch = state.next_touch();
        state.hits += 1;
        let entry = state.entries.get_mut(key)?;
        entry.last_accessed_at = now;
        entry.last_touch = touch;
        Some(entry.value.clone())
    }

    /// Insert or overwrite with the default TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert or overwrite with an explicit TTL.
    ///
    /// Inserting a new key into a full store first drops expired entries, then,
    /// if still full, evicts the least recently used entry.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        if self.capacity == 0 {
            return;
        }

        let key = key.into();
        let now = self.clock.now();
        let mut state = self.lock_state();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            let purged = state.purge_expired(now);
            if purged > 0 {
                debug!("Cache: purged {} expired entries to make room", purged);
            }
            while state.entries.len() >= self.capacity {
                match state.evict_least_recently_used() {
                    Some(evicted) => debug!("Cache: evicted '{}' (least recently used)", evicted),
                    None => break,
                }
            }
        }

        let touch = state.next_touch();
        state.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
                ttl,
                last_accessed_at: now,
                last_touch: touch,
            },
        );
    }

    /// Whether a live entry exists. Does not touch recency.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.lock_state()
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// True when there is no live entry for `key`, whether it expired or was
    /// never stored. Does not touch recency.
    pub fn is_expired(&self, key: &str) -> bool {
        !self.has(key)
    }

    /// Remove one entry. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.lock_state().entries.remove(key).is_some()
    }

    /// Remove every entry. Hit/miss counters are kept.
    pub fn clear(&self) {
        self.lock_state().entries.clear();
    }

    /// Remove every expired entry; returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        self.lock_state().purge_expired(now)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock_state();
        let reads = state.hits + state.misses;
        CacheStats {
            size: state.entries.len(),
            capacity: self.capacity,
            hits: state.hits,
            misses: state.misses,
            hit_rate: if reads == 0 {
                0.0
            } else {
                state.hits as f64 / reads as f64
            },
        }
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    const TTL: Duration = Duration::from_secs(60);

    fn store_with_clock(capacity: usize) -> (CacheStore<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = CacheStore::with_clock(capacity, TTL, clock.clone());
        (store, clock)
    }

    #[test]
    fn test_set_and_get() {
        let (store, _) = store_with_clock(4);
        store.set("research:lisbon", "guide".to_string());
        assert_eq!(store.get("research:lisbon").as_deref(), Some("guide"));
        assert_eq!(store.get("research:porto"), None);
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let (store, clock) = store_with_clock(3);
        for i in 0..20 {
            store.set(format!("k{}", i), i.to_string());
            clock.advance(Duration::from_millis(10));
            assert!(store.len() <= 3);
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let (store, _) = store_with_clock(2);
        store.set("a", "1".to_string());
        store.set("b", "2".to_string());
        store.set("a", "3".to_string());
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").as_deref(), Some("3"));
        assert_eq!(store.get("b").as_deref(), Some("2"));
    }

    #[test]
    fn test_expiry_boundary() {
        let (store, clock) = store_with_clock(4);
        store.set("k", "v".to_string());

        clock.advance(TTL - Duration::from_millis(1));
        assert!(store.has("k"));
        assert!(!store.is_expired("k"));
        assert_eq!(store.get("k").as_deref(), Some("v"));

        clock.advance(Duration::from_millis(1));
        assert!(!store.has("k"));
        assert!(store.is_expired("k"));
        assert_eq!(store.get("k"), None);
        // Lazily removed by the read above.
        assert_eq!(store.len(), 0);
        assert!(store.is_expired("k"));
    }

    #[test]
    fn test_custom_ttl() {
        let (store, clock) = store_with_clock(4);
        store.set_with_ttl("short", "v".to_string(), Duration::from_secs(5));
        store.set("long", "v".to_string());

        clock.advance(Duration::from_secs(5));
        assert_eq!(store.get("short"), None);
        assert!(store.get("long").is_some());
    }

    #[test]
    fn test_zero_ttl_is_never_live() {
        let (store, _) = store_with_clock(4);
        store.set_with_ttl("k", "v".to_string(), Duration::ZERO);
        assert!(!store.has("k"));
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_insertion_order_eviction_without_reads() {
        let (store, _) = store_with_clock(2);
        store.set("A", "a".to_string());
        store.set("B", "b".to_string());
        store.set("C", "c".to_string());

        assert!(!store.has("A"));
        assert!(store.has("B"));
        assert!(store.has("C"));
    }

    #[test]
    fn test_read_refreshes_recency() {
        let (store, _) = store_with_clock(2);
        store.set("A", "a".to_string());
        store.set("B", "b".to_string());
        store.set("C", "c".to_string());
        assert!(!store.has("A"));

        // B is older than C, but reading it makes C the least recently used.
        assert!(store.get("B").is_some());
        store.set("D", "d".to_string());

        assert!(store.has("B"));
        assert!(!store.has("C"));
        assert!(store.has("D"));
    }

    #[test]
    fn test_peeking_does_not_refresh_recency() {
        let (store, _) = store_with_clock(2);
        store.set("A", "a".to_string());
        store.set("B", "b".to_string());

        assert!(store.has("A"));
        assert!(!store.is_expired("A"));
        store.set("C", "c".to_string());

        assert!(!store.has("A"));
        assert!(store.has("B"));
    }

    #[test]
    fn test_recency_follows_clock_time() {
        let (store, clock) = store_with_clock(2);
        store.set("A", "a".to_string());
        clock.advance(Duration::from_secs(1));
        store.set("B", "b".to_string());
        clock.advance(Duration::from_secs(1));
        store.get("A");
        clock.advance(Duration::from_secs(1));
        store.set("C", "c".to_string());

        assert!(store.has("A"));
        assert!(!store.has("B"));
    }

    #[test]
    fn test_full_store_drops_expired_before_live_entries() {
        let (store, clock) = store_with_clock(2);
        store.set_with_ttl("stale", "x".to_string(), Duration::from_secs(1));
        store.set("fresh", "y".to_string());
        // Make the fresh entry the least recently used of the two.
        store.get("stale");
        clock.advance(Duration::from_secs(2));

        store.set("new", "z".to_string());
        assert!(store.has("fresh"));
        assert!(store.has("new"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_cleanup_expired() {
        let (store, clock) = store_with_clock(10);
        store.set_with_ttl("a", "1".to_string(), Duration::from_secs(10));
        store.set_with_ttl("b", "2".to_string(), Duration::from_secs(10));
        store.set_with_ttl("c", "3".to_string(), Duration::from_secs(100));

        clock.advance(Duration::from_secs(30));
        assert_eq!(store.cleanup_expired(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.cleanup_expired(), 0);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let (store, _) = store_with_clock(4);
        store.set("a", "1".to_string());
        store.set("b", "2".to_string());

        assert!(store.invalidate("a"));
        assert!(!store.invalidate("a"));
        assert!(!store.has("a"));
        assert!(store.has("b"));

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_stats_count_every_read() {
        let (store, clock) = store_with_clock(4);
        assert_eq!(store.stats().hit_rate, 0.0);

        store.set("a", "1".to_string());
        store.get("a");
        store.get("a");
        store.get("missing");
        clock.advance(TTL);
        store.get("a");

        let stats = store.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.capacity, 4);
        assert_eq!(stats.size, 0);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let (store, _) = store_with_clock(0);
        store.set("a", "1".to_string());
        assert!(store.is_empty());
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_concurrent_writers_respect_capacity() {
        let store = Arc::new(CacheStore::<usize>::new(8, TTL));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store.set(format!("{}-{}", t, i), i);
                        assert!(store.len() <= 8);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8);
    }
}
