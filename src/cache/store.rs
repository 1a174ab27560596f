//! Cache Store Module
//!
//! Single-threaded cache core: an ordered map of entries plus TTL and
//! capacity bookkeeping. Thread-safe caches wrap it in a mutex.
//!
//! The map is kept in eviction order, front first. For creation-order
//! caches only `set` reorders a key; for LRU caches a successful `get`
//! moves the key to the back as well.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use linked_hash_map::LinkedHashMap;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, Clock, Discipline};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Ordered cache storage with capacity-bound eviction and TTL support.
pub struct CacheStore<K, V> {
    /// Entries, front = next eviction candidate
    entries: LinkedHashMap<K, CacheEntry<V>>,
    /// Which operations reorder keys
    discipline: Discipline,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
}

impl<K, V> CacheStore<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates a new CacheStore.
    ///
    /// Fails with `InvalidCapacity` when `capacity` is zero.
    pub fn new(capacity: usize, discipline: Discipline) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }

        Ok(Self {
            entries: LinkedHashMap::new(),
            discipline,
            stats: CacheStats::new(),
            capacity,
        })
    }

    // == Set ==
    /// Stores a key-value pair expiring `ttl` after `now`.
    ///
    /// Overwriting an existing key never evicts; it replaces the value,
    /// restarts the TTL and moves the key to the back of the eviction order.
    /// Inserting a new key into a full store first evicts the front entry.
    ///
    /// Returns the evicted key, if any.
    pub fn set(&mut self, key: K, value: V, ttl: Duration, now: Instant) -> Option<K> {
        let mut evicted = None;

        if self.entries.remove(&key).is_none() && self.entries.len() >= self.capacity {
            if let Some((evicted_key, _)) = self.entries.pop_front() {
                self.stats.record_eviction();
                evicted = Some(evicted_key);
            }
        }

        self.entries.insert(key, CacheEntry::new(value, ttl, now));
        self.stats.set_total_entries(self.entries.len());

        if evicted.is_some() {
            debug!(
                discipline = %self.discipline,
                capacity = self.capacity,
                "Evicted entry to stay within capacity"
            );
        }
        evicted
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns the value if found and not expired. Expired entries are
    /// removed and counted as misses.
    pub fn get(&mut self, key: &K, now: Instant) -> Option<V> {
        if !self.live(key, now) {
            self.stats.record_miss();
            return None;
        }

        self.stats.record_hit();
        let entry = match self.discipline {
            Discipline::Lru => self.entries.get_refresh(key).map(|entry| &*entry),
            Discipline::CreationOrder => self.entries.get(key),
        };
        entry.map(|entry| entry.value.clone())
    }

    // == Has ==
    /// Same visibility rule as `get`, without reordering or counting.
    pub fn has(&mut self, key: &K, now: Instant) -> bool {
        self.live(key, now)
    }

    // == Delete ==
    /// Removes an entry by key, returning whether it was present.
    pub fn delete(&mut self, key: &K) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.set_total_entries(0);
    }

    // == Purge Expired ==
    /// Removes all entries expired at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let expired_keys: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
        }

        self.stats.record_expirations(expired_keys.len());
        self.stats.set_total_entries(self.entries.len());
        expired_keys.len()
    }

    // == Eviction Order ==
    /// Returns the stored keys, next eviction candidate first.
    pub fn keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }

    /// Returns the current number of stored entries, including expired
    /// entries that have not been reclaimed yet.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Whether `key` holds a live entry, dropping it if it has expired.
    fn live(&mut self, key: &K, now: Instant) -> bool {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };

        if expired {
            self.entries.remove(key);
            self.stats.record_expirations(1);
            self.stats.set_total_entries(self.entries.len());
        }
        !expired
    }
}

impl<K: Hash + Eq + fmt::Debug, V: fmt::Debug> fmt::Debug for CacheStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries)
            .field("discipline", &self.discipline)
            .field("stats", &self.stats)
            .field("capacity", &self.capacity)
            .finish()
    }
}

// == Locked Store ==
/// A `CacheStore` behind a mutex, reading time from a shared clock.
///
/// Every operation takes the lock once and never calls out to user code
/// while holding it.
pub(crate) struct LockedStore<K, V> {
    store: Mutex<CacheStore<K, V>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> LockedStore<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub(crate) fn new(capacity: usize, discipline: Discipline, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            store: Mutex::new(CacheStore::new(capacity, discipline)?),
            clock,
        })
    }

    fn lock(&self) -> MutexGuard<'_, CacheStore<K, V>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        self.lock().get(key, now)
    }

    pub(crate) fn set(&self, key: K, value: V, ttl: Duration) {
        let now = self.clock.now();
        self.lock().set(key, value, ttl, now);
    }

    pub(crate) fn has(&self, key: &K) -> bool {
        let now = self.clock.now();
        self.lock().has(key, now)
    }

    pub(crate) fn delete(&self, key: &K) -> bool {
        self.lock().delete(key)
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    pub(crate) fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.lock().purge_expired(now)
    }

    pub(crate) fn keys(&self) -> Vec<K> {
        self.lock().keys()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        self.lock().stats()
    }
}

impl<K: Hash + Eq + fmt::Debug, V: fmt::Debug> fmt::Debug for LockedStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedStore")
            .field("store", &self.store)
            .field("clock", &self.clock)
            .finish()
    }
}
