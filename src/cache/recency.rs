//! Recency Cache Module
//!
//! Fixed-capacity cache with true LRU eviction: every successful `get` and
//! every `set` moves the key to the most-recently-used end, and a full cache
//! drops the least-recently-used key. Expiration is checked lazily on access.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::store::LockedStore;
use crate::cache::{Cache, CacheStats, Clock, Discipline, SystemClock};
use crate::error::Result;

// == Recency Cache ==
/// Least-recently-used cache.
pub struct RecencyCache<K, V> {
    store: LockedStore<K, V>,
}

impl<K, V> RecencyCache<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// Fails with `InvalidCapacity` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            store: LockedStore::new(capacity, Discipline::Lru, clock)?,
        })
    }

    /// Returns the stored keys, least recently used first.
    pub fn keys(&self) -> Vec<K> {
        self.store.keys()
    }
}

impl<K: Hash + Eq + fmt::Debug, V: fmt::Debug> fmt::Debug for RecencyCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecencyCache").field("store", &self.store).finish()
    }
}

impl<K, V> Cache<K, V> for RecencyCache<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        self.store.get(key)
    }

    fn set(&self, key: K, value: V, ttl: Duration) {
        self.store.set(key, value, ttl)
    }

    fn has(&self, key: &K) -> bool {
        self.store.has(key)
    }

    fn delete(&self, key: &K) -> bool {
        self.store.delete(key)
    }

    fn clear(&self) {
        self.store.clear()
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    fn capacity(&self) -> usize {
        self.store.capacity()
    }

    fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    fn stats(&self) -> CacheStats {
        self.store.stats()
    }
}
