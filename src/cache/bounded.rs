//! Bounded Cache Module
//!
//! Fixed-capacity cache that evicts in creation order: when a new key does
//! not fit, the entry stored earliest goes first. Overwriting a key counts
//! as creating it again. Reads never change the eviction order.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::store::LockedStore;
use crate::cache::{Cache, CacheStats, Clock, Discipline, SystemClock};
use crate::error::Result;
use crate::tasks::{spawn_sweep_task, Sweep};

// == Bounded Cache ==
/// Creation-order cache with an optional periodic expiration sweep.
pub struct BoundedCache<K, V> {
    store: Arc<LockedStore<K, V>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> BoundedCache<K, V>
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
            store: Arc::new(LockedStore::new(capacity, Discipline::CreationOrder, clock)?),
            sweeper: Mutex::new(None),
        })
    }

    // == Sweep ==
    /// Starts removing expired entries every `interval`.
    ///
    /// Replaces any sweep already running. Must be called from within a
    /// tokio runtime.
    pub fn start_sweep(&self, interval: Duration) {
        let handle = spawn_sweep_task(Arc::downgrade(&self.store), interval);
        let previous = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);

        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Whether a periodic sweep is currently running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // == Destroy ==
    /// Stops the periodic sweep, if any. The entries stay usable.
    pub fn destroy(&self) {
        if let Some(handle) = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
            debug!("Stopped expiration sweep");
        }
    }

    /// Returns the stored keys, next eviction candidate first.
    pub fn keys(&self) -> Vec<K> {
        self.store.keys()
    }
}

impl<K: Hash + Eq + fmt::Debug, V: fmt::Debug> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("store", &self.store)
            .field("sweeper", &self.sweeper)
            .finish()
    }
}

impl<K, V> Drop for BoundedCache<K, V> {
    fn drop(&mut self) {
        let sweeper = self
            .sweeper
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = sweeper.take() {
            handle.abort();
        }
    }
}

impl<K, V> Sweep for LockedStore<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    fn sweep_expired(&self) -> usize {
        self.purge_expired()
    }
}

impl<K, V> Cache<K, V> for BoundedCache<K, V>
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
