//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and two eviction
//! disciplines: creation-order ([`BoundedCache`]) and least-recently-used
//! ([`RecencyCache`]).

mod bounded;
mod clock;
mod entry;
mod recency;
mod stats;
mod store;


use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// Re-export public types
pub use bounded::BoundedCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use recency::RecencyCache;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// TTL applied when a caller does not pick one
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

// == Cache Trait ==
/// Key/value cache with per-entry TTL.
///
/// Lookups never block on I/O and never fail: a missing or expired key is
/// `None`. Implementations serialize all bookkeeping internally, so a cache
/// can be shared between tasks behind an `Arc`.
pub trait Cache<K, V>: Send + Sync {
    /// Returns the value for `key` if present and not expired.
    fn get(&self, key: &K) -> Option<V>;

    /// Stores `value` under `key` for `ttl` (`Duration::ZERO` never expires).
    fn set(&self, key: K, value: V, ttl: Duration);

    /// Same visibility rule as `get`, without returning the value.
    fn has(&self, key: &K) -> bool;

    /// Removes `key`, returning whether it was present.
    fn delete(&self, key: &K) -> bool;

    fn clear(&self);

    /// Number of stored entries, including expired entries not yet reclaimed.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    /// Removes every expired entry, returning how many were removed.
    fn purge_expired(&self) -> usize;

    fn stats(&self) -> CacheStats;
}

impl<K, V, C> Cache<K, V> for Arc<C>
where
    C: Cache<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn set(&self, key: K, value: V, ttl: Duration) {
        (**self).set(key, value, ttl)
    }

    fn has(&self, key: &K) -> bool {
        (**self).has(key)
    }

    fn delete(&self, key: &K) -> bool {
        (**self).delete(key)
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn purge_expired(&self) -> usize {
        (**self).purge_expired()
    }

    fn stats(&self) -> CacheStats {
        (**self).stats()
    }
}

// == Discipline ==
/// Eviction discipline applied when a full cache receives a new key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Discipline {
    /// Evict the entry that was stored (or last overwritten) earliest
    #[default]
    CreationOrder,
    /// Evict the entry that was read or written least recently
    Lru,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::CreationOrder => f.write_str("creation-order"),
            Discipline::Lru => f.write_str("lru"),
        }
    }
}

impl FromStr for Discipline {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "creation-order" => Ok(Discipline::CreationOrder),
            "lru" => Ok(Discipline::Lru),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown cache discipline '{}'",
                other
            ))),
        }
    }
}

// == Factory ==
/// Creates a cache of the given discipline on the system clock.
///
/// Fails fast with `InvalidCapacity` when `capacity` is zero.
pub fn new_cache<K, V>(discipline: Discipline, capacity: usize) -> Result<Arc<dyn Cache<K, V>>>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    new_cache_with_clock(discipline, capacity, Arc::new(SystemClock))
}

/// Creates a cache of the given discipline reading time from `clock`.
pub fn new_cache_with_clock<K, V>(
    discipline: Discipline,
    capacity: usize,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn Cache<K, V>>>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    let cache: Arc<dyn Cache<K, V>> = match discipline {
        Discipline::CreationOrder => Arc::new(BoundedCache::with_clock(capacity, clock)?),
        Discipline::Lru => Arc::new(RecencyCache::with_clock(capacity, clock)?),
    };
    Ok(cache)
}

/// Creates the cache described by `config`.
///
/// Creation-order caches built inside a tokio runtime also get a periodic
/// sweep when `config.sweep_interval` is non-zero.
pub fn build_cache<K, V>(config: &CacheConfig) -> Result<Arc<dyn Cache<K, V>>>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    match config.discipline {
        Discipline::Lru => new_cache(Discipline::Lru, config.capacity),
        Discipline::CreationOrder => {
            let cache = BoundedCache::new(config.capacity)?;
            match config.sweep_interval() {
                Some(interval) if tokio::runtime::Handle::try_current().is_ok() => {
                    cache.start_sweep(interval);
                }
                Some(_) => debug!("No tokio runtime available, periodic sweep not started"),
                None => {}
            }
            let cache: Arc<dyn Cache<K, V>> = Arc::new(cache);
            Ok(cache)
        }
    }
}
