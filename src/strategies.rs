//! Consistency Strategies
//!
//! Cache-aside, write-through and write-behind expressed over any [`Cache`]
//! plus a caller-owned async function that talks to the backing store.
//! None of these own a cache; they only call `get`/`set` on the one passed in.
//!
//! | Strategy        | Cache updated | Store updated           | Store failure           |
//! |-----------------|---------------|-------------------------|-------------------------|
//! | cache-aside     | on miss       | never (read path)       | returned to caller      |
//! | write-through   | before store  | awaited                 | returned to caller      |
//! | write-behind    | immediately   | spawned, not awaited    | logged and handed to the returned task handle |

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::cache::{Cache, DEFAULT_TTL};
use crate::memo::{FlightResult, SingleFlight};

// == Strategy Options ==
/// Settings shared by all consistency strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyOptions {
    /// TTL of the cache entry written by the strategy
    pub ttl: Duration,
}

impl StrategyOptions {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl }
    }
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

// == Cache Aside ==
/// Returns the cached value for `key`, or fetches, caches and returns it.
///
/// Concurrent misses on the same key each run `fetch`; use
/// [`cache_aside_single_flight`] when that matters. A fetch failure is
/// returned unchanged and nothing is cached.
pub async fn cache_aside<K, V, E, C, F, Fut>(
    cache: &C,
    key: K,
    fetch: F,
    options: &StrategyOptions,
) -> Result<V, E>
where
    C: Cache<K, V> + ?Sized,
    V: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    if let Some(value) = cache.get(&key) {
        return Ok(value);
    }

    let value = fetch().await?;
    cache.set(key, value.clone(), options.ttl);
    Ok(value)
}

/// Cache-aside with concurrent misses on one key collapsed into a single
/// fetch through `flights`.
///
/// All callers sharing a fetch observe the same value or the same error.
pub async fn cache_aside_single_flight<K, V, E, C, F, Fut>(
    cache: &Arc<C>,
    flights: &SingleFlight<K, V, E>,
    key: K,
    fetch: F,
    options: &StrategyOptions,
) -> FlightResult<V, E>
where
    K: std::hash::Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
    C: Cache<K, V> + ?Sized + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    let store = Arc::clone(cache);
    let stored_key = key.clone();
    let ttl = options.ttl;

    let flight = flights.join(
        key.clone(),
        || cache.get(&key),
        fetch,
        move |value: &V| store.set(stored_key, value.clone(), ttl),
    );
    flight.await
}

// == Write Through ==
/// Writes `value` to the cache, then persists it and waits for the store.
///
/// Both steps are always attempted. If persisting fails the error is
/// returned, but the cache already holds `value`: the cache may be ahead of
/// the store and reconciling is up to the caller.
pub async fn write_through<K, V, E, C, P, Fut>(
    cache: &C,
    key: K,
    value: V,
    persist: P,
    options: &StrategyOptions,
) -> Result<(), E>
where
    C: Cache<K, V> + ?Sized,
    V: Clone,
    E: Display,
    P: FnOnce(V) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    cache.set(key, value.clone(), options.ttl);

    persist(value).await.map_err(|e| {
        warn!(error = %e, "Write-through persistence failed, cache is ahead of the store");
        e
    })
}

// == Write Behind ==
/// Writes `value` to the cache and persists it in a background task.
///
/// Returns as soon as the cache holds `value`. A persistence failure is never
/// returned to this caller: it is logged and becomes the output of the
/// returned handle, which callers may await or drop. There is no retry, so a
/// crash before the task finishes loses the write.
///
/// Must be called from within a tokio runtime.
pub fn write_behind<K, V, E, C, P, Fut>(
    cache: &C,
    key: K,
    value: V,
    persist: P,
    options: &StrategyOptions,
) -> JoinHandle<Result<(), E>>
where
    C: Cache<K, V> + ?Sized,
    V: Clone + Send + 'static,
    E: Display + Send + 'static,
    P: FnOnce(V) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
{
    cache.set(key, value.clone(), options.ttl);

    tokio::spawn(async move {
        let result = persist(value).await;
        if let Err(e) = &result {
            error!(error = %e, "Write-behind persistence failed, cached value was not stored");
        }
        result
    })
}
