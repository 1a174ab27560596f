//! Cache Warmer
//!
//! Pre-populates a cache for a known list of keys, fetching a bounded number
//! of keys at a time. Each key fails on its own: a failed fetch is logged and
//! the key is left unpopulated, while the rest of the batch and all later
//! batches carry on.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::{Cache, DEFAULT_TTL};
use crate::config::CacheConfig;

/// Keys fetched concurrently unless configured otherwise
pub const DEFAULT_WARM_CONCURRENCY: usize = 5;

// == Warm Options ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmOptions {
    /// Batch size; 0 is treated as 1
    pub concurrency: usize,
    /// TTL of every warmed entry
    pub ttl: Duration,
}

impl WarmOptions {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            concurrency: config.warm_concurrency,
            ttl: config.default_ttl(),
        }
    }
}

impl Default for WarmOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_WARM_CONCURRENCY,
            ttl: DEFAULT_TTL,
        }
    }
}

// == Warm ==
/// Fetches every key in `keys` and stores the results in `cache`.
///
/// Keys are processed in batches of `options.concurrency`; the fetches of
/// one batch run concurrently and the next batch starts once all of them
/// have finished. Best effort: nothing is returned, failures are only
/// logged. Callers needing per-key outcomes should record them inside
/// `fetch`.
pub async fn warm<K, V, E, C, I, F, Fut>(keys: I, fetch: F, cache: &C, options: &WarmOptions)
where
    I: IntoIterator<Item = K>,
    K: Clone + Debug,
    E: Display,
    C: Cache<K, V> + ?Sized,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    let keys: Vec<K> = keys.into_iter().collect();
    let batch_size = options.concurrency.max(1);
    let fetch = &fetch;
    let mut populated = 0usize;
    let mut failed = 0usize;

    for (index, batch) in keys.chunks(batch_size).enumerate() {
        let fetches = batch
            .iter()
            .map(|key| async move { (key, fetch(key.clone()).await) });

        for (key, result) in join_all(fetches).await {
            match result {
                Ok(value) => {
                    cache.set(key.clone(), value, options.ttl);
                    populated += 1;
                }
                Err(e) => {
                    warn!(key = ?key, error = %e, "Failed to warm cache key");
                    failed += 1;
                }
            }
        }

        debug!(batch = index, size = batch.len(), "Warmed batch");
    }

    info!(
        "Cache warming finished: {} populated, {} failed",
        populated, failed
    );
}
