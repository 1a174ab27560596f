//! Asynchronous Memoizer
//!
//! Caches the resolved value of a future-returning function and, while a
//! computation for a key is still running, hands every new caller with that
//! key the same shared computation. For N concurrent callers arriving before
//! the first resolves, the wrapped function runs at most once and all N
//! observe the same value or the same failure.
//!
//! A computation is joined for as long as it runs, even past the memo TTL;
//! the TTL starts when the value is stored. Failures are never cached: once
//! a computation fails, its pending record is dropped and the next call
//! starts over.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, CacheStats};
use crate::error::{CacheError, Result};
use crate::memo::{KeyFn, MemoOptions, SingleFlight};

// == Memo Error ==
/// Failure of a memoized asynchronous call.
#[derive(Debug)]
pub enum MemoError<E> {
    /// No key could be derived from the arguments; nothing was run
    Key(CacheError),
    /// The wrapped computation failed; every waiter sees the same error
    Computation(Arc<E>),
}

impl<E> MemoError<E> {
    /// The computation's error, if that is what failed.
    pub fn computation(&self) -> Option<&E> {
        match self {
            MemoError::Computation(e) => Some(e),
            MemoError::Key(_) => None,
        }
    }
}

impl<E> From<CacheError> for MemoError<E> {
    fn from(e: CacheError) -> Self {
        MemoError::Key(e)
    }
}

impl<E: fmt::Display> fmt::Display for MemoError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoError::Key(e) => write!(f, "{}", e),
            MemoError::Computation(e) => write!(f, "Memoized computation failed: {}", e),
        }
    }
}

impl<E> Error for MemoError<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MemoError::Key(e) => Some(e),
            MemoError::Computation(e) => Some(e.as_ref()),
        }
    }
}

// == Async Memoized ==
/// A future-returning function wrapped with a private result cache and a
/// single-flight registry.
pub struct AsyncMemoized<A, V, E, F> {
    func: Arc<F>,
    cache: Arc<dyn Cache<String, V>>,
    flights: SingleFlight<String, V, E>,
    key_fn: KeyFn<A>,
    ttl: Duration,
}

/// Wraps `func` so each distinct argument key runs it at most once per TTL
/// window, even under concurrent calls.
///
/// Fails with `InvalidCapacity` when `options.capacity` is zero.
pub fn memoize_async<A, V, E, F, Fut>(
    func: F,
    options: MemoOptions<A>,
) -> Result<AsyncMemoized<A, V, E, F>>
where
    A: Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
{
    Ok(AsyncMemoized {
        cache: options.private_cache()?,
        flights: SingleFlight::new(),
        func: Arc::new(func),
        key_fn: options.key_fn,
        ttl: options.ttl,
    })
}

impl<A, V, E, F, Fut> AsyncMemoized<A, V, E, F>
where
    A: Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
{
    /// Returns the cached value for `args`, joins the running computation
    /// for the same key, or starts one.
    pub async fn call(&self, args: A) -> std::result::Result<V, MemoError<E>> {
        let key = (self.key_fn)(&args)?;
        let func = Arc::clone(&self.func);
        let cache = Arc::clone(&self.cache);
        let ttl = self.ttl;
        let stored_key = key.clone();

        let flight = self.flights.join(
            key.clone(),
            || self.cache.get(&key),
            move || func(args),
            move |value: &V| cache.set(stored_key, value.clone(), ttl),
        );

        flight.await.map_err(MemoError::Computation)
    }

    /// Drops the cached value for `args`. A computation already running is
    /// not affected.
    pub fn invalidate(&self, args: &A) -> Result<bool> {
        let key = (self.key_fn)(args)?;
        Ok(self.cache.delete(&key))
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Number of cached values.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Number of computations still running.
    pub fn in_flight(&self) -> usize {
        self.flights.in_flight()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn(u32) -> futures::future::BoxFuture<'static, std::result::Result<usize, String>>
           + Send
           + Sync
           + 'static {
        use futures::FutureExt;
        move |_x: u32| {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(n)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_execution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memo = memoize_async(counting(calls.clone()), MemoOptions::default()).unwrap();

        let results = join_all((0..10).map(|_| memo.call(1))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap(), 1);
        }
        assert_eq!(memo.in_flight(), 0);
        assert_eq!(memo.len(), 1);
    }

    #[tokio::test]
    async fn test_resolved_value_served_until_ttl() {
        let clock = Arc::new(ManualClock::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let memo = memoize_async(
            counting(calls.clone()),
            MemoOptions::default()
                .ttl(Duration::from_secs(5))
                .clock(clock.clone()),
        )
        .unwrap();

        assert_eq!(memo.call(1).await.unwrap(), 1);
        assert_eq!(memo.call(1).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(5));
        assert_eq!(memo.call(1).await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_computation_slower_than_ttl_is_joined() {
        let clock = Arc::new(ManualClock::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let memo = memoize_async(
            move |_x: u32| {
                let counter = counter.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst) + 1)
                }
            },
            MemoOptions::default()
                .ttl(Duration::from_secs(1))
                .clock(clock.clone()),
        )
        .unwrap();

        let mut first = Box::pin(memo.call(1));
        assert!(futures::poll!(first.as_mut()).is_pending());
        clock.advance(Duration::from_millis(1500));
        let second = memo.call(1);

        let (a, b) = futures::join!(first, second);
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_run_independently() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memo = memoize_async(counting(calls.clone()), MemoOptions::default()).unwrap();

        let (a, b) = futures::join!(memo.call(1), memo.call(2));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_ne!(a.unwrap(), b.unwrap());
    }

    #[tokio::test]
    async fn test_failure_is_shared_but_not_cached() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let flaky = memoize_async(
            move |_: ()| {
                let counter = counter.clone();
                async move {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    if attempt == 0 {
                        Err(format!("attempt {} failed", attempt))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            MemoOptions::default(),
        )
        .unwrap();

        let (first, second) = futures::join!(flaky.call(()), flaky.call(()));
        let first = first.unwrap_err();
        let second = second.unwrap_err();
        assert_eq!(first.computation().map(String::as_str), Some("attempt 0 failed"));
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(flaky.in_flight(), 0);
        assert!(flaky.is_empty());

        assert_eq!(flaky.call(()).await.unwrap(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memo = memoize_async(counting(calls.clone()), MemoOptions::default()).unwrap();

        memo.call(7).await.unwrap();
        assert!(memo.invalidate(&7).unwrap());
        memo.call(7).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_error_display() {
        let err: MemoError<String> = MemoError::Computation(Arc::new("down".to_string()));
        assert_eq!(err.to_string(), "Memoized computation failed: down");

        let err: MemoError<String> = CacheError::KeyDerivation("bad".to_string()).into();
        assert_eq!(err.to_string(), "Key derivation failed: bad");
        assert!(err.computation().is_none());
    }
}
