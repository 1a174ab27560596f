//! Single-Flight Registry
//!
//! Tracks computations that are still running so concurrent callers asking
//! for the same key share one execution instead of each starting their own.
//!
//! Each pending record holds a shared future. The record is registered under
//! the registry lock in the same critical section that checks for an existing
//! record (and for an already cached value), so two callers can never both
//! decide to start a computation. The caller's work closure only runs once
//! the shared future is first polled, outside the lock.
//!
//! A pending record lives until its computation settles, however long that
//! takes; TTLs only apply to the value stored afterwards. On success the
//! value is handed to the `on_success` hook (typically a cache `set`) while
//! the lock is still held, so a later caller either sees the pending record
//! or the cached value, never neither. Failures are not kept: the next caller
//! starts a fresh computation. A panicking computation also clears its
//! record before the panic reaches the callers awaiting it.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{self, BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

/// Result of a shared computation as observed by every waiter.
pub type FlightResult<V, E> = Result<V, Arc<E>>;

/// A computation that any number of callers can await.
pub type Flight<V, E> = Shared<BoxFuture<'static, FlightResult<V, E>>>;

type Pending<K, V, E> = HashMap<K, Flight<V, E>>;

fn lock<K, V, E>(pending: &Mutex<Pending<K, V, E>>) -> MutexGuard<'_, Pending<K, V, E>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the record for `key` and runs `then` under the same lock, if the
/// registry is still alive.
fn settle<K: Hash + Eq, V, E>(registry: &Weak<Mutex<Pending<K, V, E>>>, key: &K, then: impl FnOnce()) {
    if let Some(registry) = registry.upgrade() {
        let mut pending = lock(&registry);
        pending.remove(key);
        then();
    }
}

// == Single Flight ==
/// Registry of in-flight computations keyed by `K`.
pub struct SingleFlight<K, V, E> {
    pending: Arc<Mutex<Pending<K, V, E>>>,
}

impl<K, V, E> SingleFlight<K, V, E>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // == Join ==
    /// Returns the computation for `key`, starting it if needed.
    ///
    /// In order, under the registry lock:
    /// 1. `cached()` is consulted; a value there is returned as a ready flight.
    /// 2. A pending record for `key` is joined, no matter how long it has
    ///    been running.
    /// 3. Otherwise `work` is registered as a new pending record.
    ///
    /// `cached` runs under the registry lock and must not call back into
    /// this registry.
    pub fn join<C, W, Fut, S>(&self, key: K, cached: C, work: W, on_success: S) -> Flight<V, E>
    where
        C: FnOnce() -> Option<V>,
        W: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        S: FnOnce(&V) + Send + 'static,
    {
        let mut pending = lock(&self.pending);

        if let Some(value) = cached() {
            return future::ready(Ok(value)).boxed().shared();
        }

        if let Some(flight) = pending.get(&key) {
            return flight.clone();
        }

        let registry = Arc::downgrade(&self.pending);
        let settle_key = key.clone();
        let flight = async move {
            let outcome = AssertUnwindSafe(async move { work().await }).catch_unwind().await;

            let result = match outcome {
                Ok(result) => result.map_err(Arc::new),
                Err(payload) => {
                    settle(&registry, &settle_key, || {});
                    warn!("Computation panicked, pending record cleared");
                    panic::resume_unwind(payload);
                }
            };

            settle(&registry, &settle_key, || match &result {
                Ok(value) => on_success(value),
                Err(_) => debug!("Computation failed, pending record cleared"),
            });
            result
        }
        .boxed()
        .shared();

        pending.insert(key, flight.clone());
        flight
    }

    /// Number of computations currently registered.
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).len()
    }
}

impl<K, V, E> Default for SingleFlight<K, V, E>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E> fmt::Debug for SingleFlight<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &lock(&self.pending).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_joins_share_one_run() {
        let flights: SingleFlight<&str, usize, String> = SingleFlight::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let joined: Vec<_> = (0..5)
            .map(|_| {
                let runs = runs.clone();
                flights.join(
                    "k",
                    || None,
                    move || async move {
                        tokio::task::yield_now().await;
                        Ok(runs.fetch_add(1, Ordering::SeqCst) + 1)
                    },
                    |_| {},
                )
            })
            .collect();

        assert_eq!(flights.in_flight(), 1);

        let results = join_all(joined).await;
        assert!(results.iter().all(|r| r == &Ok(1)));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cached_value_short_circuits() {
        let flights: SingleFlight<&str, u32, String> = SingleFlight::new();

        let flight = flights.join(
            "k",
            || Some(7),
            || async { Err::<u32, _>("must not run".to_string()) },
            |_| panic!("nothing to store"),
        );

        assert_eq!(flight.await, Ok(7));
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failure_clears_record_and_is_shared() {
        let flights: SingleFlight<&str, u32, String> = SingleFlight::new();

        let first = flights.join("k", || None, || async { Err("boom".to_string()) }, |_| {});
        let second = flights.join("k", || None, || async { Ok(2) }, |_| {});

        let (a, b) = futures::join!(first, second);
        assert_eq!(a.unwrap_err().as_str(), "boom");
        assert_eq!(b.unwrap_err().as_str(), "boom");
        assert_eq!(flights.in_flight(), 0);

        let retry = flights.join("k", || None, || async { Ok(3) }, |_| {});
        assert_eq!(retry.await, Ok(3));
    }

    #[tokio::test]
    async fn test_success_hook_runs_once() {
        let flights: SingleFlight<&str, u32, String> = SingleFlight::new();
        let stored = Arc::new(AtomicUsize::new(0));

        let joined: Vec<_> = (0..3)
            .map(|_| {
                let stored = stored.clone();
                flights.join(
                    "k",
                    || None,
                    || async { Ok(5) },
                    move |_| {
                        stored.fetch_add(1, Ordering::SeqCst);
                    },
                )
            })
            .collect();
        join_all(joined).await;

        assert_eq!(stored.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_running_flight_is_joined() {
        let flights: SingleFlight<&str, u32, String> = SingleFlight::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counted = runs.clone();
        let slow = flights.join(
            "k",
            || None,
            move || async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(counted.fetch_add(1, Ordering::SeqCst) as u32 + 1)
            },
            |_| {},
        );
        let running = tokio::spawn(slow.clone());
        tokio::time::sleep(Duration::from_secs(1800)).await;

        let late = flights.join("k", || None, || async { Ok(99) }, |_| {});
        assert!(slow.ptr_eq(&late));

        assert_eq!(late.await, Ok(1));
        assert_eq!(running.await.unwrap(), Ok(1));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_work_clears_record() {
        let flights: SingleFlight<&str, u32, String> = SingleFlight::new();

        let doomed = flights.join(
            "k",
            || None,
            || async {
                tokio::task::yield_now().await;
                let exploded = true;
                if exploded {
                    panic!("fetch exploded");
                }
                Ok(0)
            },
            |_| {},
        );
        assert_eq!(flights.in_flight(), 1);

        let outcome = tokio::spawn(doomed).await;
        assert!(outcome.unwrap_err().is_panic());
        assert_eq!(flights.in_flight(), 0);

        let retry = flights.join("k", || None, || async { Ok(4) }, |_| {});
        assert_eq!(retry.await, Ok(4));
    }
}
