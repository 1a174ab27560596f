//! Expiration Sweep Task
//!
//! Background task that periodically removes expired cache entries. The
//! sweep only reclaims memory; lookups already treat expired entries as
//! absent without it.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Something holding entries that can expire.
pub trait Sweep: Send + Sync + 'static {
    /// Removes expired entries, returning how many were removed.
    fn sweep_expired(&self) -> usize;
}

/// Spawns a background task that periodically sweeps `target`.
///
/// The task holds only a weak reference, so it never keeps a cache alive;
/// it exits on the first tick after the target has been dropped. The
/// returned handle can be used to abort it earlier.
///
/// Must be called from within a tokio runtime.
///
/// # Example
/// ```ignore
/// let store = Arc::new(store);
/// let handle = spawn_sweep_task(Arc::downgrade(&store), Duration::from_secs(60));
/// // Later, on shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task<S: Sweep>(target: Weak<S>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expiration sweep with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let Some(target) = target.upgrade() else {
                debug!("Swept cache was dropped, stopping sweep");
                break;
            };
            let removed = target.sweep_expired();
            drop(target);

            if removed > 0 {
                info!("Expiration sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiration sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counting {
        sweeps: AtomicUsize,
    }

    impl Sweep for Counting {
        fn sweep_expired(&self) -> usize {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_runs_every_interval() {
        let target = Arc::new(Counting::default());
        let handle = spawn_sweep_task(Arc::downgrade(&target), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(target.sweeps.load(Ordering::SeqCst), 3);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_stops_when_target_dropped() {
        let target = Arc::new(Counting::default());
        let handle = spawn_sweep_task(Arc::downgrade(&target), Duration::from_secs(1));

        drop(target);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(handle.is_finished(), "Task should exit once the target is gone");
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let target = Arc::new(Counting::default());
        let handle = spawn_sweep_task(Arc::downgrade(&target), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
