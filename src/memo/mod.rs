//! Memoization Module
//!
//! Wraps functions so repeated calls with the same arguments are served
//! from a private cache. [`memoize`] handles plain functions;
//! [`memoize_async`] handles functions returning futures and guarantees
//! that concurrent callers with the same key share one execution.

mod async_memoizer;
mod flight;
mod key;
mod memoizer;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::cache::{new_cache_with_clock, Cache, Clock, Discipline, SystemClock, DEFAULT_TTL};
use crate::error::Result;

pub use async_memoizer::{memoize_async, AsyncMemoized, MemoError};
pub use flight::{Flight, FlightResult, SingleFlight};
pub use key::{stable_key, KeyFn};
pub use memoizer::{memoize, Memoized};

/// Capacity of a memoizer's private cache unless configured otherwise
pub const DEFAULT_MEMO_CAPACITY: usize = 1000;

// == Memo Options ==
/// Settings shared by both memoizers.
pub struct MemoOptions<A> {
    /// How long a result stays cached, `Duration::ZERO` = forever
    pub ttl: Duration,
    /// Eviction discipline of the private cache
    pub discipline: Discipline,
    /// Capacity of the private cache
    pub capacity: usize,
    key_fn: KeyFn<A>,
    clock: Arc<dyn Clock>,
}

impl<A: 'static> MemoOptions<A> {
    /// Options keyed by a custom function, for arguments that cannot be
    /// serialized or carry data that should not be part of the key.
    pub fn with_key_fn<F>(key_fn: F) -> Self
    where
        F: Fn(&A) -> String + Send + Sync + 'static,
    {
        Self {
            ttl: DEFAULT_TTL,
            discipline: Discipline::default(),
            capacity: DEFAULT_MEMO_CAPACITY,
            key_fn: Arc::new(move |args: &A| -> Result<String> { Ok(key_fn(args)) }),
            clock: Arc::new(SystemClock),
        }
    }
}

impl<A> MemoOptions<A> {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn discipline(mut self, discipline: Discipline) -> Self {
        self.discipline = discipline;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Reads time from `clock` instead of the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn private_cache<V>(&self) -> Result<Arc<dyn Cache<String, V>>>
    where
        V: Clone + Send + 'static,
    {
        new_cache_with_clock(self.discipline, self.capacity, self.clock.clone())
    }
}

impl<A: Serialize + 'static> Default for MemoOptions<A> {
    /// Options keyed by [`stable_key`].
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            discipline: Discipline::default(),
            capacity: DEFAULT_MEMO_CAPACITY,
            key_fn: Arc::new(|args: &A| -> Result<String> { stable_key(args) }),
            clock: Arc::new(SystemClock),
        }
    }
}

impl<A> fmt::Debug for MemoOptions<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoOptions")
            .field("ttl", &self.ttl)
            .field("discipline", &self.discipline)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
