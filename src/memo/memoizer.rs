//! Synchronous Memoizer
//!
//! Caches the result of a plain function per distinct argument key. There is
//! no duplicate suppression: two threads missing on the same key at once
//! both run the function, and the later `set` wins.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, CacheStats};
use crate::error::Result;
use crate::memo::{KeyFn, MemoOptions};

// == Memoized ==
/// A function wrapped with a private result cache.
pub struct Memoized<A, R, F> {
    func: F,
    cache: Arc<dyn Cache<String, R>>,
    key_fn: KeyFn<A>,
    ttl: Duration,
}

/// Wraps `func` so each distinct argument key runs it at most once per TTL
/// window.
///
/// Fails with `InvalidCapacity` when `options.capacity` is zero.
pub fn memoize<A, R, F>(func: F, options: MemoOptions<A>) -> Result<Memoized<A, R, F>>
where
    F: Fn(A) -> R,
    R: Clone + Send + 'static,
{
    Ok(Memoized {
        cache: options.private_cache()?,
        func,
        key_fn: options.key_fn,
        ttl: options.ttl,
    })
}

impl<A, R, F> Memoized<A, R, F>
where
    F: Fn(A) -> R,
    R: Clone + Send + 'static,
{
    /// Returns the cached result for `args`, computing it on a miss.
    ///
    /// Fails only when the key cannot be derived from `args`.
    pub fn call(&self, args: A) -> Result<R> {
        let key = (self.key_fn)(&args)?;
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let value = (self.func)(args);
        self.cache.set(key, value.clone(), self.ttl);
        Ok(value)
    }

    /// Drops the cached result for `args`, returning whether there was one.
    pub fn invalidate(&self, args: &A) -> Result<bool> {
        let key = (self.key_fn)(args)?;
        Ok(self.cache.delete(&key))
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
