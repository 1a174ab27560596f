//! Key Derivation
//!
//! Turns memoized-call arguments into cache keys.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{CacheError, Result};

/// Derives the cache key for one set of arguments.
pub type KeyFn<A> = Arc<dyn Fn(&A) -> Result<String> + Send + Sync>;

// == Stable Key ==
/// Stable structural key for any serializable argument value.
///
/// The value is first converted into a `serde_json::Value`, whose objects
/// keep their keys sorted, so two maps with the same contents produce the
/// same key regardless of iteration order. The result is compact JSON.
pub fn stable_key<A>(args: &A) -> Result<String>
where
    A: Serialize + ?Sized,
{
    serde_json::to_value(args)
        .map(|value| value.to_string())
        .map_err(|e| CacheError::KeyDerivation(e.to_string()))
}
