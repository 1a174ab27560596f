//! Cache Engine - An in-process TTL cache engine
//!
//! Provides key/value caches with TTL expiration and creation-order or LRU
//! eviction, synchronous and asynchronous memoization with duplicate
//! computation suppression, cache-aside / write-through / write-behind
//! consistency strategies, and bounded-concurrency cache warming.

pub mod cache;
pub mod config;
pub mod error;
pub mod memo;
pub mod strategies;
pub mod tasks;
pub mod warmer;

pub use cache::{
    build_cache, new_cache, new_cache_with_clock, BoundedCache, Cache, CacheStats, Clock,
    Discipline, ManualClock, RecencyCache, SystemClock,
};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use memo::{memoize, memoize_async, MemoError, MemoOptions, SingleFlight};
pub use strategies::{
    cache_aside, cache_aside_single_flight, write_behind, write_through, StrategyOptions,
};
pub use warmer::{warm, WarmOptions};
