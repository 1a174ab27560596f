//! Configuration Module
//!
//! Handles loading cache engine configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::Discipline;

/// Cache engine configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Eviction discipline used by caches built from this config
    pub discipline: Discipline,
    /// Maximum number of entries a cache can hold
    pub capacity: usize,
    /// Default TTL in seconds, 0 = never expire
    pub default_ttl: u64,
    /// Background sweep interval in seconds, 0 = no sweep
    pub sweep_interval: u64,
    /// Number of keys fetched concurrently while warming
    pub warm_concurrency: usize,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DISCIPLINE` - `creation-order` or `lru` (default: creation-order)
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `CACHE_WARM_CONCURRENCY` - Warming batch size (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            discipline: env::var("CACHE_DISCIPLINE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.discipline),
            capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.capacity),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval),
            warm_concurrency: env::var("CACHE_WARM_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.warm_concurrency),
        }
    }

    /// Default TTL as a Duration (`Duration::ZERO` never expires).
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    /// Sweep interval, or None when sweeping is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            discipline: Discipline::CreationOrder,
            capacity: 1000,
            default_ttl: 300,
            sweep_interval: 60,
            warm_concurrency: 5,
        }
    }
}
