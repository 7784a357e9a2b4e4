//! Configuration Module
//!
//! Handles loading and managing cache configuration, either programmatically
//! or from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

// == Write Mode ==
/// When dirty values are pushed to the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Every `set` schedules a write immediately (write-through).
    #[default]
    WriteAlways,
    /// Dirty items are written only when they leave the cache (write-back).
    WriteOnEvict,
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" | "write_always" => Ok(WriteMode::WriteAlways),
            "evict" | "write_on_evict" => Ok(WriteMode::WriteOnEvict),
            other => Err(format!("unknown write mode: {}", other)),
        }
    }
}

// == Backpressure ==
/// What the dispatcher does when `max_in_flight` jobs are already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backpressure {
    /// Wait for a running job to finish.
    #[default]
    Block,
    /// Refuse the job with `CacheError::Saturated`.
    Reject,
}

impl FromStr for Backpressure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "block" => Ok(Backpressure::Block),
            "reject" => Ok(Backpressure::Reject),
            other => Err(format!("unknown backpressure policy: {}", other)),
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of items, 0 = unbounded
    pub capacity: usize,
    /// Sliding time-to-live, zero = items never expire
    pub ttl: Duration,
    /// Write-through or write-back
    pub write_mode: WriteMode,
    /// Maximum concurrently running background jobs, 0 = unbounded
    pub max_in_flight: usize,
    /// Policy applied once `max_in_flight` is reached
    pub backpressure: Backpressure,
    /// Interval used by `Cache::start_eviction`
    pub eviction_interval: Duration,
}

impl CacheConfig {
    /// Creates a default config with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum items (default: 1000)
    /// - `CACHE_TTL_MS` - Sliding TTL in milliseconds (default: 0, no expiry)
    /// - `CACHE_WRITE_MODE` - `always` or `evict` (default: always)
    /// - `CACHE_MAX_IN_FLIGHT` - Concurrent background jobs (default: 0, unbounded)
    /// - `CACHE_BACKPRESSURE` - `block` or `reject` (default: block)
    /// - `CACHE_EVICTION_INTERVAL_MS` - Background eviction period (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: parse_env("CACHE_CAPACITY").unwrap_or(defaults.capacity),
            ttl: parse_env("CACHE_TTL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.ttl),
            write_mode: parse_env("CACHE_WRITE_MODE").unwrap_or(defaults.write_mode),
            max_in_flight: parse_env("CACHE_MAX_IN_FLIGHT").unwrap_or(defaults.max_in_flight),
            backpressure: parse_env("CACHE_BACKPRESSURE").unwrap_or(defaults.backpressure),
            eviction_interval: parse_env("CACHE_EVICTION_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.eviction_interval),
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Duration::ZERO,
            write_mode: WriteMode::WriteAlways,
            max_in_flight: 0,
            backpressure: Backpressure::Block,
            eviction_interval: Duration::from_secs(1),
        }
    }
}
