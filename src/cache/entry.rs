//! Cache Item Module
//!
//! Defines the structure for individual cache items with sliding TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Item ==
/// Represents a single cached item with its expiry and dirty flag.
#[derive(Debug, Clone)]
pub struct CacheItem<K, V> {
    /// The item's key, kept so the back of the recency list can be evicted
    pub key: K,
    /// The stored value
    pub value: V,
    /// Expiration deadline, None = no expiration
    pub expires_at: Option<Instant>,
    /// Set locally and not yet written to the backing store
    pub dirty: bool,
}

impl<K, V> CacheItem<K, V> {
    // == Constructor ==
    /// Creates a new item stamped with a deadline of `now + ttl`.
    ///
    /// # Arguments
    /// * `ttl` - Sliding TTL, `Duration::ZERO` for no expiration
    /// * `dirty` - Whether the value still needs writing to the backing store
    pub fn new(key: K, value: V, ttl: Duration, dirty: bool, now: Instant) -> Self {
        Self {
            key,
            value,
            expires_at: deadline(ttl, now),
            dirty,
        }
    }

    // == Refresh ==
    /// Pushes the deadline out to `now + ttl`, or clears it when `ttl` is zero.
    pub fn refresh(&mut self, ttl: Duration, now: Instant) {
        self.expires_at = deadline(ttl, now);
    }

    // == Is Expired ==
    /// Checks if the item has expired.
    ///
    /// Boundary condition: an item is expired once `now >= expires_at`.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

fn deadline(ttl: Duration, now: Instant) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        Some(now + ttl)
    }
}
