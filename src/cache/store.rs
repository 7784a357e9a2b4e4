//! Cache State Module
//!
//! The synchronous core of the cache: the item store, the eviction pass and
//! the write policy. It never runs callbacks itself; operations that need the
//! backing store push [`Job`]s for the caller to dispatch.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cache::backing::{Callbacks, Job};
use crate::cache::{CacheItem, CacheStats, RecencyList};
use crate::config::{CacheConfig, WriteMode};

// == Removal Cause ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemovalCause {
    Explicit,
    Capacity,
    Expired,
}

// == Cache State ==
/// Everything guarded by the cache lock: items, settings and callbacks.
#[derive(Debug)]
pub struct CacheState<K, V> {
    items: RecencyList<K, V>,
    capacity: usize,
    ttl: Duration,
    write_mode: WriteMode,
    callbacks: Callbacks<K, V>,
    stats: CacheStats,
}

impl<K, V> CacheState<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty state from the mutable parts of a config.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            items: RecencyList::new(),
            capacity: config.capacity,
            ttl: config.ttl,
            write_mode: config.write_mode,
            callbacks: Callbacks::default(),
            stats: CacheStats::new(),
        }
    }

    // == Evict ==
    /// Removes expired items, then least recently used items over capacity.
    ///
    /// Only the back of the recency list is inspected: touches refresh
    /// recency and deadline together, so the back also expires first.
    ///
    /// Returns the number of items removed.
    pub fn evict(&mut self, now: Instant, jobs: &mut Vec<Job<K, V>>) -> usize {
        let mut removed = 0;

        if !self.ttl.is_zero() {
            while let Some(key) = self
                .items
                .peek_back()
                .filter(|item| item.is_expired(now))
                .map(|item| item.key.clone())
            {
                self.remove_with_cause(&key, RemovalCause::Expired, jobs);
                removed += 1;
            }
        }

        if self.capacity != 0 {
            while self.items.len() > self.capacity {
                let Some(key) = self.items.peek_back().map(|item| item.key.clone()) else {
                    break;
                };
                self.remove_with_cause(&key, RemovalCause::Capacity, jobs);
                removed += 1;
            }
        }

        removed
    }

    // == Set ==
    /// Stores a value as the most recently used, dirty item.
    ///
    /// Under write-through a write job is pushed right away.
    pub fn set(&mut self, key: K, value: V, now: Instant, jobs: &mut Vec<Job<K, V>>) {
        let ttl = self.ttl;
        match self.items.touch(&key) {
            Some(item) => {
                item.value = value.clone();
                item.dirty = true;
                item.refresh(ttl, now);
            }
            None => {
                self.items
                    .push_front(CacheItem::new(key.clone(), value.clone(), ttl, true, now));
            }
        }

        if self.write_mode == WriteMode::WriteAlways {
            if let Some(write) = &self.callbacks.write {
                jobs.push(Job::Write {
                    write: write.clone(),
                    key,
                    value,
                });
            }
        }
    }

    // == Lookup ==
    /// Returns a cached value, touching it on a hit.
    ///
    /// Records a hit or miss; a miss leaves the state untouched.
    pub fn lookup(&mut self, key: &K, now: Instant) -> Option<V> {
        let ttl = self.ttl;
        match self.items.touch(key) {
            Some(item) => {
                item.refresh(ttl, now);
                let value = item.value.clone();
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Insert Clean ==
    /// Inserts a value freshly read from the backing store; it is not dirty.
    pub fn insert_clean(&mut self, key: K, value: V, now: Instant) {
        self.items
            .push_front(CacheItem::new(key, value, self.ttl, false, now));
    }

    // == Remove ==
    /// Removes an item through the eviction path.
    ///
    /// Under write-back a dirty item produces a write job for its last value.
    /// Returns whether the key was present.
    pub fn remove(&mut self, key: &K, jobs: &mut Vec<Job<K, V>>) -> bool {
        self.remove_with_cause(key, RemovalCause::Explicit, jobs)
    }

    fn remove_with_cause(
        &mut self,
        key: &K,
        cause: RemovalCause,
        jobs: &mut Vec<Job<K, V>>,
    ) -> bool {
        let Some(item) = self.items.remove(key) else {
            return false;
        };

        match cause {
            RemovalCause::Capacity => self.stats.record_eviction(),
            RemovalCause::Expired => self.stats.record_expiration(),
            RemovalCause::Explicit => {}
        }
        debug!(key = ?item.key, ?cause, dirty = item.dirty, "Removed cache item");

        if self.write_mode == WriteMode::WriteOnEvict && item.dirty {
            if let Some(write) = &self.callbacks.write {
                jobs.push(Job::Write {
                    write: write.clone(),
                    key: item.key,
                    value: item.value,
                });
            }
        }
        true
    }

    // == Discard ==
    /// Drops an item without any write, dirty or not.
    pub fn discard(&mut self, key: &K) -> bool {
        self.items.remove(key).is_some()
    }

    // == Delete Job ==
    /// Builds a delete job if a delete callback is configured.
    pub fn delete_job(&self, key: K) -> Option<Job<K, V>> {
        self.callbacks
            .delete
            .as_ref()
            .map(|delete| Job::Delete {
                delete: delete.clone(),
                key,
            })
    }

    // == Flush ==
    /// Removes every item through the eviction path.
    pub fn flush(&mut self, jobs: &mut Vec<Job<K, V>>) {
        for key in self.items.keys() {
            self.remove(&key, jobs);
        }
    }

    // == Sync ==
    /// Pushes a write job for every dirty item and marks it clean.
    ///
    /// Does nothing without a write callback, leaving items dirty.
    pub fn sync(&mut self, jobs: &mut Vec<Job<K, V>>) {
        let Some(write) = self.callbacks.write.clone() else {
            return;
        };

        for item in self.items.items_mut().filter(|item| item.dirty) {
            item.dirty = false;
            jobs.push(Job::Write {
                write: write.clone(),
                key: item.key.clone(),
                value: item.value.clone(),
            });
        }
    }

    // == Mark Dirty ==
    /// Flags an item as dirty again, e.g. after its write job was refused.
    pub fn mark_dirty(&mut self, key: &K) {
        if let Some(item) = self.items.get_mut(key) {
            item.dirty = true;
        }
    }

    // == Purge ==
    /// Discards every item without any callback.
    pub fn purge(&mut self) {
        self.items.clear();
    }

    // == Settings ==
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Changes the TTL and restamps every item to `now + ttl`.
    ///
    /// Existing deadlines are not kept: giving all items the same deadline
    /// keeps recency and expiry order aligned for the back-only scan.
    pub fn set_ttl(&mut self, ttl: Duration, now: Instant) {
        self.ttl = ttl;
        for item in self.items.items_mut() {
            item.refresh(ttl, now);
        }
    }

    pub fn set_write_mode(&mut self, mode: WriteMode) {
        self.write_mode = mode;
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    pub fn callbacks(&self) -> &Callbacks<K, V> {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut Callbacks<K, V> {
        &mut self.callbacks
    }

    pub fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.items.len());
        stats
    }

    // == Observers ==
    pub fn keys(&self) -> Vec<K> {
        self.items.keys()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.items.contains(key)
    }

    #[cfg(test)]
    pub(crate) fn is_dirty(&self, key: &K) -> Option<bool> {
        self.items.get(key).map(|item| item.dirty)
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
