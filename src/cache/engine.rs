//! Cache Engine Module
//!
//! The public cache handle: one exclusive lock over [`CacheState`] plus the
//! [`Dispatcher`] that runs backing-store writes and deletes in the background.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::backing::Job;
use crate::cache::{CacheState, CacheStats};
use crate::config::{CacheConfig, WriteMode};
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_eviction_task, Dispatcher};

// == Cache ==
/// An LRU/TTL cache in front of a slower backing store.
///
/// Every operation holds the lock for its whole body, including the
/// eviction passes run at entry and exit. Background jobs are scheduled
/// under the lock but run after it is released.
///
/// All async methods must be called from within a tokio runtime.
pub struct Cache<K, V> {
    state: Mutex<CacheState<K, V>>,
    dispatcher: Dispatcher,
    eviction_interval: Duration,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` items (0 = unbounded).
    pub fn new(capacity: usize) -> Self {
        Self::with_config(CacheConfig::with_capacity(capacity))
    }

    /// Creates a cache from a full configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState::new(&config)),
            dispatcher: Dispatcher::new(config.max_in_flight, config.backpressure),
            eviction_interval: config.eviction_interval,
        }
    }

    // == Set ==
    /// Stores a value and marks it dirty.
    ///
    /// Under [`WriteMode::WriteAlways`] a write job is scheduled immediately.
    pub async fn set(&self, key: K, value: V) -> Result<()> {
        let mut state = self.state.lock().await;
        let entry = self.evict_pass(&mut state);

        let mut jobs = Vec::new();
        state.set(key, value, Instant::now(), &mut jobs);
        let body = self.dispatch_all(&mut state, jobs);

        let exit = self.evict_pass(&mut state);
        entry.and(body).and(exit).map(drop)
    }

    // == Get ==
    /// Returns the cached value, reading through on a miss.
    ///
    /// A miss without a read callback is [`CacheError::NotFound`]. With one,
    /// pending background jobs are awaited first, then the callback runs on
    /// the caller's task; its value is cached clean, its error is returned as
    /// [`CacheError::BackingStoreRead`] and nothing is cached.
    pub async fn get(&self, key: &K) -> Result<V> {
        let mut state = self.state.lock().await;
        // Rejected write-backs are logged and counted; the read result wins
        let _ = self.evict_pass(&mut state);

        let result = if let Some(value) = state.lookup(key, Instant::now()) {
            Ok(value)
        } else if let Some(read) = state.callbacks().read.clone() {
            self.dispatcher.wait_idle().await;
            match read(key) {
                Ok(value) => {
                    debug!(key = ?key, "Populated from backing store");
                    state.insert_clean(key.clone(), value.clone(), Instant::now());
                    Ok(value)
                }
                Err(err) => Err(CacheError::BackingStoreRead(err)),
            }
        } else {
            Err(CacheError::NotFound(format!("{:?}", key)))
        };

        let _ = self.evict_pass(&mut state);
        result
    }

    // == Delete ==
    /// Drops a key from the cache and schedules the delete callback.
    ///
    /// Unlike [`Cache::remove`], a dirty value is discarded without being
    /// written. The delete callback fires whether or not the key was cached.
    pub async fn delete(&self, key: K) -> Result<()> {
        let mut state = self.state.lock().await;
        let entry = self.evict_pass(&mut state);

        if state.callbacks().delete.is_some() {
            self.dispatcher.wait_idle().await;
        }
        state.discard(&key);
        let body = match state.delete_job(key) {
            Some(job) => self.dispatch_all(&mut state, vec![job]),
            None => Ok(()),
        };

        let exit = self.evict_pass(&mut state);
        entry.and(body).and(exit).map(drop)
    }

    // == Remove ==
    /// Removes a key through the eviction path.
    ///
    /// Under [`WriteMode::WriteOnEvict`] a dirty value is written back first.
    /// No delete callback fires.
    pub async fn remove(&self, key: &K) -> Result<()> {
        let mut state = self.state.lock().await;
        let entry = self.evict_pass(&mut state);

        let mut jobs = Vec::new();
        state.remove(key, &mut jobs);
        let body = self.dispatch_all(&mut state, jobs);

        let exit = self.evict_pass(&mut state);
        entry.and(body).and(exit).map(drop)
    }

    // == Keys ==
    /// Snapshot of the cached keys, in no particular order.
    pub async fn keys(&self) -> Vec<K> {
        self.state.lock().await.keys()
    }

    // == Length ==
    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.is_empty()
    }

    /// Checks for a key without touching it or reading through.
    pub async fn contains(&self, key: &K) -> bool {
        self.state.lock().await.contains(key)
    }

    // == Purge ==
    /// Discards every item; no callback runs.
    pub async fn purge(&self) {
        self.state.lock().await.purge();
    }

    // == Flush ==
    /// Removes every item through the eviction path, leaving the cache empty.
    pub async fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let entry = self.evict_pass(&mut state);

        let mut jobs = Vec::new();
        state.flush(&mut jobs);
        let body = self.dispatch_all(&mut state, jobs);

        entry.and(body)
    }

    // == Sync ==
    /// Writes every dirty item to the backing store and marks it clean.
    ///
    /// Items stay cached. Nothing happens without a write callback.
    pub async fn sync(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let entry = self.evict_pass(&mut state);

        let body = if state.callbacks().write.is_some() {
            self.dispatcher.wait_idle().await;
            let mut jobs = Vec::new();
            state.sync(&mut jobs);
            self.dispatch_all(&mut state, jobs)
        } else {
            Ok(())
        };

        let exit = self.evict_pass(&mut state);
        entry.and(body).and(exit).map(drop)
    }

    // == Run Eviction ==
    /// Runs an eviction pass on demand and returns how many items it removed.
    pub async fn run_eviction(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        self.evict_pass(&mut state)
    }

    // == Wait For Pending ==
    /// Waits until every scheduled background job has finished.
    ///
    /// Holds the lock meanwhile, so no new jobs can be scheduled. Gives no
    /// ordering guarantee between the jobs themselves.
    pub async fn wait_for_pending(&self) {
        let _state = self.state.lock().await;
        self.dispatcher.wait_idle().await;
    }

    /// Number of background jobs not yet finished.
    pub fn pending(&self) -> usize {
        self.dispatcher.pending()
    }

    // == Background Eviction ==
    /// Starts the periodic eviction task at the configured interval.
    ///
    /// Abort the returned handle to stop it.
    pub fn start_eviction(self: &Arc<Self>) -> JoinHandle<()> {
        spawn_eviction_task(self.clone(), self.eviction_interval)
    }

    pub fn eviction_interval(&self) -> Duration {
        self.eviction_interval
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        self.state.lock().await.stats()
    }

    // == Callbacks ==
    /// Sets the function used to load values on a miss.
    ///
    /// The callback runs on the calling task while the cache lock is held, so
    /// it stalls every other cache operation and the runtime worker it runs
    /// on until it returns. Keep it quick, or drive the cache from a
    /// multi-thread runtime.
    pub async fn set_read_callback<F>(&self, read: F)
    where
        F: Fn(&K) -> anyhow::Result<V> + Send + Sync + 'static,
    {
        self.state.lock().await.callbacks_mut().read = Some(Arc::new(read));
    }

    /// Sets the function used to persist values.
    pub async fn set_write_callback<F>(&self, write: F)
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        self.state.lock().await.callbacks_mut().write = Some(Arc::new(write));
    }

    /// Sets the function called by [`Cache::delete`].
    pub async fn set_delete_callback<F>(&self, delete: F)
    where
        F: Fn(K) + Send + Sync + 'static,
    {
        self.state.lock().await.callbacks_mut().delete = Some(Arc::new(delete));
    }

    pub async fn clear_read_callback(&self) {
        self.state.lock().await.callbacks_mut().read = None;
    }

    pub async fn clear_write_callback(&self) {
        self.state.lock().await.callbacks_mut().write = None;
    }

    pub async fn clear_delete_callback(&self) {
        self.state.lock().await.callbacks_mut().delete = None;
    }

    // == Settings ==
    /// Sets the sliding TTL (zero disables expiry).
    ///
    /// Every cached item gets a fresh deadline of `now + ttl` instead of
    /// keeping the one it was stamped with, so an item set while expiry was
    /// disabled does not disappear on the next pass.
    pub async fn set_ttl(&self, ttl: Duration) {
        self.state.lock().await.set_ttl(ttl, Instant::now());
    }

    /// Changes the capacity and evicts immediately down to it.
    pub async fn set_capacity(&self, capacity: usize) -> Result<()> {
        let mut state = self.state.lock().await;
        state.set_capacity(capacity);
        self.evict_pass(&mut state).map(drop)
    }

    pub async fn set_write_always(&self) {
        self.state.lock().await.set_write_mode(WriteMode::WriteAlways);
    }

    pub async fn set_write_on_evict(&self) {
        self.state.lock().await.set_write_mode(WriteMode::WriteOnEvict);
    }

    pub async fn write_mode(&self) -> WriteMode {
        self.state.lock().await.write_mode()
    }

    // == Internals ==
    fn evict_pass(&self, state: &mut CacheState<K, V>) -> Result<usize> {
        let mut jobs = Vec::new();
        let removed = state.evict(Instant::now(), &mut jobs);
        self.dispatch_all(state, jobs).map(|_| removed)
    }

    /// Hands jobs to the dispatcher, returning the first refusal.
    ///
    /// Never suspends, so a state change and the jobs it produced are
    /// committed together even if the calling future is dropped. A refused
    /// write leaves its item dirty if it is still cached.
    fn dispatch_all(&self, state: &mut CacheState<K, V>, jobs: Vec<Job<K, V>>) -> Result<()> {
        let mut first_err = None;

        for job in jobs {
            let key = job.key().clone();
            let is_write = matches!(job, Job::Write { .. });

            match self.dispatcher.dispatch(job) {
                Ok(()) if is_write => state.stats_mut().record_write(),
                Ok(()) => state.stats_mut().record_delete(),
                Err(err) => {
                    warn!(key = ?key, error = %err, "Background job rejected");
                    state.stats_mut().record_rejection();
                    if is_write {
                        state.mark_dirty(&key);
                    }
                    first_err.get_or_insert(err);
                }
            }
        }

        first_err.map_or(Ok(()), Err)
    }
}
