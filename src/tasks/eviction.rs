//! Eviction Task
//!
//! Background task that periodically runs the cache's eviction pass, so
//! expired items leave (and are written back) even when the cache is idle.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Cache;

/// Spawns a background task that periodically runs an eviction pass.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between passes. Abort it through the returned handle.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(Cache::<String, String>::with_config(config));
/// let eviction_handle = spawn_eviction_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// eviction_handle.abort();
/// ```
pub fn spawn_eviction_task<K, V>(cache: Arc<Cache<K, V>>, interval: Duration) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("Starting eviction task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            match cache.run_eviction().await {
                Ok(0) => debug!("Eviction pass: nothing due"),
                Ok(removed) => info!("Eviction pass: removed {} items", removed),
                Err(err) => warn!("Eviction pass: {}", err),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::config::CacheConfig;

    #[tokio::test(start_paused = true)]
    async fn test_eviction_task_removes_expired_items() {
        let cache = Arc::new(Cache::<String, String>::new(100));
        cache.set_ttl(Duration::from_secs(1)).await;
        cache
            .set("expire_soon".to_string(), "value".to_string())
            .await
            .unwrap();

        let handle = spawn_eviction_task(cache.clone(), Duration::from_secs(1));

        // Wait for the item to expire and a pass to run
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // contains() does not run a pass itself
        assert!(!cache.contains(&"expire_soon".to_string()).await);
        assert_eq!(cache.stats().await.expirations, 1);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_task_preserves_live_items() {
        let cache = Arc::new(Cache::<String, String>::new(100));
        cache.set_ttl(Duration::from_secs(3600)).await;
        cache
            .set("long_lived".to_string(), "value".to_string())
            .await
            .unwrap();

        let handle = spawn_eviction_task(cache.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.get(&"long_lived".to_string()).await.unwrap(), "value");

        handle.abort();
    }

    #[tokio::test]
    async fn test_eviction_task_writes_back_expired_dirty_items() {
        let cache = Arc::new(Cache::<String, String>::new(100));
        let written = Arc::new(Mutex::new(Vec::new()));
        let sink = written.clone();
        cache.set_write_on_evict().await;
        cache
            .set_write_callback(move |k, v| sink.lock().unwrap().push((k, v)))
            .await;
        cache.set_ttl(Duration::from_millis(50)).await;
        cache.set("k".to_string(), "v".to_string()).await.unwrap();

        let handle = spawn_eviction_task(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        cache.wait_for_pending().await;

        assert_eq!(
            *written.lock().unwrap(),
            vec![("k".to_string(), "v".to_string())]
        );

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_eviction_uses_configured_interval() {
        let config = CacheConfig {
            ttl: Duration::from_millis(100),
            eviction_interval: Duration::from_millis(300),
            ..CacheConfig::with_capacity(10)
        };
        let cache = Arc::new(Cache::<String, String>::with_config(config));
        cache.set("k".to_string(), "v".to_string()).await.unwrap();
        assert_eq!(cache.eviction_interval(), Duration::from_millis(300));

        let handle = cache.start_eviction();

        // Expired, but the first pass is not due yet
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(cache.contains(&"k".to_string()).await);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!cache.contains(&"k".to_string()).await);

        handle.abort();
    }

    #[tokio::test]
    async fn test_eviction_task_can_be_aborted() {
        let cache = Arc::new(Cache::<String, String>::new(100));

        let handle = spawn_eviction_task(cache, Duration::from_secs(1));

        // Abort immediately
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
