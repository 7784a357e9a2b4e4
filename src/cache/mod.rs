//! Cache Module
//!
//! Provides in-memory caching with LRU eviction, sliding TTL expiration,
//! read-through and write-through/write-back to a backing store.

pub mod backing;
mod engine;
mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use backing::{DeleteFn, ReadFn, WriteFn};
pub use engine::Cache;
pub use entry::CacheItem;
pub use lru::RecencyList;
pub use stats::CacheStats;
pub use store::CacheState;
