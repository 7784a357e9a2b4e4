//! Writeback Cache - An in-process cache in front of a slower backing store
//!
//! Combines LRU and sliding TTL eviction with read-through on miss and
//! asynchronously dispatched write-through or write-back.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheStats};
pub use config::{Backpressure, CacheConfig, WriteMode};
pub use error::{CacheError, Result};
pub use tasks::spawn_eviction_task;
