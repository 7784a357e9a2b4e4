//! Background Tasks Module
//!
//! Contains the work the cache runs outside the caller's task.
//!
//! # Tasks
//! - Dispatcher: runs backing-store write/delete callbacks
//! - Eviction: periodically runs an eviction pass

mod dispatcher;
mod eviction;

pub use dispatcher::Dispatcher;
pub use eviction::spawn_eviction_task;
