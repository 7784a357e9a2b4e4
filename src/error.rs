//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache and no read callback is configured
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The read callback failed; the source is the callback's own error
    #[error("Backing store read failed: {0}")]
    BackingStoreRead(#[source] anyhow::Error),

    /// The dispatcher refused a background job under reject backpressure
    #[error("Dispatcher saturated: {0}")]
    Saturated(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_not_found_message() {
        let err = CacheError::NotFound("\"k\"".to_string());
        assert_eq!(err.to_string(), "Key not found: \"k\"");
    }

    #[test]
    fn test_backing_store_read_keeps_source() {
        let err = CacheError::BackingStoreRead(anyhow::anyhow!("disk on fire"));
        assert!(err.to_string().contains("disk on fire"));
        assert!(err.source().is_some());
    }
}
