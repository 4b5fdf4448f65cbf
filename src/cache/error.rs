use thiserror::Error;

use super::distributed::StoreError;

#[derive(Debug, Error)]
/// Errors raised inside the tiered cache.
///
/// Read paths and invalidation never surface these to callers; they are logged and the cache
/// falls back to the factory. They are returned from the lower-level
/// [`TieredCache::lookup`](super::TieredCache::lookup) API.
pub enum CacheError {
    /// Fully-qualified key exceeds the configured maximum.
    #[error("cache key is {len} bytes, limit is {max}")]
    KeyTooLong {
        /// Key length in bytes.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Serialized value exceeds the configured maximum.
    #[error("cache payload is {len} bytes, limit is {max}")]
    PayloadTooLarge {
        /// Payload length in bytes.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Value could not be encoded or decoded.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Distributed tier failure.
    #[error("distributed store error: {0}")]
    Store(#[from] StoreError),

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
