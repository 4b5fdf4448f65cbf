//! Two-tier read-through cache with pattern invalidation.

pub mod distributed;
pub mod error;
pub mod keys;
pub mod local;
pub mod registry;
pub mod tiered;
pub mod types;


pub use distributed::{
    DistributedStore, LocalOnly, RedisStore, StoreError, StoreInfo, StoreResult,
};
#[cfg(any(test, feature = "mock"))]
pub use distributed::MockDistributedStore;
pub use error::{CacheError, CacheResult};
pub use keys::{KeyCodec, Pagination, matches_pattern};
pub use local::LocalTier;
pub use registry::KeyRegistry;
pub use tiered::{DELETE_BATCH_SIZE, DistributedStatus, TieredCache, TieredLookupResult};
pub use types::{CACHE_STATUS_HEADER, CacheStatus, EntryOptions, Invalidation};
