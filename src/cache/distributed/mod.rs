//! Distributed (second) cache tier.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod redis;
pub mod store;

pub use error::{StoreError, StoreResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockDistributedStore;
pub use self::redis::RedisStore;
pub use store::{DistributedStore, LocalOnly, StoreInfo};
