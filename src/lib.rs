//! Strata library crate (used by the server binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Cache
//! - [`TieredCache`] - read-through cache over an in-process tier and an optional
//!   distributed tier, with single-key and pattern invalidation
//! - [`KeyCodec`], [`Pagination`] - logical key and pattern construction
//! - [`KeyRegistry`] - record of keys written by this process
//! - [`DistributedStore`], [`RedisStore`], [`LocalOnly`] - distributed tier adapters
//!
//! ## Customers
//! - [`CustomerService`] - customer operations wired to the cache
//! - [`CustomerRepository`], [`InMemoryCustomerRepository`] - persistence
//!
//! ## Configuration
//! - [`Config`], [`CacheSettings`], [`ConfigError`] - environment-backed settings
//!
//! ## Test/Mock Support
//! [`MockDistributedStore`] is available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod customers;
pub mod hashing;

pub use cache::{
    CACHE_STATUS_HEADER, CacheError, CacheResult, CacheStatus, DistributedStatus,
    DistributedStore, EntryOptions, Invalidation, KeyCodec, KeyRegistry, LocalOnly, LocalTier,
    Pagination, RedisStore, StoreError, StoreInfo, StoreResult, TieredCache, TieredLookupResult,
};
#[cfg(any(test, feature = "mock"))]
pub use cache::MockDistributedStore;

pub use config::{CacheSettings, Config, ConfigError, Environment};
pub use customers::{
    CUSTOMER_KEYS, Customer, CustomerError, CustomerFilter, CustomerPatch, CustomerRepository,
    CustomerResult, CustomerService, InMemoryCustomerRepository, NewCustomer, Page,
};
pub use hashing::{digest_hex, digest_parts_hex};
