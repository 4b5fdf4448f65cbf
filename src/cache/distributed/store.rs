use std::future::Future;
use std::time::Duration;

use futures_util::stream::BoxStream;
use serde::Serialize;

use super::error::StoreResult;

/// Server details reported by [`DistributedStore::server_info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreInfo {
    pub endpoint: String,
    pub version: Option<String>,
    pub replica: bool,
}

/// Shared key/value store used as the second cache tier.
///
/// Keys passed in are fully qualified. Implementations report failures as errors; the tiered
/// cache decides whether a failure is fatal (it never is for reads or invalidation).
pub trait DistributedStore: Send + Sync {
    /// Returns `true` if the store answers a cheap probe.
    fn is_available(&self) -> impl Future<Output = bool> + Send;

    /// Fetches the raw payload stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = StoreResult<Option<Vec<u8>>>> + Send;

    /// Stores `value` under `key`, expiring after `ttl`.
    fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Enumerates keys matching a trailing-wildcard `pattern` in bounded batches.
    ///
    /// Keys may be yielded more than once; callers must tolerate duplicates.
    fn scan_keys(&self, pattern: &str) -> BoxStream<'static, StoreResult<String>>;

    /// Deletes `key`. Returns `true` if it existed.
    fn delete(&self, key: &str) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Deletes every key in `keys`. Returns how many existed.
    fn delete_many(&self, keys: &[String]) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Version, endpoint and role of the backing server.
    fn server_info(&self) -> impl Future<Output = StoreResult<StoreInfo>> + Send;
}

/// Store type for caches running without a distributed tier.
///
/// Uninhabited: a `TieredCache<LocalOnly>` can never hold a store.
#[derive(Debug, Clone, Copy)]
pub enum LocalOnly {}

impl DistributedStore for LocalOnly {
    async fn is_available(&self) -> bool {
        match *self {}
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
        match *self {}
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> StoreResult<()> {
        match *self {}
    }

    fn scan_keys(&self, _pattern: &str) -> BoxStream<'static, StoreResult<String>> {
        match *self {}
    }

    async fn delete(&self, _key: &str) -> StoreResult<bool> {
        match *self {}
    }

    async fn delete_many(&self, _keys: &[String]) -> StoreResult<u64> {
        match *self {}
    }

    async fn server_info(&self) -> StoreResult<StoreInfo> {
        match *self {}
    }
}
