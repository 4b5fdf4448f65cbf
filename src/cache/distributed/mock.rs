//! In-memory [`DistributedStore`] for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use futures_util::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;

use super::error::{StoreError, StoreResult};
use super::store::{DistributedStore, StoreInfo};
use crate::cache::keys::matches_pattern;

#[derive(Debug, Clone)]
struct StoredValue {
    payload: Vec<u8>,
    ttl: Duration,
    expires_at: Instant,
}

#[derive(Debug)]
struct Inner {
    entries: RwLock<HashMap<String, StoredValue>>,
    available: AtomicBool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_scan: AtomicBool,
    fail_deletes: AtomicBool,
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_scan: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            get_calls: AtomicUsize::new(0),
            set_calls: AtomicUsize::new(0),
        }
    }
}

/// Shared in-memory store. Clones see the same entries, like two processes on one server.
#[derive(Debug, Clone, Default)]
pub struct MockDistributedStore {
    inner: Arc<Inner>,
}

impl MockDistributedStore {
    pub const ENDPOINT: &'static str = "mock://distributed";

    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the availability probe fail.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_scan(&self, fail: bool) {
        self.inner.fail_scan.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.inner.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Writes a raw entry, bypassing the failure knobs.
    pub fn insert_raw(&self, key: &str, payload: &[u8], ttl: Duration) {
        self.inner.entries.write().insert(
            key.to_string(),
            StoredValue {
                payload: payload.to_vec(),
                ttl,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Live payload under `key`, bypassing the failure knobs.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.live(key).map(|v| v.payload)
    }

    /// TTL the entry under `key` was written with.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.live(key).map(|v| v.ttl)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.live(key).is_some()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .entries
            .read()
            .values()
            .filter(|v| v.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_calls(&self) -> usize {
        self.inner.get_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.inner.set_calls.load(Ordering::SeqCst)
    }

    fn live(&self, key: &str) -> Option<StoredValue> {
        self.inner
            .entries
            .read()
            .get(key)
            .filter(|v| v.expires_at > Instant::now())
            .cloned()
    }

    fn check(&self, knob: &AtomicBool, operation: &'static str, key: &str) -> StoreResult<()> {
        if knob.load(Ordering::SeqCst) {
            return Err(StoreError::CommandFailed {
                operation,
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl DistributedStore for MockDistributedStore {
    async fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.inner.fail_reads, "GET", key)?;
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        self.inner.set_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.inner.fail_writes, "SET", key)?;
        self.insert_raw(key, value, ttl);
        Ok(())
    }

    fn scan_keys(&self, pattern: &str) -> BoxStream<'static, StoreResult<String>> {
        if self.inner.fail_scan.load(Ordering::SeqCst) {
            let err = StoreError::ScanFailed {
                pattern: pattern.to_string(),
                message: "injected failure".to_string(),
            };
            return stream::once(async move { Err(err) }).boxed();
        }

        let now = Instant::now();
        let keys: Vec<StoreResult<String>> = self
            .inner
            .entries
            .read()
            .iter()
            .filter(|(key, value)| value.expires_at > now && matches_pattern(key, pattern))
            .map(|(key, _)| Ok(key.clone()))
            .collect();

        stream::iter(keys).boxed()
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.check(&self.inner.fail_deletes, "DEL", key)?;
        let now = Instant::now();
        let removed = self.inner.entries.write().remove(key);
        Ok(removed.is_some_and(|v| v.expires_at > now))
    }

    async fn delete_many(&self, keys: &[String]) -> StoreResult<u64> {
        let Some(first) = keys.first() else {
            return Ok(0);
        };
        self.check(&self.inner.fail_deletes, "DEL", first)?;

        let now = Instant::now();
        let mut entries = self.inner.entries.write();
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|v| v.expires_at > now)
            .count();
        Ok(removed as u64)
    }

    async fn server_info(&self) -> StoreResult<StoreInfo> {
        if !self.inner.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                message: "mock store offline".to_string(),
            });
        }
        Ok(StoreInfo {
            endpoint: Self::ENDPOINT.to_string(),
            version: Some("mock".to_string()),
            replica: false,
        })
    }
}
