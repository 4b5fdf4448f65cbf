//! In-process cache tier.
//!
//! Entries are stored as encoded bytes and expire after a per-entry TTL. The tier has no
//! capacity bound; entries leave only through expiry or explicit removal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache;

#[derive(Debug, Clone)]
struct LocalEntry {
    payload: Arc<[u8]>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, LocalEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &LocalEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &LocalEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory tier keyed by fully-qualified cache key.
#[derive(Clone)]
pub struct LocalTier {
    entries: Cache<String, LocalEntry>,
}

impl LocalTier {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }

    /// Returns the payload if present and not expired.
    #[inline]
    pub fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        self.entries.get(key).map(|entry| entry.payload)
    }

    /// Stores `payload` under `key` for `ttl`, replacing any previous entry.
    #[inline]
    pub fn insert(&self, key: &str, payload: Arc<[u8]>, ttl: Duration) {
        self.entries
            .insert(key.to_string(), LocalEntry { payload, ttl });
    }

    /// Removes `key`. Returns `true` if a live entry was removed.
    #[inline]
    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Approximate number of entries (see [`LocalTier::run_pending_tasks`]).
    #[inline]
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.entry_count() == 0
    }

    #[inline]
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Flushes moka's pending housekeeping so counts are exact.
    #[inline]
    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
    }
}

impl Default for LocalTier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocalTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTier")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}
