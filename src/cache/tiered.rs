//! Tiered cache: in-process tier + optional distributed tier.
//!
//! Reads go local first, then distributed. Misses run the caller's factory once and write
//! both tiers. Every key this process writes is tracked in a [`KeyRegistry`] so that pattern
//! invalidation works even when the distributed tier is absent or down.
//!
//! Cache malfunction never becomes a caller-visible error: tier failures are logged and the
//! factory answers uncached. There is no single-flight; concurrent misses on one key may all
//! run the factory, and the last writer's value wins.
//!
//! # Known race
//!
//! A reader whose factory started before a writer's invalidation pass can populate a stale
//! value concurrently with, or after, that pass. The stale entry lives until its TTL expires
//! or the next invalidation. Removal never leaves an entry in either tier untracked: keys are
//! untracked and evicted locally before the distributed delete, and population re-tracks a
//! key after both tiers are written, so a later pattern pass still finds it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::distributed::{DistributedStore, LocalOnly, StoreInfo};
use super::error::{CacheError, CacheResult};
use super::local::LocalTier;
use super::registry::KeyRegistry;
use super::types::{CacheStatus, EntryOptions, Invalidation};
use crate::config::CacheSettings;

/// Keys per `delete_many` call during pattern invalidation.
pub const DELETE_BATCH_SIZE: usize = 256;

/// Raw result of a two-tier lookup.
#[derive(Debug, Clone)]
pub enum TieredLookupResult {
    HitLocal(Arc<[u8]>),
    HitDistributed(Arc<[u8]>),
    Miss,
}

impl TieredLookupResult {
    pub fn status(&self) -> CacheStatus {
        match self {
            TieredLookupResult::HitLocal(_) => CacheStatus::HitLocal,
            TieredLookupResult::HitDistributed(_) => CacheStatus::HitDistributed,
            TieredLookupResult::Miss => CacheStatus::Miss,
        }
    }

    pub fn is_hit(&self) -> bool {
        !matches!(self, TieredLookupResult::Miss)
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            TieredLookupResult::HitLocal(p) | TieredLookupResult::HitDistributed(p) => Some(p),
            TieredLookupResult::Miss => None,
        }
    }
}

/// Connectivity of the distributed tier, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributedStatus {
    pub configured: bool,
    pub connected: bool,
    pub server: Option<StoreInfo>,
}

/// Two-tier read-through cache.
///
/// `D` is the distributed store; the default [`LocalOnly`] runs without one.
pub struct TieredCache<D: DistributedStore = LocalOnly> {
    settings: CacheSettings,
    local: LocalTier,
    distributed: Option<D>,
    registry: KeyRegistry,
}

impl<D: DistributedStore> std::fmt::Debug for TieredCache<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("settings", &self.settings)
            .field("local", &self.local)
            .field("distributed", &self.distributed.is_some())
            .field("tracked", &self.registry.len())
            .finish()
    }
}

impl TieredCache<LocalOnly> {
    /// Cache without a distributed tier.
    pub fn local_only(settings: CacheSettings) -> Self {
        Self::new(settings, None)
    }
}

impl<D: DistributedStore> TieredCache<D> {
    pub fn new(settings: CacheSettings, distributed: Option<D>) -> Self {
        if settings.local_ttl_exceeds_default() {
            warn!(
                local_ttl = ?settings.local_ttl,
                default_ttl = ?settings.default_ttl,
                "Local TTL exceeds the default TTL; it will be clamped per entry"
            );
        }
        if !settings.enabled {
            info!("Caching disabled; all reads bypass the cache");
        }

        Self {
            settings,
            local: LocalTier::new(),
            distributed,
            registry: KeyRegistry::new(),
        }
    }

    pub fn with_store(settings: CacheSettings, store: D) -> Self {
        Self::new(settings, Some(store))
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn local(&self) -> &LocalTier {
        &self.local
    }

    pub fn distributed(&self) -> Option<&D> {
        self.distributed.as_ref()
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    /// Prefixes `key` and enforces the key length limit.
    pub fn full_key(&self, key: &str) -> CacheResult<String> {
        let full = format!("{}{}", self.settings.key_prefix, key);
        if full.len() > self.settings.max_key_length {
            return Err(CacheError::KeyTooLong {
                len: full.len(),
                max: self.settings.max_key_length,
            });
        }
        Ok(full)
    }

    fn full_pattern(&self, pattern: &str) -> String {
        format!("{}{}", self.settings.key_prefix, pattern)
    }

    fn entry_options(&self, ttl: Option<Duration>) -> EntryOptions {
        let global = ttl.unwrap_or(self.settings.default_ttl);
        if self.settings.local_ttl > global {
            debug!(local_ttl = ?self.settings.local_ttl, global_ttl = ?global, "Clamping local TTL");
        }
        EntryOptions::new(global, self.settings.local_ttl)
    }

    /// The store, if configured and answering its probe.
    async fn available_store(&self) -> Option<&D> {
        let store = self.distributed.as_ref()?;
        if store.is_available().await {
            Some(store)
        } else {
            debug!("Distributed tier unavailable, running local-only");
            None
        }
    }

    /// Looks `key` up in both tiers without decoding.
    ///
    /// A distributed hit is copied into the local tier and tracked. Returns
    /// [`TieredLookupResult::Miss`] when caching is disabled.
    #[instrument(skip(self, cancel))]
    pub async fn lookup(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> CacheResult<TieredLookupResult> {
        if !self.settings.enabled {
            return Ok(TieredLookupResult::Miss);
        }
        let full_key = self.full_key(key)?;
        if cancel.is_cancelled() {
            return Err(CacheError::Cancelled);
        }

        if let Some(payload) = self.local.get(&full_key) {
            debug!(key = %full_key, "Local hit");
            return Ok(TieredLookupResult::HitLocal(payload));
        }

        let Some(store) = cancellable(cancel, self.available_store()).await? else {
            debug!(key = %full_key, "Miss");
            return Ok(TieredLookupResult::Miss);
        };

        match cancellable(cancel, store.get(&full_key)).await?? {
            Some(bytes) => {
                let payload: Arc<[u8]> = bytes.into();
                if cancel.is_cancelled() {
                    return Err(CacheError::Cancelled);
                }
                self.local
                    .insert(&full_key, Arc::clone(&payload), self.entry_options(None).local_ttl);
                self.registry.track(&full_key);
                debug!(key = %full_key, "Distributed hit, promoted to local");
                Ok(TieredLookupResult::HitDistributed(payload))
            }
            None => {
                debug!(key = %full_key, "Miss");
                Ok(TieredLookupResult::Miss)
            }
        }
    }

    /// Returns the cached value for `key`, or runs `factory` once and caches its result.
    ///
    /// `ttl` overrides the global TTL (default: `default_ttl`). Factory errors are returned
    /// unchanged and never cached. The factory receives a clone of `cancel`.
    #[instrument(skip(self, cancel, factory))]
    pub async fn get_or_create<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        cancel: &CancellationToken,
        factory: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.settings.enabled {
            debug!("Cache disabled, calling factory");
            return factory(cancel.clone()).await;
        }

        match self.lookup(key, cancel).await {
            Ok(TieredLookupResult::Miss) => {}
            Ok(hit) => match hit.payload().map(decode::<T>) {
                Some(Ok(value)) => return Ok(value),
                Some(Err(e)) => {
                    warn!(key, error = %e, "Cached payload unreadable, bypassing cache");
                    self.discard_local(key);
                    return factory(cancel.clone()).await;
                }
                None => {}
            },
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, bypassing cache");
                return factory(cancel.clone()).await;
            }
        }

        let value = factory(cancel.clone()).await?;

        if let Err(e) = self.store_value(key, &value, ttl, cancel).await {
            warn!(key, error = %e, "Cache population failed, returning uncached value");
        }
        Ok(value)
    }

    /// Cached value for `key`, if any. Never runs a factory; failures read as absent.
    #[instrument(skip(self, cancel))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Option<T> {
        if !self.settings.enabled {
            return None;
        }

        match self.lookup(key, cancel).await {
            Ok(hit) => match hit.payload().map(decode::<T>)? {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "Cached payload unreadable");
                    self.discard_local(key);
                    None
                }
            },
            Err(e) => {
                warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Writes `value` to both tiers. Returns `true` if every configured tier accepted it.
    #[instrument(skip(self, value, cancel))]
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        cancel: &CancellationToken,
    ) -> bool {
        if !self.settings.enabled {
            return false;
        }

        match self.store_value(key, value, ttl, cancel).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "Cache write failed");
                false
            }
        }
    }

    async fn store_value<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        cancel: &CancellationToken,
    ) -> CacheResult<()> {
        let full_key = self.full_key(key)?;
        let bytes = serde_json::to_vec(value)?;
        if bytes.len() > self.settings.max_payload_bytes {
            return Err(CacheError::PayloadTooLarge {
                len: bytes.len(),
                max: self.settings.max_payload_bytes,
            });
        }
        let options = self.entry_options(ttl);
        let payload: Arc<[u8]> = bytes.into();

        if cancel.is_cancelled() {
            return Err(CacheError::Cancelled);
        }
        self.registry.track(&full_key);
        self.local
            .insert(&full_key, Arc::clone(&payload), options.local_ttl);

        if let Some(store) = cancellable(cancel, self.available_store()).await? {
            cancellable(cancel, store.set(&full_key, &payload, options.global_ttl)).await??;
        }

        // A pattern pass may have untracked the key while the distributed write was in flight.
        self.registry.track(&full_key);
        debug!(key = %full_key, bytes = payload.len(), "Populated");
        Ok(())
    }

    /// Deletes `key` from both tiers and untracks it. Idempotent.
    #[instrument(skip(self, cancel))]
    pub async fn remove(&self, key: &str, cancel: &CancellationToken) -> Invalidation {
        self.remove_many(&[key], cancel).await
    }

    /// Deletes every key in `keys` from both tiers and untracks them.
    #[instrument(skip(self, keys, cancel), fields(count = keys.len()))]
    pub async fn remove_many<K: AsRef<str>>(
        &self,
        keys: &[K],
        cancel: &CancellationToken,
    ) -> Invalidation {
        let mut report = Invalidation::default();
        if !self.settings.enabled {
            return report;
        }

        let mut full_keys = Vec::with_capacity(keys.len());
        for key in keys {
            match self.full_key(key.as_ref()) {
                Ok(full_key) => full_keys.push(full_key),
                Err(e) => {
                    warn!(key = key.as_ref(), error = %e, "Skipping invalid key");
                    report.failures += 1;
                }
            }
        }

        for full_key in &full_keys {
            self.registry.untrack(full_key);
            if self.local.remove(full_key) {
                report.local_removed += 1;
            }
        }

        match cancellable(cancel, self.available_store()).await {
            Ok(Some(store)) => {
                self.delete_distributed(store, &full_keys, cancel, &mut report)
                    .await
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Distributed removal skipped");
                report.failures += 1;
            }
        }

        debug!(
            local_removed = report.local_removed,
            distributed_removed = report.distributed_removed,
            failures = report.failures,
            "Removed keys"
        );
        report
    }

    /// Evicts every key matching `pattern` (a logical pattern with a trailing `*`).
    ///
    /// Runs the registry pass first, always. Then, if the distributed tier is available,
    /// scans it for matching keys (including ones written by other processes) and deletes
    /// them in batches along with their local copies. Failures are counted in the report.
    #[instrument(skip(self, cancel))]
    pub async fn remove_by_pattern(&self, pattern: &str, cancel: &CancellationToken) -> Invalidation {
        let mut report = Invalidation::default();
        if !self.settings.enabled {
            return report;
        }
        let full_pattern = self.full_pattern(pattern);

        for key in self.registry.matching(&full_pattern) {
            self.registry.untrack(&key);
            if self.local.remove(&key) {
                report.local_removed += 1;
            }
        }

        let store = match cancellable(cancel, self.available_store()).await {
            Ok(Some(store)) => Some(store),
            Ok(None) => None,
            Err(e) => {
                warn!(pattern = %full_pattern, error = %e, "Distributed scan skipped");
                report.failures += 1;
                None
            }
        };

        if let Some(store) = store {
            let mut keys = store.scan_keys(&full_pattern);
            let mut batch = Vec::with_capacity(DELETE_BATCH_SIZE);

            loop {
                let next = match cancellable(cancel, keys.next()).await {
                    Ok(next) => next,
                    Err(e) => {
                        warn!(pattern = %full_pattern, error = %e, "Distributed scan interrupted");
                        report.failures += 1;
                        break;
                    }
                };

                match next {
                    Some(Ok(key)) => {
                        batch.push(key);
                        if batch.len() >= DELETE_BATCH_SIZE {
                            self.evict_local(&batch, &mut report);
                            self.delete_distributed(store, &batch, cancel, &mut report)
                                .await;
                            batch.clear();
                        }
                    }
                    Some(Err(e)) => {
                        warn!(pattern = %full_pattern, error = %e, "Distributed scan failed");
                        report.failures += 1;
                        break;
                    }
                    None => break,
                }
            }

            if !batch.is_empty() {
                self.evict_local(&batch, &mut report);
                self.delete_distributed(store, &batch, cancel, &mut report)
                    .await;
            }
        }

        info!(
            pattern = %full_pattern,
            local_removed = report.local_removed,
            distributed_removed = report.distributed_removed,
            failures = report.failures,
            "Pattern invalidated"
        );
        report
    }

    /// Evicts every key under the configured prefix.
    pub async fn clear(&self, cancel: &CancellationToken) -> Invalidation {
        self.remove_by_pattern("*", cancel).await
    }

    fn discard_local(&self, key: &str) {
        if let Ok(full_key) = self.full_key(key) {
            self.local.remove(&full_key);
        }
    }

    fn evict_local(&self, full_keys: &[String], report: &mut Invalidation) {
        for key in full_keys {
            self.registry.untrack(key);
            if self.local.remove(key) {
                report.local_removed += 1;
            }
        }
    }

    async fn delete_distributed(
        &self,
        store: &D,
        full_keys: &[String],
        cancel: &CancellationToken,
        report: &mut Invalidation,
    ) {
        if full_keys.is_empty() {
            return;
        }
        match cancellable(cancel, store.delete_many(full_keys)).await {
            Ok(Ok(removed)) => report.distributed_removed += removed,
            Ok(Err(e)) => {
                warn!(count = full_keys.len(), error = %e, "Distributed delete failed");
                report.failures += 1;
            }
            Err(e) => {
                warn!(count = full_keys.len(), error = %e, "Distributed delete cancelled");
                report.failures += 1;
            }
        }
    }

    /// Sorted snapshot of the keys this process has written.
    pub fn tracked_keys(&self) -> Vec<String> {
        let mut keys = self.registry.snapshot();
        keys.sort();
        keys
    }

    /// Tracked keys with the time each was last written.
    pub fn tracked_entries(&self) -> Vec<(String, DateTime<Utc>)> {
        self.registry.entries()
    }

    pub fn tracked_key_count(&self) -> usize {
        self.registry.len()
    }

    /// Probes the distributed tier and collects its server details.
    pub async fn distributed_status(&self) -> DistributedStatus {
        let Some(store) = self.distributed.as_ref() else {
            return DistributedStatus {
                configured: false,
                connected: false,
                server: None,
            };
        };

        let connected = store.is_available().await;
        let server = if connected {
            match store.server_info().await {
                Ok(info) => Some(info),
                Err(e) => {
                    warn!(error = %e, "Could not read distributed server info");
                    None
                }
            }
        } else {
            None
        };

        DistributedStatus {
            configured: true,
            connected,
            server,
        }
    }
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> CacheResult<T> {
    Ok(serde_json::from_slice(payload)?)
}

/// Races `fut` against `cancel`; cancellation wins ties.
async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> CacheResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CacheError::Cancelled),
        output = fut => Ok(output),
    }
}
