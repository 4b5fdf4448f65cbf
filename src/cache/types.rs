use std::time::Duration;

use serde::Serialize;

pub const CACHE_STATUS_HEADER: &str = "X-Cache-Status";

/// Where a read was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    HitLocal,
    HitDistributed,
    Miss,
    /// Caching disabled or the tiers errored; the factory answered uncached.
    Bypass,
}

impl CacheStatus {
    #[inline]
    pub fn as_header_value(&self) -> &'static str {
        match self {
            CacheStatus::HitLocal => "HIT_LOCAL",
            CacheStatus::HitDistributed => "HIT_DISTRIBUTED",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::HitLocal | CacheStatus::HitDistributed)
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_header_value())
    }
}

/// TTLs applied to one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOptions {
    /// Expiry in the distributed tier.
    pub global_ttl: Duration,
    /// Expiry in the local tier; never longer than `global_ttl`.
    pub local_ttl: Duration,
}

impl EntryOptions {
    /// Clamps `local_ttl` to `global_ttl`.
    pub fn new(global_ttl: Duration, local_ttl: Duration) -> Self {
        Self {
            global_ttl,
            local_ttl: local_ttl.min(global_ttl),
        }
    }
}

/// Outcome of a removal. Failures are counted, never raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Invalidation {
    /// Live local entries removed.
    pub local_removed: usize,
    /// Keys the distributed store reported as deleted.
    pub distributed_removed: u64,
    /// Store operations that failed and were skipped.
    pub failures: usize,
}

impl Invalidation {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }

    pub fn merge(&mut self, other: Invalidation) {
        self.local_removed += other.local_removed;
        self.distributed_removed += other.distributed_removed;
        self.failures += other.failures;
    }
}
