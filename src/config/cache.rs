//! Cache settings.

use std::env;
use std::time::Duration;

use super::error::ConfigError;

/// Default TTL applied when a caller does not pass one.
pub const DEFAULT_TTL_SECS: u64 = 5 * 60;
/// TTL for single-entity lookups.
pub const DEFAULT_ENTITY_TTL_SECS: u64 = 10 * 60;
/// TTL for unfiltered listings.
pub const DEFAULT_LIST_TTL_SECS: u64 = 5 * 60;
/// TTL for filtered searches.
pub const DEFAULT_SEARCH_TTL_SECS: u64 = 3 * 60;
/// TTL of the in-process tier. Should stay at or below every global TTL.
pub const DEFAULT_LOCAL_TTL_SECS: u64 = 60;
/// Prefix prepended to every key the cache writes.
pub const DEFAULT_KEY_PREFIX: &str = "strata:";
/// Largest serialized value the cache will store (1 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;
/// Longest fully-qualified key the cache will store.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 1024;

/// Immutable cache configuration.
///
/// Read once at startup with [`CacheSettings::from_env`]; the cache never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// When `false` every read is a permanent miss and nothing is written.
    pub enabled: bool,
    /// Global TTL used when a caller passes no explicit TTL.
    pub default_ttl: Duration,
    /// Global TTL for entity-by-id entries.
    pub entity_ttl: Duration,
    /// Global TTL for listing entries.
    pub list_ttl: Duration,
    /// Global TTL for search entries.
    pub search_ttl: Duration,
    /// TTL of the in-process tier.
    pub local_ttl: Duration,
    /// Prefix for every fully-qualified key.
    pub key_prefix: String,
    /// Maximum serialized payload size in bytes.
    pub max_payload_bytes: usize,
    /// Maximum fully-qualified key length in bytes.
    pub max_key_length: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            entity_ttl: Duration::from_secs(DEFAULT_ENTITY_TTL_SECS),
            list_ttl: Duration::from_secs(DEFAULT_LIST_TTL_SECS),
            search_ttl: Duration::from_secs(DEFAULT_SEARCH_TTL_SECS),
            local_ttl: Duration::from_secs(DEFAULT_LOCAL_TTL_SECS),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }
}

impl CacheSettings {
    const ENV_ENABLED: &'static str = "STRATA_CACHE_ENABLED";
    const ENV_DEFAULT_TTL: &'static str = "STRATA_CACHE_DEFAULT_TTL_SECS";
    const ENV_ENTITY_TTL: &'static str = "STRATA_CACHE_ENTITY_TTL_SECS";
    const ENV_LIST_TTL: &'static str = "STRATA_CACHE_LIST_TTL_SECS";
    const ENV_SEARCH_TTL: &'static str = "STRATA_CACHE_SEARCH_TTL_SECS";
    const ENV_LOCAL_TTL: &'static str = "STRATA_CACHE_LOCAL_TTL_SECS";
    const ENV_KEY_PREFIX: &'static str = "STRATA_CACHE_KEY_PREFIX";
    const ENV_MAX_PAYLOAD_BYTES: &'static str = "STRATA_CACHE_MAX_PAYLOAD_BYTES";
    const ENV_MAX_KEY_LENGTH: &'static str = "STRATA_CACHE_MAX_KEY_LENGTH";

    /// Loads settings from `STRATA_CACHE_*` variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            enabled: parse_bool(Self::ENV_ENABLED, defaults.enabled)?,
            default_ttl: parse_secs(Self::ENV_DEFAULT_TTL, defaults.default_ttl)?,
            entity_ttl: parse_secs(Self::ENV_ENTITY_TTL, defaults.entity_ttl)?,
            list_ttl: parse_secs(Self::ENV_LIST_TTL, defaults.list_ttl)?,
            search_ttl: parse_secs(Self::ENV_SEARCH_TTL, defaults.search_ttl)?,
            local_ttl: parse_secs(Self::ENV_LOCAL_TTL, defaults.local_ttl)?,
            key_prefix: env::var(Self::ENV_KEY_PREFIX).unwrap_or(defaults.key_prefix),
            max_payload_bytes: parse_usize(
                Self::ENV_MAX_PAYLOAD_BYTES,
                defaults.max_payload_bytes,
            )?,
            max_key_length: parse_usize(Self::ENV_MAX_KEY_LENGTH, defaults.max_key_length)?,
        })
    }

    /// Rejects zero TTLs and zero size limits.
    ///
    /// A local TTL longer than a global TTL is not an error: the cache clamps it per entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ttls = [
            ("default_ttl", self.default_ttl),
            ("entity_ttl", self.entity_ttl),
            ("list_ttl", self.list_ttl),
            ("search_ttl", self.search_ttl),
            ("local_ttl", self.local_ttl),
        ];
        for (name, ttl) in ttls {
            if ttl.is_zero() {
                return Err(ConfigError::ZeroTtl { name });
            }
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::ZeroLimit {
                name: "max_payload_bytes",
            });
        }
        if self.max_key_length == 0 {
            return Err(ConfigError::ZeroLimit {
                name: "max_key_length",
            });
        }
        Ok(())
    }

    /// Returns `true` when the local TTL exceeds the default global TTL.
    pub fn local_ttl_exceeds_default(&self) -> bool {
        self.local_ttl > self.default_ttl
    }

    /// Settings with caching switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidBool { name, value }),
        },
        Err(_) => Ok(default),
    }
}

fn parse_secs(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|source| ConfigError::InvalidNumber {
                name,
                value,
                source,
            }),
        Err(_) => Ok(default),
    }
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .map_err(|source| ConfigError::InvalidNumber {
                name,
                value,
                source,
            }),
        Err(_) => Ok(default),
    }
}
