//! Cache diagnostics. Every handler answers 403 outside the development environment.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use strata::cache::{DistributedStatus, DistributedStore, Invalidation};
use strata::customers::CustomerRepository;

use super::error::GatewayError;
use super::request_cancellation;
use super::state::HandlerState;

#[derive(Debug, Serialize)]
pub struct TtlSeconds {
    pub default: u64,
    pub entity: u64,
    pub list: u64,
    pub search: u64,
    pub local: u64,
}

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub environment: &'static str,
    pub enabled: bool,
    pub key_prefix: String,
    pub ttl_seconds: TtlSeconds,
    pub max_payload_bytes: usize,
    pub max_key_length: usize,
    pub local_entries: u64,
    pub tracked_keys: usize,
    pub distributed: DistributedStatus,
}

#[derive(Debug, Serialize)]
pub struct TrackedKey {
    pub key: String,
    pub written_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CacheKeysResponse {
    pub count: usize,
    pub keys: Vec<TrackedKey>,
}

#[derive(Debug, Serialize)]
pub struct InvalidationResponse {
    pub target: String,
    #[serde(flatten)]
    pub report: Invalidation,
}

fn ensure_development<R, D>(state: &HandlerState<R, D>) -> Result<(), GatewayError>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    if state.environment.is_development() {
        Ok(())
    } else {
        Err(GatewayError::Forbidden)
    }
}

#[tracing::instrument(skip(state))]
pub async fn cache_stats_handler<R, D>(
    State(state): State<HandlerState<R, D>>,
) -> Result<Json<CacheStatsResponse>, GatewayError>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    ensure_development(&state)?;

    let cache = state.cache();
    let settings = cache.settings();
    let distributed = cache.distributed_status().await;

    Ok(Json(CacheStatsResponse {
        environment: state.environment.as_str(),
        enabled: cache.is_enabled(),
        key_prefix: settings.key_prefix.clone(),
        ttl_seconds: TtlSeconds {
            default: settings.default_ttl.as_secs(),
            entity: settings.entity_ttl.as_secs(),
            list: settings.list_ttl.as_secs(),
            search: settings.search_ttl.as_secs(),
            local: settings.local_ttl.as_secs(),
        },
        max_payload_bytes: settings.max_payload_bytes,
        max_key_length: settings.max_key_length,
        local_entries: cache.local().len(),
        tracked_keys: cache.tracked_key_count(),
        distributed,
    }))
}

#[tracing::instrument(skip(state))]
pub async fn cache_keys_handler<R, D>(
    State(state): State<HandlerState<R, D>>,
) -> Result<Json<CacheKeysResponse>, GatewayError>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    ensure_development(&state)?;

    let keys: Vec<TrackedKey> = state
        .cache()
        .tracked_entries()
        .into_iter()
        .map(|(key, written_at)| TrackedKey { key, written_at })
        .collect();

    Ok(Json(CacheKeysResponse {
        count: keys.len(),
        keys,
    }))
}

#[tracing::instrument(skip(state))]
pub async fn clear_cache_handler<R, D>(
    State(state): State<HandlerState<R, D>>,
) -> Result<Json<InvalidationResponse>, GatewayError>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    ensure_development(&state)?;

    let (cancel, _guard) = request_cancellation();
    let report = state.cache().clear(&cancel).await;
    info!(
        local_removed = report.local_removed,
        distributed_removed = report.distributed_removed,
        failures = report.failures,
        "Cache cleared via diagnostics"
    );

    Ok(Json(InvalidationResponse {
        target: format!("{}*", state.cache().settings().key_prefix),
        report,
    }))
}

#[tracing::instrument(skip(state))]
pub async fn remove_cache_key_handler<R, D>(
    State(state): State<HandlerState<R, D>>,
    Path(key): Path<String>,
) -> Result<Json<InvalidationResponse>, GatewayError>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    ensure_development(&state)?;

    let cache = state.cache();
    let logical = key
        .strip_prefix(cache.settings().key_prefix.as_str())
        .unwrap_or(&key);

    let (cancel, _guard) = request_cancellation();
    let report = cache.remove(logical, &cancel).await;

    Ok(Json(InvalidationResponse {
        target: logical.to_string(),
        report,
    }))
}
