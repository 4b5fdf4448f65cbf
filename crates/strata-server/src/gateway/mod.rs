//! HTTP gateway (Axum) for the customer registry and cache diagnostics.
//!
//! This module is primarily used by the `strata` server binary.

#![allow(missing_docs)]

pub mod customers;
pub mod diagnostics;
pub mod error;
pub mod state;

#[cfg(test)]
mod handler_tests;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use tokio_util::sync::{CancellationToken, DropGuard};
use tower_http::trace::TraceLayer;

pub use customers::{
    create_customer_handler, delete_customer_handler, get_customer_handler,
    list_customers_handler, patch_customer_handler, update_customer_handler,
};
pub use diagnostics::{
    cache_keys_handler, cache_stats_handler, clear_cache_handler, remove_cache_key_handler,
};
pub use error::GatewayError;
pub use state::HandlerState;

use strata::cache::DistributedStore;
use strata::customers::CustomerRepository;

const STATUS_READY: &str = "ready";

pub fn create_router_with_state<R, D>(state: HandlerState<R, D>) -> Router
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler::<R, D>))
        .route(
            "/customers",
            get(list_customers_handler::<R, D>).post(create_customer_handler::<R, D>),
        )
        .route(
            "/customers/{id}",
            get(get_customer_handler::<R, D>)
                .put(update_customer_handler::<R, D>)
                .patch(patch_customer_handler::<R, D>)
                .delete(delete_customer_handler::<R, D>),
        )
        .route("/cache/stats", get(cache_stats_handler::<R, D>))
        .route("/cache/keys", get(cache_keys_handler::<R, D>))
        .route("/cache/clear", delete(clear_cache_handler::<R, D>))
        .route("/cache/key/{key}", delete(remove_cache_key_handler::<R, D>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Token cancelled when the returned guard drops, i.e. when the handler finishes or the
/// client goes away.
pub(crate) fn request_cancellation() -> (CancellationToken, DropGuard) {
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    (cancel, guard)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub cache: &'static str,
    pub distributed: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response()
}

/// Always answers 200: a missing distributed tier only degrades the cache to local-only.
#[tracing::instrument(skip(state))]
pub async fn ready_handler<R, D>(State(state): State<HandlerState<R, D>>) -> Response
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    let cache = state.cache();
    let distributed = cache.distributed_status().await;

    let components = ComponentStatus {
        http: STATUS_READY,
        cache: if cache.is_enabled() {
            "enabled"
        } else {
            "disabled"
        },
        distributed: match (distributed.configured, distributed.connected) {
            (false, _) => "local_only",
            (true, true) => STATUS_READY,
            (true, false) => "unavailable",
        },
    };

    let status = if distributed.configured && !distributed.connected {
        "degraded"
    } else {
        "ok"
    };

    (
        StatusCode::OK,
        Json(ReadyResponse { status, components }),
    )
        .into_response()
}
