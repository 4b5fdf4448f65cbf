//! Customer CRUD handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use strata::cache::{DistributedStore, Pagination};
use strata::customers::{
    Customer, CustomerFilter, CustomerPatch, CustomerRepository, NewCustomer, Page,
};

use super::error::GatewayError;
use super::request_cancellation;
use super::state::HandlerState;

/// Query string of `GET /customers`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub page: Option<u32>,
    #[serde(alias = "pageSize")]
    pub page_size: Option<u32>,
    #[serde(alias = "sortBy")]
    pub sort_by: Option<String>,
    pub descending: Option<bool>,
    pub name: Option<String>,
    #[serde(alias = "cpf")]
    pub tax_id: Option<String>,
    pub email: Option<String>,
}

impl ListQuery {
    pub fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            sort_by: self.sort_by.clone(),
            descending: self.descending.unwrap_or(false),
        }
    }

    pub fn filter(&self) -> CustomerFilter {
        CustomerFilter {
            name: self.name.clone(),
            tax_id: self.tax_id.clone(),
            email: self.email.clone(),
        }
    }
}

#[tracing::instrument(skip(state))]
pub async fn list_customers_handler<R, D>(
    State(state): State<HandlerState<R, D>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Customer>>, GatewayError>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    let (cancel, _guard) = request_cancellation();
    let page = state
        .customers
        .list(&query.filter(), &query.pagination(), &cancel)
        .await?;
    Ok(Json(page))
}

#[tracing::instrument(skip(state))]
pub async fn get_customer_handler<R, D>(
    State(state): State<HandlerState<R, D>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>, GatewayError>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    let (cancel, _guard) = request_cancellation();
    let customer = state.customers.get_by_id(id, &cancel).await?;
    Ok(Json(customer))
}

#[tracing::instrument(skip(state, input))]
pub async fn create_customer_handler<R, D>(
    State(state): State<HandlerState<R, D>>,
    Json(input): Json<NewCustomer>,
) -> Result<(StatusCode, Json<Customer>), GatewayError>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    let (cancel, _guard) = request_cancellation();
    let customer = state.customers.create(&input, &cancel).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

#[tracing::instrument(skip(state, input))]
pub async fn update_customer_handler<R, D>(
    State(state): State<HandlerState<R, D>>,
    Path(id): Path<Uuid>,
    Json(input): Json<NewCustomer>,
) -> Result<Json<Customer>, GatewayError>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    let (cancel, _guard) = request_cancellation();
    let customer = state.customers.update(id, &input, &cancel).await?;
    Ok(Json(customer))
}

#[tracing::instrument(skip(state, patch))]
pub async fn patch_customer_handler<R, D>(
    State(state): State<HandlerState<R, D>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<CustomerPatch>,
) -> Result<Json<Customer>, GatewayError>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    if patch.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "patch must set at least one field".to_string(),
        ));
    }

    let (cancel, _guard) = request_cancellation();
    let customer = state.customers.patch(id, &patch, &cancel).await?;
    Ok(Json(customer))
}

#[tracing::instrument(skip(state))]
pub async fn delete_customer_handler<R, D>(
    State(state): State<HandlerState<R, D>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, GatewayError>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    let (cancel, _guard) = request_cancellation();
    state.customers.delete(id, &cancel).await?;
    Ok(StatusCode::NO_CONTENT)
}
