//! Customer operations with read-through caching.
//!
//! Reads go through [`TieredCache::get_or_create`]. Every successful write evicts the
//! affected entity key plus all listing and search entries, since any write can change
//! which customers a listing or search returns. Invalidation failures are logged and never
//! fail the write.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::error::{CustomerError, CustomerResult};
use super::model::{
    Customer, CustomerFilter, CustomerPatch, NewCustomer, Page, ValidCustomer,
    validate_pagination,
};
use super::repository::CustomerRepository;
use crate::cache::{DistributedStore, Invalidation, KeyCodec, LocalOnly, Pagination, TieredCache};

/// Key namespace for customer entries.
pub const CUSTOMER_KEYS: KeyCodec = KeyCodec::new("customers", "name");

pub struct CustomerService<R, D: DistributedStore = LocalOnly> {
    repo: Arc<R>,
    cache: Arc<TieredCache<D>>,
}

impl<R, D: DistributedStore> Clone for CustomerService<R, D> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<R, D: DistributedStore> std::fmt::Debug for CustomerService<R, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerService")
            .field("cache", &self.cache)
            .finish()
    }
}

impl<R: CustomerRepository, D: DistributedStore> CustomerService<R, D> {
    pub fn new(repo: Arc<R>, cache: Arc<TieredCache<D>>) -> Self {
        Self { repo, cache }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn cache(&self) -> &Arc<TieredCache<D>> {
        &self.cache
    }

    #[instrument(skip(self, cancel))]
    pub async fn get_by_id(&self, id: Uuid, cancel: &CancellationToken) -> CustomerResult<Customer> {
        let key = CUSTOMER_KEYS.entity_key(id);
        let ttl = Some(self.cache.settings().entity_ttl);
        let repo = Arc::clone(&self.repo);

        self.cache
            .get_or_create(&key, ttl, cancel, |_| async move {
                repo.get(id).await?.ok_or(CustomerError::NotFound { id })
            })
            .await
    }

    /// Lists customers. Without filters the result is cached under a listing key; with any
    /// filter under a search key.
    #[instrument(skip(self, cancel))]
    pub async fn list(
        &self,
        filter: &CustomerFilter,
        pagination: &Pagination,
        cancel: &CancellationToken,
    ) -> CustomerResult<Page<Customer>> {
        validate_pagination(pagination)?;
        let filter = filter.normalize()?;
        let settings = self.cache.settings();

        let (key, ttl) = if filter.is_empty() {
            (CUSTOMER_KEYS.list_key(pagination), settings.list_ttl)
        } else {
            (
                CUSTOMER_KEYS.search_key(&filter.as_pairs(), pagination),
                settings.search_ttl,
            )
        };

        let repo = Arc::clone(&self.repo);
        self.cache
            .get_or_create(&key, Some(ttl), cancel, |_| async move {
                repo.list(&filter, pagination).await
            })
            .await
    }

    #[instrument(skip(self, input, cancel))]
    pub async fn create(
        &self,
        input: &NewCustomer,
        cancel: &CancellationToken,
    ) -> CustomerResult<Customer> {
        let valid = input.validate()?;
        self.ensure_unique(&valid, None).await?;
        ensure_not_cancelled(cancel)?;

        let customer = Customer::create(valid);
        self.repo.insert(customer.clone()).await?;
        info!(id = %customer.id, "Customer created");

        self.invalidate_listings(cancel).await;
        Ok(customer)
    }

    /// Replaces every field of an existing customer.
    #[instrument(skip(self, input, cancel))]
    pub async fn update(
        &self,
        id: Uuid,
        input: &NewCustomer,
        cancel: &CancellationToken,
    ) -> CustomerResult<Customer> {
        let valid = input.validate()?;
        self.apply(id, valid, cancel).await
    }

    /// Updates the provided fields of an existing customer.
    #[instrument(skip(self, patch, cancel))]
    pub async fn patch(
        &self,
        id: Uuid,
        patch: &CustomerPatch,
        cancel: &CancellationToken,
    ) -> CustomerResult<Customer> {
        let current = self.load(id).await?;
        let valid = patch.merge(&current)?;
        self.apply(id, valid, cancel).await
    }

    #[instrument(skip(self, cancel))]
    pub async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> CustomerResult<()> {
        ensure_not_cancelled(cancel)?;
        if !self.repo.delete(id).await? {
            return Err(CustomerError::NotFound { id });
        }
        info!(id = %id, "Customer deleted");

        self.invalidate_customer(id, cancel).await;
        Ok(())
    }

    /// Evicts the entity entry for `id` and every listing and search entry.
    pub async fn invalidate_customer(&self, id: Uuid, cancel: &CancellationToken) -> Invalidation {
        let mut report = self
            .cache
            .remove(&CUSTOMER_KEYS.entity_key(id), cancel)
            .await;
        report.merge(self.invalidate_listings(cancel).await);
        if !report.is_clean() {
            warn!(id = %id, failures = report.failures, "Customer cache invalidation incomplete");
        }
        report
    }

    /// Evicts every listing and search entry.
    pub async fn invalidate_listings(&self, cancel: &CancellationToken) -> Invalidation {
        let mut report = self
            .cache
            .remove_by_pattern(&CUSTOMER_KEYS.list_pattern(), cancel)
            .await;
        report.merge(
            self.cache
                .remove_by_pattern(&CUSTOMER_KEYS.search_pattern(), cancel)
                .await,
        );
        if !report.is_clean() {
            warn!(failures = report.failures, "Listing cache invalidation incomplete");
        }
        report
    }

    async fn load(&self, id: Uuid) -> CustomerResult<Customer> {
        self.repo
            .get(id)
            .await?
            .ok_or(CustomerError::NotFound { id })
    }

    async fn apply(
        &self,
        id: Uuid,
        valid: ValidCustomer,
        cancel: &CancellationToken,
    ) -> CustomerResult<Customer> {
        let mut customer = self.load(id).await?;
        self.ensure_unique(&valid, Some(id)).await?;
        ensure_not_cancelled(cancel)?;

        customer.replace(valid);
        if !self.repo.update(customer.clone()).await? {
            return Err(CustomerError::NotFound { id });
        }
        info!(id = %id, "Customer updated");

        self.invalidate_customer(id, cancel).await;
        Ok(customer)
    }

    async fn ensure_unique(&self, valid: &ValidCustomer, except: Option<Uuid>) -> CustomerResult<()> {
        let is_other = |c: &Customer| Some(c.id) != except;

        if self
            .repo
            .find_by_tax_id(&valid.tax_id)
            .await?
            .is_some_and(|c| is_other(&c))
        {
            return Err(CustomerError::Conflict {
                field: "tax_id",
                value: valid.tax_id.clone(),
            });
        }
        if self
            .repo
            .find_by_email(&valid.email)
            .await?
            .is_some_and(|c| is_other(&c))
        {
            return Err(CustomerError::Conflict {
                field: "email",
                value: valid.email.clone(),
            });
        }
        Ok(())
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> CustomerResult<()> {
    if cancel.is_cancelled() {
        return Err(CustomerError::Cancelled);
    }
    Ok(())
}
