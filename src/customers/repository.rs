//! Customer persistence.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use uuid::Uuid;

use super::error::CustomerResult;
use super::model::{Customer, CustomerFilter, Page};
use crate::cache::Pagination;

/// Storage for customer records.
pub trait CustomerRepository: Send + Sync {
    fn get(&self, id: Uuid) -> impl Future<Output = CustomerResult<Option<Customer>>> + Send;

    /// Customer holding `tax_id`, if any.
    fn find_by_tax_id(
        &self,
        tax_id: &str,
    ) -> impl Future<Output = CustomerResult<Option<Customer>>> + Send;

    /// Customer holding `email`, if any.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = CustomerResult<Option<Customer>>> + Send;

    /// Filtered, sorted, paginated listing. `filter` is already normalized.
    fn list(
        &self,
        filter: &CustomerFilter,
        pagination: &Pagination,
    ) -> impl Future<Output = CustomerResult<Page<Customer>>> + Send;

    fn insert(&self, customer: Customer) -> impl Future<Output = CustomerResult<()>> + Send;

    /// Replaces an existing record. Returns `false` if it does not exist.
    fn update(&self, customer: Customer) -> impl Future<Output = CustomerResult<bool>> + Send;

    /// Returns `false` if the record does not exist.
    fn delete(&self, id: Uuid) -> impl Future<Output = CustomerResult<bool>> + Send;
}

/// Process-local repository backed by a hash map.
#[derive(Debug, Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<Uuid, Customer>>,
    reads: AtomicUsize,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` and `list` calls served.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.customers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.read().is_empty()
    }

    fn find(&self, predicate: impl Fn(&Customer) -> bool) -> Option<Customer> {
        self.customers.read().values().find(|c| predicate(c)).cloned()
    }
}

fn sort_customers(customers: &mut [Customer], pagination: &Pagination) {
    let field = pagination
        .sort_by
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();

    customers.sort_by(|a, b| {
        let ordering = match field.as_str() {
            "tax_id" => a.tax_id.cmp(&b.tax_id),
            "email" => a.email.cmp(&b.email),
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    });
    if pagination.descending {
        customers.reverse();
    }
}

impl CustomerRepository for InMemoryCustomerRepository {
    async fn get(&self, id: Uuid) -> CustomerResult<Option<Customer>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.customers.read().get(&id).cloned())
    }

    async fn find_by_tax_id(&self, tax_id: &str) -> CustomerResult<Option<Customer>> {
        Ok(self.find(|c| c.tax_id == tax_id))
    }

    async fn find_by_email(&self, email: &str) -> CustomerResult<Option<Customer>> {
        Ok(self.find(|c| c.email == email))
    }

    async fn list(
        &self,
        filter: &CustomerFilter,
        pagination: &Pagination,
    ) -> CustomerResult<Page<Customer>> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let mut matching: Vec<Customer> = self
            .customers
            .read()
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        sort_customers(&mut matching, pagination);

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.page_size as usize)
            .collect();

        Ok(Page::new(items, pagination, total))
    }

    async fn insert(&self, customer: Customer) -> CustomerResult<()> {
        self.customers.write().insert(customer.id, customer);
        Ok(())
    }

    async fn update(&self, customer: Customer) -> CustomerResult<bool> {
        let mut customers = self.customers.write();
        match customers.get_mut(&customer.id) {
            Some(existing) => {
                *existing = customer;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> CustomerResult<bool> {
        Ok(self.customers.write().remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customers::model::ValidCustomer;

    fn customer(name: &str, tax_id: &str, email: &str) -> Customer {
        Customer::create(ValidCustomer {
            name: name.to_string(),
            tax_id: tax_id.to_string(),
            email: email.to_string(),
        })
    }

    async fn seeded() -> InMemoryCustomerRepository {
        let repo = InMemoryCustomerRepository::new();
        for c in [
            customer("Carla Dias", "39053344705", "carla@example.com"),
            customer("ana souza", "52998224725", "ana@example.com"),
            customer("Bruno Lima", "11144477735", "bruno@example.com"),
        ] {
            repo.insert(c).await.expect("insert");
        }
        repo
    }

    #[tokio::test]
    async fn test_list_sorts_case_insensitively_by_name() {
        let repo = seeded().await;
        let page = repo
            .list(&CustomerFilter::default(), &Pagination::new(1, 10))
            .await
            .expect("list");

        let names: Vec<_> = page.items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ana souza", "Bruno Lima", "Carla Dias"]);
        assert_eq!(page.total_count, 3);
    }

    #[tokio::test]
    async fn test_list_paginates_and_sorts_descending() {
        let repo = seeded().await;
        let page = repo
            .list(
                &CustomerFilter::default(),
                &Pagination::new(2, 2).sorted_by("tax_id", true),
            )
            .await
            .expect("list");

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].tax_id, "11144477735");
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let repo = seeded().await;
        let filter = CustomerFilter {
            name: Some("LIMA".to_string()),
            ..Default::default()
        };
        let page = repo
            .list(&filter, &Pagination::new(1, 10))
            .await
            .expect("list");

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].email, "bruno@example.com");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let repo = InMemoryCustomerRepository::new();
        let c = customer("Ana Souza", "52998224725", "ana@example.com");

        assert!(!repo.update(c.clone()).await.expect("update"));
        assert!(!repo.delete(c.id).await.expect("delete"));

        repo.insert(c.clone()).await.expect("insert");
        assert!(repo.update(c.clone()).await.expect("update"));
        assert!(repo.delete(c.id).await.expect("delete"));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_unique_fields() {
        let repo = seeded().await;
        assert!(
            repo.find_by_tax_id("52998224725")
                .await
                .expect("find")
                .is_some()
        );
        assert!(
            repo.find_by_email("nobody@example.com")
                .await
                .expect("find")
                .is_none()
        );
    }
}
