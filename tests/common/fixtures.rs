//! Cache and customer fixtures.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use strata::cache::{DistributedStore, LocalOnly, MockDistributedStore, TieredCache};
use strata::config::CacheSettings;
use strata::customers::{CustomerService, InMemoryCustomerRepository, NewCustomer};
use tokio_util::sync::CancellationToken;

pub const TEST_PREFIX: &str = "it:";

pub fn test_settings() -> CacheSettings {
    CacheSettings {
        key_prefix: TEST_PREFIX.to_string(),
        ..CacheSettings::default()
    }
}

pub fn disabled_settings() -> CacheSettings {
    CacheSettings {
        enabled: false,
        ..test_settings()
    }
}

pub fn cache_with_store() -> (TieredCache<MockDistributedStore>, MockDistributedStore) {
    let store = MockDistributedStore::new();
    (TieredCache::with_store(test_settings(), store.clone()), store)
}

pub fn local_cache() -> TieredCache<LocalOnly> {
    TieredCache::local_only(test_settings())
}

pub fn full_key(key: &str) -> String {
    format!("{TEST_PREFIX}{key}")
}

/// Factory invocation counter.
#[derive(Debug, Default)]
pub struct Calls(AtomicUsize);

impl Calls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// `get_or_create` with a counting factory that yields `value`.
pub async fn fetch<D: DistributedStore>(
    cache: &TieredCache<D>,
    key: &str,
    calls: &Calls,
    value: &str,
) -> String {
    let value = value.to_string();
    cache
        .get_or_create(key, None, &CancellationToken::new(), |_| async move {
            calls.bump();
            Ok::<_, Infallible>(value)
        })
        .await
        .unwrap()
}

pub type MockService = CustomerService<InMemoryCustomerRepository, MockDistributedStore>;

/// A service instance over a shared repository and store, like one server in a fleet.
pub fn service_instance(
    repository: &Arc<InMemoryCustomerRepository>,
    store: &MockDistributedStore,
) -> MockService {
    CustomerService::new(
        Arc::clone(repository),
        Arc::new(TieredCache::with_store(test_settings(), store.clone())),
    )
}

pub fn customer(name: &str, tax_id: &str, email: &str) -> NewCustomer {
    NewCustomer {
        name: name.to_string(),
        tax_id: tax_id.to_string(),
        email: email.to_string(),
    }
}

pub fn ana() -> NewCustomer {
    customer("Ana Souza", "52998224725", "ana@example.com")
}

pub fn bruno() -> NewCustomer {
    customer("Bruno Lima", "11144477735", "bruno@example.com")
}
