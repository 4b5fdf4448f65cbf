//! Customer service across several instances sharing one repository and one store.

mod common;

use std::sync::Arc;

use common::fixtures::{ana, bruno, full_key, service_instance};
use strata::cache::{MockDistributedStore, Pagination};
use strata::customers::{CUSTOMER_KEYS, CustomerFilter, CustomerPatch, InMemoryCustomerRepository};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_second_instance_reads_from_distributed_tier() {
    let repository = Arc::new(InMemoryCustomerRepository::new());
    let store = MockDistributedStore::new();
    let first = service_instance(&repository, &store);
    let second = service_instance(&repository, &store);
    let cancel = CancellationToken::new();

    let created = first.create(&ana(), &cancel).await.unwrap();
    first.get_by_id(created.id, &cancel).await.unwrap();

    let fetched = second.get_by_id(created.id, &cancel).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(repository.read_count(), 1);

    let key = full_key(&CUSTOMER_KEYS.entity_key(created.id));
    assert!(second.cache().local().contains(&key));
    assert_eq!(second.cache().tracked_keys(), vec![key]);
}

#[tokio::test]
async fn test_write_on_one_instance_evicts_shared_listings() {
    let repository = Arc::new(InMemoryCustomerRepository::new());
    let store = MockDistributedStore::new();
    let reader = service_instance(&repository, &store);
    let writer = service_instance(&repository, &store);
    let cancel = CancellationToken::new();
    let page = Pagination::new(1, 10);

    reader.create(&ana(), &cancel).await.unwrap();
    let listed = reader
        .list(&CustomerFilter::default(), &page, &cancel)
        .await
        .unwrap();
    assert_eq!(listed.total_count, 1);

    let list_key = full_key(&CUSTOMER_KEYS.list_key(&page));
    assert!(store.contains(&list_key));

    writer.create(&bruno(), &cancel).await.unwrap();
    assert!(!store.contains(&list_key));

    let fresh = writer
        .list(&CustomerFilter::default(), &page, &cancel)
        .await
        .unwrap();
    assert_eq!(fresh.total_count, 2);
}

#[tokio::test]
async fn test_full_lifecycle_keeps_unrelated_entries() {
    let repository = Arc::new(InMemoryCustomerRepository::new());
    let store = MockDistributedStore::new();
    let service = service_instance(&repository, &store);
    let cancel = CancellationToken::new();

    let a = service.create(&ana(), &cancel).await.unwrap();
    let b = service.create(&bruno(), &cancel).await.unwrap();
    service.get_by_id(a.id, &cancel).await.unwrap();
    service.get_by_id(b.id, &cancel).await.unwrap();
    let search = CustomerFilter {
        email: Some("BRUNO@example.com".to_string()),
        ..Default::default()
    };
    service
        .list(&search, &Pagination::new(1, 10), &cancel)
        .await
        .unwrap();
    assert_eq!(service.cache().tracked_key_count(), 3);

    let patch = CustomerPatch {
        name: Some("Ana Maria Souza".to_string()),
        ..Default::default()
    };
    service.patch(a.id, &patch, &cancel).await.unwrap();

    let remaining = service.cache().tracked_keys();
    assert_eq!(remaining, vec![full_key(&CUSTOMER_KEYS.entity_key(b.id))]);

    let reads = repository.read_count();
    service.get_by_id(b.id, &cancel).await.unwrap();
    assert_eq!(repository.read_count(), reads);

    service.delete(a.id, &cancel).await.unwrap();
    let page = service
        .list(&CustomerFilter::default(), &Pagination::new(1, 10), &cancel)
        .await
        .unwrap();
    assert_eq!(page.items, vec![b]);
}

#[tokio::test]
async fn test_store_outage_does_not_affect_results() {
    let repository = Arc::new(InMemoryCustomerRepository::new());
    let store = MockDistributedStore::new();
    let service = service_instance(&repository, &store);
    let cancel = CancellationToken::new();

    store.set_available(false);
    let created = service.create(&ana(), &cancel).await.unwrap();
    assert_eq!(service.get_by_id(created.id, &cancel).await.unwrap(), created);
    assert_eq!(service.get_by_id(created.id, &cancel).await.unwrap(), created);
    assert_eq!(repository.read_count(), 1);
    assert!(store.is_empty());

    store.set_available(true);
    store.fail_deletes(true);
    store.fail_scan(true);
    service.delete(created.id, &cancel).await.unwrap();
    assert!(service.get_by_id(created.id, &cancel).await.is_err());
}

#[tokio::test]
async fn test_instance_booted_during_outage_invalidates_after_recovery() {
    let repository = Arc::new(InMemoryCustomerRepository::new());
    let store = MockDistributedStore::new();
    store.set_available(false);
    let booted_in_outage = service_instance(&repository, &store);
    store.set_available(true);
    let peer = service_instance(&repository, &store);
    let cancel = CancellationToken::new();

    let created = booted_in_outage.create(&ana(), &cancel).await.unwrap();
    peer.get_by_id(created.id, &cancel).await.unwrap();
    assert!(store.contains(&full_key(&CUSTOMER_KEYS.entity_key(created.id))));

    booted_in_outage.delete(created.id, &cancel).await.unwrap();

    let fresh = service_instance(&repository, &store);
    assert!(fresh.get_by_id(created.id, &cancel).await.is_err());
    assert!(store.is_empty());
}
