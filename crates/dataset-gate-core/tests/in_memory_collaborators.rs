// crates/dataset-gate-core/tests/in_memory_collaborators.rs
// ============================================================================
// Module: In-Memory Collaborator Tests
// Description: Behavior of the in-memory dataset manager and checkout ledger.
// Purpose: Pin the collaborator contract the gateway relies on.
// Dependencies: dataset-gate-core
// ============================================================================

//! Contract tests for the in-memory collaborators.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

use dataset_gate_core::CheckoutManager;
use dataset_gate_core::Client;
use dataset_gate_core::ClientId;
use dataset_gate_core::Dataset;
use dataset_gate_core::DatasetCheckout;
use dataset_gate_core::DatasetId;
use dataset_gate_core::DatasetManager;
use dataset_gate_core::DatasetManagerError;
use dataset_gate_core::InMemoryCheckoutLedger;
use dataset_gate_core::InMemoryDatasetManager;
use dataset_gate_core::Policy;
use dataset_gate_core::Timestamp;

/// Builds a checkout record for the given dataset and client.
fn checkout(dataset: &str, client: &str, at: u64) -> DatasetCheckout {
    DatasetCheckout {
        dataset_id: DatasetId::new(dataset),
        client: Client::new(ClientId::new(client)),
        checked_out_at: Timestamp::from_unix_millis(at),
    }
}

#[test]
fn empty_manager_lists_no_ids() {
    let manager = InMemoryDatasetManager::new();
    assert!(manager.dataset_ids().unwrap().is_empty());
}

#[test]
fn insert_then_list_is_sorted() {
    let manager = InMemoryDatasetManager::new();
    manager.insert_dataset(Dataset::new(DatasetId::new("b"))).unwrap();
    manager.insert_dataset(Dataset::new(DatasetId::new("a"))).unwrap();
    let ids = manager.dataset_ids().unwrap();
    assert_eq!(ids, vec![DatasetId::new("a"), DatasetId::new("b")]);
}

#[test]
fn duplicate_insert_is_rejected() {
    let manager = InMemoryDatasetManager::new();
    manager.insert_dataset(Dataset::new(DatasetId::new("a"))).unwrap();
    let err = manager.insert_dataset(Dataset::new(DatasetId::new("a"))).unwrap_err();
    assert!(matches!(err, DatasetManagerError::AlreadyExists(_)));
}

#[test]
fn empty_identifier_is_rejected() {
    let manager = InMemoryDatasetManager::new();
    let err = manager.insert_dataset(Dataset::new(DatasetId::new(""))).unwrap_err();
    assert!(matches!(err, DatasetManagerError::Rejected(_)));
}

#[test]
fn remove_unknown_reports_not_found() {
    let manager = InMemoryDatasetManager::new();
    let err = manager.remove_dataset(&DatasetId::new("missing")).unwrap_err();
    assert!(matches!(err, DatasetManagerError::NotFound(_)));
}

#[test]
fn policy_updates_are_visible() {
    let manager = InMemoryDatasetManager::new();
    let id = DatasetId::new("a");
    manager.insert_dataset(Dataset::new(id.clone())).unwrap();
    assert_eq!(manager.dataset_policy(&id).unwrap(), Some(Policy::default()));
    manager.set_dataset_policy(&id, Policy::with_content(true)).unwrap();
    assert!(manager.dataset(&id).unwrap().unwrap().policy.content);
    assert!(manager.dataset_policy(&DatasetId::new("b")).unwrap().is_none());
}

#[test]
fn ledger_filters_by_dataset() {
    let ledger = InMemoryCheckoutLedger::new();
    ledger.checkout(&checkout("a", "alice", 1)).unwrap();
    ledger.checkout(&checkout("b", "bob", 2)).unwrap();
    ledger.checkout(&checkout("a", "bob", 3)).unwrap();

    let for_a = ledger.dataset_checkouts(&DatasetId::new("a")).unwrap();
    assert_eq!(for_a.len(), 2);
    assert_eq!(for_a[0].client.id.as_str(), "alice");
    assert_eq!(for_a[1].checked_out_at.as_unix_millis(), 3);
    assert_eq!(ledger.all().unwrap().len(), 3);
}
