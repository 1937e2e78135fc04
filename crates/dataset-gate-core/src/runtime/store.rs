// crates/dataset-gate-core/src/runtime/store.rs
// ============================================================================
// Module: Dataset Gate In-Memory Collaborators
// Description: In-memory dataset manager and checkout ledger.
// Purpose: Provide deterministic collaborators without external storage.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides simple in-memory implementations of
//! [`DatasetManager`] and [`CheckoutManager`] for tests and single-node demos.
//! Nothing here survives a restart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::Dataset;
use crate::core::DatasetCheckout;
use crate::core::DatasetId;
use crate::core::Policy;
use crate::interfaces::CheckoutError;
use crate::interfaces::CheckoutManager;
use crate::interfaces::DatasetManager;
use crate::interfaces::DatasetManagerError;

// ============================================================================
// SECTION: Dataset Manager
// ============================================================================

/// In-memory dataset manager keyed by dataset identifier.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDatasetManager {
    /// Dataset map protected by a mutex.
    datasets: Arc<Mutex<BTreeMap<DatasetId, Dataset>>>,
}

impl InMemoryDatasetManager {
    /// Creates an empty dataset manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            datasets: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Runs `f` against the locked dataset map.
    fn with_datasets<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<DatasetId, Dataset>) -> Result<T, DatasetManagerError>,
    ) -> Result<T, DatasetManagerError> {
        let mut guard = self
            .datasets
            .lock()
            .map_err(|_| DatasetManagerError::Backend("dataset map mutex poisoned".to_string()))?;
        f(&mut guard)
    }
}

impl DatasetManager for InMemoryDatasetManager {
    fn dataset_ids(&self) -> Result<Vec<DatasetId>, DatasetManagerError> {
        self.with_datasets(|datasets| Ok(datasets.keys().cloned().collect()))
    }

    fn dataset_exists(&self, id: &DatasetId) -> Result<bool, DatasetManagerError> {
        self.with_datasets(|datasets| Ok(datasets.contains_key(id)))
    }

    fn dataset(&self, id: &DatasetId) -> Result<Option<Dataset>, DatasetManagerError> {
        self.with_datasets(|datasets| Ok(datasets.get(id).cloned()))
    }

    fn dataset_policy(&self, id: &DatasetId) -> Result<Option<Policy>, DatasetManagerError> {
        self.with_datasets(|datasets| Ok(datasets.get(id).map(|dataset| dataset.policy)))
    }

    fn insert_dataset(&self, dataset: Dataset) -> Result<(), DatasetManagerError> {
        if dataset.id.is_empty() {
            return Err(DatasetManagerError::Rejected(
                "dataset identifier must not be empty".to_string(),
            ));
        }
        self.with_datasets(|datasets| {
            if datasets.contains_key(&dataset.id) {
                return Err(DatasetManagerError::AlreadyExists(dataset.id));
            }
            datasets.insert(dataset.id.clone(), dataset);
            Ok(())
        })
    }

    fn remove_dataset(&self, id: &DatasetId) -> Result<(), DatasetManagerError> {
        self.with_datasets(|datasets| {
            datasets
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| DatasetManagerError::NotFound(id.clone()))
        })
    }

    fn set_dataset_policy(
        &self,
        id: &DatasetId,
        policy: Policy,
    ) -> Result<(), DatasetManagerError> {
        self.with_datasets(|datasets| {
            let dataset =
                datasets.get_mut(id).ok_or_else(|| DatasetManagerError::NotFound(id.clone()))?;
            dataset.policy = policy;
            Ok(())
        })
    }
}

// ============================================================================
// SECTION: Checkout Ledger
// ============================================================================

/// In-memory, append-only checkout ledger.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCheckoutLedger {
    /// Recorded checkouts in submission order.
    records: Arc<Mutex<Vec<DatasetCheckout>>>,
}

impl InMemoryCheckoutLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns every recorded checkout in submission order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when the ledger lock is poisoned.
    pub fn all(&self) -> Result<Vec<DatasetCheckout>, CheckoutError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| CheckoutError::Backend("checkout ledger mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }
}

impl CheckoutManager for InMemoryCheckoutLedger {
    fn checkout(&self, checkout: &DatasetCheckout) -> Result<(), CheckoutError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| CheckoutError::Backend("checkout ledger mutex poisoned".to_string()))?;
        guard.push(checkout.clone());
        Ok(())
    }

    fn dataset_checkouts(&self, id: &DatasetId) -> Result<Vec<DatasetCheckout>, CheckoutError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| CheckoutError::Backend("checkout ledger mutex poisoned".to_string()))?;
        Ok(guard.iter().filter(|record| &record.dataset_id == id).cloned().collect())
    }
}
