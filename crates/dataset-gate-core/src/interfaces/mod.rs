// crates/dataset-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Dataset Gate Interfaces
// Description: Collaborator contracts for dataset storage and checkout ledgers.
// Purpose: Keep the gateway independent of storage and ledger internals.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The gateway never owns dataset or checkout storage. It talks to a
//! [`DatasetManager`] for existence, policy, insert, and remove, and to a
//! [`CheckoutManager`] for audit submission. Implementations must be safe to
//! call from concurrent request tasks and handle their own synchronization.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Dataset;
use crate::core::DatasetCheckout;
use crate::core::DatasetId;
use crate::core::Policy;

// ============================================================================
// SECTION: Dataset Manager
// ============================================================================

/// Dataset manager errors.
#[derive(Debug, Error)]
pub enum DatasetManagerError {
    /// A dataset with the same identifier is already registered.
    #[error("dataset '{0}' already exists")]
    AlreadyExists(DatasetId),
    /// The dataset is not registered.
    #[error("dataset '{0}' is not indexed by the node")]
    NotFound(DatasetId),
    /// The manager refused the operation.
    #[error("dataset manager rejected request: {0}")]
    Rejected(String),
    /// The backing store failed.
    #[error("dataset manager error: {0}")]
    Backend(String),
}

/// Dataset storage and indexing collaborator.
pub trait DatasetManager: Send + Sync {
    /// Lists all registered dataset identifiers in a stable order.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetManagerError`] when the listing fails.
    fn dataset_ids(&self) -> Result<Vec<DatasetId>, DatasetManagerError>;

    /// Returns whether the dataset is registered.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetManagerError`] when the lookup fails.
    fn dataset_exists(&self, id: &DatasetId) -> Result<bool, DatasetManagerError>;

    /// Loads a dataset record.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetManagerError`] when the lookup fails.
    fn dataset(&self, id: &DatasetId) -> Result<Option<Dataset>, DatasetManagerError>;

    /// Loads the dataset policy, or `None` when the dataset is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetManagerError`] when the lookup fails.
    fn dataset_policy(&self, id: &DatasetId) -> Result<Option<Policy>, DatasetManagerError>;

    /// Registers a new dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetManagerError::AlreadyExists`] for duplicates, or another
    /// variant when the manager refuses the insert.
    fn insert_dataset(&self, dataset: Dataset) -> Result<(), DatasetManagerError>;

    /// Deregisters a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetManagerError::NotFound`] when the dataset is unknown.
    fn remove_dataset(&self, id: &DatasetId) -> Result<(), DatasetManagerError>;

    /// Replaces the dataset policy.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetManagerError::NotFound`] when the dataset is unknown.
    fn set_dataset_policy(&self, id: &DatasetId, policy: Policy)
    -> Result<(), DatasetManagerError>;
}

// ============================================================================
// SECTION: Checkout Manager
// ============================================================================

/// Checkout ledger errors.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The ledger refused the record.
    #[error("checkout rejected: {0}")]
    Rejected(String),
    /// The backing ledger failed.
    #[error("checkout ledger error: {0}")]
    Backend(String),
}

/// Checkout ledger collaborator.
pub trait CheckoutManager: Send + Sync {
    /// Submits a checkout record.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when the record is not persisted.
    fn checkout(&self, checkout: &DatasetCheckout) -> Result<(), CheckoutError>;

    /// Lists checkouts recorded for a dataset, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when the ledger cannot be read.
    fn dataset_checkouts(&self, id: &DatasetId) -> Result<Vec<DatasetCheckout>, CheckoutError>;
}
