// crates/dataset-gate-core/src/lib.rs
// ============================================================================
// Module: Dataset Gate Core Library
// Description: Public API surface for the Dataset Gate core.
// Purpose: Expose dataset types, collaborator interfaces, and in-memory helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Dataset Gate core defines the records a gateway node reasons about
//! (datasets, policies, clients, checkouts) and the narrow collaborator
//! contracts it consumes. Storage and ledger internals live behind
//! [`DatasetManager`] and [`CheckoutManager`]; the in-memory implementations
//! exist for tests and local nodes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CheckoutError;
pub use interfaces::CheckoutManager;
pub use interfaces::DatasetManager;
pub use interfaces::DatasetManagerError;
pub use runtime::InMemoryCheckoutLedger;
pub use runtime::InMemoryDatasetManager;
