// crates/dataset-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Dataset Gate Runtime Helpers
// Description: Reference collaborator implementations.
// Purpose: Group in-memory managers used by tests and local nodes.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! In-memory collaborator implementations.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::InMemoryCheckoutLedger;
pub use store::InMemoryDatasetManager;
