// crates/dataset-gate-core/src/core/mod.rs
// ============================================================================
// Module: Dataset Gate Core Types
// Description: Aggregates identifiers, dataset records, and time values.
// Purpose: Provide a single import surface for core data structures.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core data structures shared by the gateway and its collaborators.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dataset;
pub mod identifiers;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dataset::Client;
pub use dataset::Dataset;
pub use dataset::DatasetCheckout;
pub use dataset::Policy;
pub use identifiers::ClientId;
pub use identifiers::DatasetId;
pub use time::Timestamp;
