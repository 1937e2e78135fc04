// crates/dataset-gate-config/src/lib.rs
// ============================================================================
// Module: Dataset Gate Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for dataset-gate.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `dataset-gate-config` defines the configuration model for a gateway node.
//! It provides strict, fail-closed validation and a canonical example.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
