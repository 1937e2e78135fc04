// crates/dataset-gate-core/src/core/dataset.rs
// ============================================================================
// Module: Dataset Records
// Description: Datasets, content policies, clients, and checkout records.
// Purpose: Define the records exchanged between the gateway and collaborators.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Dataset`] always carries exactly one [`Policy`]. A [`DatasetCheckout`]
//! is an immutable audit record produced once per successful content delivery.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ClientId;
use crate::core::identifiers::DatasetId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Per-dataset access policy.
///
/// # Invariants
/// - The default policy denies content access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Whether dataset content may be released to authenticated clients.
    pub content: bool,
}

impl Policy {
    /// Returns a policy with the given content flag.
    #[must_use]
    pub const fn with_content(content: bool) -> Self {
        Self {
            content,
        }
    }
}

// ============================================================================
// SECTION: Dataset
// ============================================================================

/// Dataset registered on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset identifier.
    pub id: DatasetId,
    /// Current access policy.
    pub policy: Policy,
}

impl Dataset {
    /// Creates a dataset with the default (deny) policy.
    #[must_use]
    pub fn new(id: DatasetId) -> Self {
        Self {
            id,
            policy: Policy::default(),
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Authenticated identity derived from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Stable subject identifier.
    pub id: ClientId,
    /// Display name, when the token carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email or preferred username, when the token carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Client {
    /// Creates a client with only an identifier.
    #[must_use]
    pub fn new(id: ClientId) -> Self {
        Self {
            id,
            name: None,
            email: None,
        }
    }
}

// ============================================================================
// SECTION: Checkout
// ============================================================================

/// Audit record of a successful dataset content retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetCheckout {
    /// Dataset that was delivered.
    pub dataset_id: DatasetId,
    /// Client the content was delivered to.
    pub client: Client,
    /// Time the checkout was recorded.
    pub checked_out_at: Timestamp,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
