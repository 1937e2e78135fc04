// crates/dataset-gate-node/src/handlers.rs
// ============================================================================
// Module: Delivery Handlers
// Description: Pluggable content and metadata delivery hooks.
// Purpose: Let embedders stream dataset bytes without the gateway knowing how.
// Dependencies: async-trait, axum
// ============================================================================

//! ## Overview
//! The gateway never produces dataset content itself. Embedders register a
//! [`ContentHandler`] and optionally a [`MetadataHandler`] in
//! [`DeliveryHandlers`]; a missing handler turns the matching endpoint into a
//! 501 response.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use dataset_gate_core::Client;
use dataset_gate_core::DatasetId;

use crate::error::GatewayError;
use crate::policy_gate::ContentGrant;

// ============================================================================
// SECTION: Handler Traits
// ============================================================================

/// Streams dataset content to an authorized client.
#[async_trait]
pub trait ContentHandler: Send + Sync {
    /// Produces the content response for a granted dataset.
    ///
    /// A checkout is recorded only when this returns `Ok` with a success
    /// status.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the content cannot be produced.
    async fn deliver(&self, grant: &ContentGrant, client: &Client)
    -> Result<Response, GatewayError>;
}

/// Describes a dataset without releasing its content.
#[async_trait]
pub trait MetadataHandler: Send + Sync {
    /// Produces the metadata response for an existing dataset.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the metadata cannot be produced.
    async fn describe(
        &self,
        dataset_id: &DatasetId,
        client: &Client,
    ) -> Result<Response, GatewayError>;
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registered delivery handlers.
#[derive(Clone, Default)]
pub struct DeliveryHandlers {
    /// Content handler, if any.
    content: Option<Arc<dyn ContentHandler>>,
    /// Metadata handler, if any.
    metadata: Option<Arc<dyn MetadataHandler>>,
}

impl DeliveryHandlers {
    /// Creates a registry with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the content handler.
    #[must_use]
    pub fn with_content(mut self, handler: Arc<dyn ContentHandler>) -> Self {
        self.content = Some(handler);
        self
    }

    /// Registers the metadata handler.
    #[must_use]
    pub fn with_metadata(mut self, handler: Arc<dyn MetadataHandler>) -> Self {
        self.metadata = Some(handler);
        self
    }

    /// Returns the content handler.
    #[must_use]
    pub fn content(&self) -> Option<Arc<dyn ContentHandler>> {
        self.content.clone()
    }

    /// Returns the metadata handler.
    #[must_use]
    pub fn metadata(&self) -> Option<Arc<dyn MetadataHandler>> {
        self.metadata.clone()
    }
}
