// crates/dataset-gate-node/src/policy_gate.rs
// ============================================================================
// Module: Policy Gate
// Description: Dataset existence and content-policy enforcement.
// Purpose: Decide whether a request may reach a delivery handler.
// Dependencies: dataset-gate-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The gate answers two questions: does the dataset exist, and does its
//! policy release content. A positive answer is a [`ContentGrant`], which only
//! this module can construct; content handlers take one as proof that the
//! check ran. The gate never touches dataset bytes.
//!
//! Policy updates also live here because they share the existence
//! precondition and must agree with the policy shape the gate reads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dataset_gate_core::DatasetId;
use dataset_gate_core::DatasetManager;
use dataset_gate_core::DatasetManagerError;
use dataset_gate_core::Policy;
use serde::Deserialize;
use thiserror::Error;

use crate::error::GatewayError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted policy-update body size.
pub const MAX_POLICY_BODY_BYTES: usize = 4 * 1024;

/// Media type required on policy updates.
const JSON_MEDIA_TYPE: &str = "application/json";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy gate failures.
#[derive(Debug, Error)]
pub enum GateError {
    /// Dataset is not registered.
    #[error("dataset '{0}' is not indexed by the node")]
    DatasetNotFound(DatasetId),
    /// Dataset policy does not release content.
    #[error("you do not have access to dataset '{0}'")]
    AccessDenied(DatasetId),
    /// No delivery handler is registered for the request.
    #[error("{0}")]
    NotImplemented(String),
    /// Request path, media type, or body is invalid.
    #[error("{0}")]
    BadRequest(String),
    /// Dataset manager failed.
    #[error(transparent)]
    Manager(#[from] DatasetManagerError),
}

impl From<GateError> for GatewayError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::DatasetNotFound(_) => Self::NotFound(err.to_string()),
            GateError::AccessDenied(_) => Self::AccessDenied(err.to_string()),
            GateError::NotImplemented(message) => Self::NotImplemented(message),
            GateError::BadRequest(message) => Self::MalformedRequest(message),
            GateError::Manager(inner) => Self::from(inner),
        }
    }
}

// ============================================================================
// SECTION: Grants and Updates
// ============================================================================

/// Proof that the content policy released a dataset.
///
/// # Invariants
/// - Only [`PolicyGate::authorize_content`] constructs grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentGrant {
    /// Dataset the grant covers.
    dataset_id: DatasetId,
}

impl ContentGrant {
    /// Returns the granted dataset.
    #[must_use]
    pub const fn dataset_id(&self) -> &DatasetId {
        &self.dataset_id
    }
}

/// Policy update request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyUpdate {
    /// New content flag.
    pub policy: bool,
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Existence and content-policy gate over a dataset manager.
#[derive(Clone)]
pub struct PolicyGate {
    /// Dataset collaborator.
    datasets: Arc<dyn DatasetManager>,
}

impl PolicyGate {
    /// Creates a gate over the given dataset manager.
    #[must_use]
    pub fn new(datasets: Arc<dyn DatasetManager>) -> Self {
        Self {
            datasets,
        }
    }

    /// Fails unless the dataset is registered.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::DatasetNotFound`] for unknown datasets and
    /// [`GateError::Manager`] when the lookup fails.
    pub fn require_existing(&self, dataset_id: &DatasetId) -> Result<(), GateError> {
        if self.datasets.dataset_exists(dataset_id)? {
            Ok(())
        } else {
            Err(GateError::DatasetNotFound(dataset_id.clone()))
        }
    }

    /// Grants content access when the dataset exists and its policy allows it.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::DatasetNotFound`] or [`GateError::AccessDenied`].
    pub fn authorize_content(&self, dataset_id: &DatasetId) -> Result<ContentGrant, GateError> {
        self.require_existing(dataset_id)?;
        // A dataset removed between the two lookups reads as not found.
        let policy = self
            .datasets
            .dataset_policy(dataset_id)?
            .ok_or_else(|| GateError::DatasetNotFound(dataset_id.clone()))?;
        if !policy.content {
            return Err(GateError::AccessDenied(dataset_id.clone()));
        }
        Ok(ContentGrant {
            dataset_id: dataset_id.clone(),
        })
    }

    /// Validates and applies a policy update.
    ///
    /// Checks run in order: media type, identifier, existence, body size,
    /// body shape.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::BadRequest`] for a wrong media type, empty
    /// identifier, or malformed body, and [`GateError::DatasetNotFound`] for
    /// unknown datasets.
    pub fn set_policy(
        &self,
        dataset_id: &DatasetId,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<Policy, GateError> {
        if !content_type.is_some_and(is_json_media_type) {
            return Err(GateError::BadRequest(
                "content-type header is not application/json".to_string(),
            ));
        }
        if dataset_id.is_empty() {
            return Err(GateError::BadRequest("missing dataset identifier".to_string()));
        }
        self.require_existing(dataset_id)?;
        if body.len() > MAX_POLICY_BODY_BYTES {
            return Err(GateError::BadRequest(format!(
                "request body must not exceed {MAX_POLICY_BODY_BYTES} bytes"
            )));
        }
        let update: PolicyUpdate = serde_json::from_slice(body)
            .map_err(|err| GateError::BadRequest(format!("request body is malformed: {err}")))?;
        let policy = Policy::with_content(update.policy);
        self.datasets.set_dataset_policy(dataset_id, policy)?;
        tracing::info!(
            dataset_id = %dataset_id,
            content = policy.content,
            "dataset policy updated"
        );
        Ok(policy)
    }
}

/// Returns whether a `Content-Type` value names JSON, ignoring parameters.
fn is_json_media_type(value: &str) -> bool {
    value
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap for clarity."
    )]

    use dataset_gate_core::Dataset;
    use dataset_gate_core::InMemoryDatasetManager;

    use super::*;

    /// Builds a gate over an in-memory manager seeded with `(id, content)` pairs.
    fn gate_with(ids: &[(&str, bool)]) -> (PolicyGate, Arc<InMemoryDatasetManager>) {
        let manager = Arc::new(InMemoryDatasetManager::new());
        for (id, content) in ids {
            let mut dataset = Dataset::new(DatasetId::new(*id));
            dataset.policy = Policy::with_content(*content);
            manager.insert_dataset(dataset).unwrap();
        }
        (PolicyGate::new(Arc::clone(&manager) as Arc<dyn DatasetManager>), manager)
    }

    #[test]
    fn unknown_dataset_is_not_found() {
        let (gate, _) = gate_with(&[]);
        let err = gate.authorize_content(&DatasetId::new("missing")).unwrap_err();
        assert!(matches!(err, GateError::DatasetNotFound(_)));
    }

    #[test]
    fn default_policy_denies_content() {
        let (gate, _) = gate_with(&[("ds", false)]);
        let err = gate.authorize_content(&DatasetId::new("ds")).unwrap_err();
        assert!(matches!(err, GateError::AccessDenied(_)));
    }

    #[test]
    fn permissive_policy_grants_content() {
        let (gate, _) = gate_with(&[("ds", true)]);
        let grant = gate.authorize_content(&DatasetId::new("ds")).unwrap();
        assert_eq!(grant.dataset_id().as_str(), "ds");
    }

    #[test]
    fn media_type_is_checked_before_existence() {
        let (gate, _) = gate_with(&[]);
        let missing = DatasetId::new("missing");
        let err = gate.set_policy(&missing, Some("text/plain"), b"{}").unwrap_err();
        assert!(matches!(err, GateError::BadRequest(_)));
        let err = gate.set_policy(&missing, None, b"{}").unwrap_err();
        assert!(matches!(err, GateError::BadRequest(_)));
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let (gate, _) = gate_with(&[]);
        let err =
            gate.set_policy(&DatasetId::new(""), Some(JSON_MEDIA_TYPE), br#"{"policy":true}"#);
        assert!(matches!(err, Err(GateError::BadRequest(_))));
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        let (gate, _) = gate_with(&[("ds", false)]);
        let id = DatasetId::new("ds");
        for body in [&b"not json"[..], br#"{"policy":"yes"}"#, br#"{"policy":true,"extra":1}"#] {
            let err = gate.set_policy(&id, Some(JSON_MEDIA_TYPE), body).unwrap_err();
            assert!(matches!(err, GateError::BadRequest(_)));
        }
        let oversized = vec![b' '; MAX_POLICY_BODY_BYTES + 1];
        assert!(gate.set_policy(&id, Some(JSON_MEDIA_TYPE), &oversized).is_err());
    }

    #[test]
    fn policy_update_takes_effect() {
        let (gate, manager) = gate_with(&[("ds", false)]);
        let id = DatasetId::new("ds");
        let policy = gate
            .set_policy(&id, Some("application/json; charset=utf-8"), br#"{"policy":true}"#)
            .unwrap();
        assert!(policy.content);
        assert_eq!(manager.dataset_policy(&id).unwrap(), Some(Policy::with_content(true)));
        assert!(gate.authorize_content(&id).is_ok());
    }

    #[test]
    fn gate_errors_map_onto_gateway_statuses() {
        use axum::http::StatusCode;

        let id = DatasetId::new("ds");
        let cases = [
            (GateError::DatasetNotFound(id.clone()), StatusCode::NOT_FOUND),
            (GateError::AccessDenied(id), StatusCode::UNAUTHORIZED),
            (GateError::NotImplemented("x".into()), StatusCode::NOT_IMPLEMENTED),
            (GateError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                GateError::Manager(DatasetManagerError::Backend("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(GatewayError::from(err).status_code(), status);
        }
    }
}
