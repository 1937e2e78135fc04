// crates/dataset-gate-node/src/error.rs
// ============================================================================
// Module: Gateway Errors
// Description: HTTP boundary error taxonomy for the dataset gateway.
// Purpose: Map component failures onto stable status codes and text bodies.
// Dependencies: axum, thiserror
// ============================================================================

//! ## Overview
//! [`GatewayError`] is the only error type that crosses the HTTP boundary.
//! Every variant renders as a `text/plain` body of the form
//! `"<Status text>: <message>\n"`. Lower layers convert into it through
//! `From` impls so handlers can use `?` throughout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::X_CONTENT_TYPE_OPTIONS;
use axum::response::IntoResponse;
use axum::response::Response;
use dataset_gate_core::CheckoutError;
use dataset_gate_core::DatasetManagerError;
use thiserror::Error;

use crate::auth::AuthError;

// ============================================================================
// SECTION: Gateway Error
// ============================================================================

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request shape is invalid (path, media type, body).
    #[error("{0}")]
    MalformedRequest(String),
    /// Bearer token was missing, malformed, or failed verification.
    #[error("{0}")]
    Auth(#[from] AuthError),
    /// Dataset is not indexed by the node.
    #[error("{0}")]
    NotFound(String),
    /// Dataset policy refuses the request.
    #[error("{0}")]
    AccessDenied(String),
    /// No delivery handler is registered for the request.
    #[error("{0}")]
    NotImplemented(String),
    /// Collaborator or encoding failure.
    #[error("{0}")]
    Internal(String),
    /// Request exceeded its processing deadline.
    #[error("{0}")]
    Timeout(String),
}

impl GatewayError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedRequest(_) | Self::Auth(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AccessDenied(_) => StatusCode::UNAUTHORIZED,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let reason = status.canonical_reason().unwrap_or("Error");
        let body = format!("{reason}: {self}\n");
        let mut response = (status, body).into_response();
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        response
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl From<DatasetManagerError> for GatewayError {
    fn from(err: DatasetManagerError) -> Self {
        match err {
            DatasetManagerError::NotFound(_) => Self::NotFound(err.to_string()),
            DatasetManagerError::AlreadyExists(_) | DatasetManagerError::Rejected(_) => {
                Self::MalformedRequest(err.to_string())
            }
            DatasetManagerError::Backend(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<CheckoutError> for GatewayError {
    fn from(err: CheckoutError) -> Self {
        Self::Internal(err.to_string())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
