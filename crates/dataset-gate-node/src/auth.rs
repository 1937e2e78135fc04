// crates/dataset-gate-node/src/auth.rs
// ============================================================================
// Module: Bearer Authentication
// Description: Authorization header parsing and the request auth middleware.
// Purpose: Authenticate every gateway request before any dataset logic runs.
// Dependencies: axum, thiserror
// ============================================================================

//! ## Overview
//! [`parse_bearer_token`] extracts the credential from an `Authorization`
//! header; [`require_bearer`] verifies it and attaches the resulting
//! [`dataset_gate_core::Client`] to the request extensions. Every failure is
//! a 400 response; a malformed header never takes the process down.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use thiserror::Error;

use crate::error::GatewayError;
use crate::verifier::TokenVerifier;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted `Authorization` header size.
pub const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Bearer authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Header is missing or does not carry a usable bearer token.
    #[error("malformed token: {0}")]
    MalformedToken(String),
    /// No cached key validates the token, or its claims are unacceptable.
    #[error("token verification failed: {0}")]
    TokenVerificationFailed(String),
}

// ============================================================================
// SECTION: Header Parsing
// ============================================================================

/// Extracts the bearer token from an `Authorization` header value.
///
/// The header must split on single spaces into exactly two fields, the first
/// being `Bearer` in any case.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] for a missing, oversized, or
/// misshapen header.
pub fn parse_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header =
        header.ok_or_else(|| AuthError::MalformedToken("token not provided".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::MalformedToken("authorization header too large".to_string()));
    }
    let mut fields = header.split(' ');
    let (Some(scheme), Some(token), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(AuthError::MalformedToken(
            "authorization header must be '<scheme> <token>'".to_string(),
        ));
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedToken("unsupported authorization scheme".to_string()));
    }
    if token.is_empty() {
        return Err(AuthError::MalformedToken("empty bearer token".to_string()));
    }
    Ok(token)
}

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Verifies the bearer token and attaches the authenticated client.
///
/// # Errors
///
/// Returns [`GatewayError::Auth`] (400) when the token is missing, malformed,
/// or fails verification.
pub async fn require_bearer(
    State(verifier): State<Arc<TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let header = match request.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| {
            AuthError::MalformedToken("authorization header is not visible ASCII".to_string())
        })?),
    };
    let client = parse_bearer_token(header)
        .and_then(|token| verifier.verify(token))
        .inspect_err(|err| {
            tracing::info!(path = %request.uri().path(), reason = %err, "request rejected");
        })?;
    tracing::debug!(client_id = %client.id, path = %request.uri().path(), "request authenticated");
    request.extensions_mut().insert(client);
    Ok(next.run(request).await)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
