// crates/dataset-gate-node/src/verifier.rs
// ============================================================================
// Module: Token Verifier
// Description: Bearer token signature and claim verification.
// Purpose: Turn a bearer token into an authenticated client or reject it.
// Dependencies: jsonwebtoken, serde
// ============================================================================

//! ## Overview
//! [`TokenVerifier`] tries every cached key whose algorithm, resolved from
//! the key's own metadata, matches the token header and is allow-listed.
//! The first key that validates wins. No key is ever tried with an
//! algorithm chosen by the token alone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;
use std::sync::Arc;

use dataset_gate_config::AuthConfig;
use dataset_gate_core::Client;
use dataset_gate_core::ClientId;
use jsonwebtoken::Algorithm;
use jsonwebtoken::Validation;
use jsonwebtoken::decode;
use jsonwebtoken::decode_header;
use serde::Deserialize;

use crate::auth::AuthError;
use crate::signing_keys::SigningKeyCache;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Claim and algorithm policy applied during verification.
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    /// Algorithms a key may verify with.
    pub allowed_algorithms: Vec<Algorithm>,
    /// Clock skew tolerance in seconds.
    pub leeway_secs: u64,
    /// Accepted `aud` values; empty disables the check.
    pub audience: Vec<String>,
    /// Accepted `iss` values; empty disables the check.
    pub issuer: Vec<String>,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            allowed_algorithms: vec![Algorithm::RS256],
            leeway_secs: 60,
            audience: Vec::new(),
            issuer: Vec::new(),
        }
    }
}

impl VerifierSettings {
    /// Builds settings from the `[auth]` config section.
    ///
    /// Algorithm names are validated with the config; unknown names are
    /// dropped here so they can never widen the allow-list.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let allowed_algorithms = config
            .allowed_algorithms
            .iter()
            .filter_map(|name| {
                let parsed = Algorithm::from_str(name).ok();
                if parsed.is_none() {
                    tracing::warn!(algorithm = %name, "ignoring unknown signing algorithm");
                }
                parsed
            })
            .collect();
        Self {
            allowed_algorithms,
            leeway_secs: config.leeway_secs,
            audience: config.audience.clone(),
            issuer: config.issuer.clone(),
        }
    }

    /// Builds a validation pinned to a single algorithm.
    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.leeway = self.leeway_secs;
        if self.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&self.audience);
        }
        let mut required = vec!["exp"];
        if !self.audience.is_empty() {
            required.push("aud");
        }
        if !self.issuer.is_empty() {
            validation.set_issuer(&self.issuer);
            required.push("iss");
        }
        validation.set_required_spec_claims(&required);
        validation
    }
}

// ============================================================================
// SECTION: Claims
// ============================================================================

/// Identity claims read from a verified token.
#[derive(Debug, Deserialize)]
struct IdentityClaims {
    /// Object identifier (Entra ID style).
    #[serde(default)]
    oid: Option<String>,
    /// Subject.
    #[serde(default)]
    sub: Option<String>,
    /// Display name.
    #[serde(default)]
    name: Option<String>,
    /// Email address.
    #[serde(default)]
    email: Option<String>,
    /// Preferred username, often an email.
    #[serde(default)]
    preferred_username: Option<String>,
}

impl IdentityClaims {
    /// Derives the client identity; `oid` wins over `sub`.
    fn into_client(self) -> Result<Client, AuthError> {
        let id = self
            .oid
            .filter(|oid| !oid.is_empty())
            .or_else(|| self.sub.filter(|sub| !sub.is_empty()))
            .ok_or_else(|| {
                AuthError::TokenVerificationFailed("token carries no subject".to_string())
            })?;
        Ok(Client {
            id: ClientId::new(id),
            name: self.name,
            email: self.email.or(self.preferred_username),
        })
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Verifies bearer tokens against the signing-key cache.
pub struct TokenVerifier {
    /// Key cache consulted on every verification.
    keys: Arc<SigningKeyCache>,
    /// Claim and algorithm policy.
    settings: VerifierSettings,
}

impl TokenVerifier {
    /// Creates a verifier over a warmed key cache.
    #[must_use]
    pub const fn new(keys: Arc<SigningKeyCache>, settings: VerifierSettings) -> Self {
        Self {
            keys,
            settings,
        }
    }

    /// Returns the key cache.
    #[must_use]
    pub const fn keys(&self) -> &Arc<SigningKeyCache> {
        &self.keys
    }

    /// Verifies `token` and returns the authenticated client.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedToken`] when the token header cannot be
    /// decoded, and [`AuthError::TokenVerificationFailed`] when no cached key
    /// validates it.
    pub fn verify(&self, token: &str) -> Result<Client, AuthError> {
        let header = decode_header(token)
            .map_err(|err| AuthError::MalformedToken(format!("token header: {err}")))?;
        if !self.settings.allowed_algorithms.contains(&header.alg) {
            return Err(AuthError::TokenVerificationFailed(
                "token algorithm is not allowed".to_string(),
            ));
        }

        let snapshot = self.keys.snapshot();
        let mut last_error = None;
        for key in snapshot.keys().iter().filter(|key| key.algorithm() == header.alg) {
            let validation = self.settings.validation(key.algorithm());
            match decode::<IdentityClaims>(token, key.decoding_key(), &validation) {
                Ok(data) => {
                    tracing::trace!(kid = key.kid().unwrap_or("-"), "token verified");
                    return data.claims.into_client();
                }
                Err(err) => last_error = Some(err),
            }
        }
        Err(AuthError::TokenVerificationFailed(
            last_error.map_or_else(|| "no matching signing key".to_string(), |err| err.to_string()),
        ))
    }
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

    use super::*;

    #[test]
    fn oid_takes_precedence_over_sub() {
        let claims = IdentityClaims {
            oid: Some("oid-1".into()),
            sub: Some("sub-1".into()),
            name: Some("Ada".into()),
            email: None,
            preferred_username: Some("ada@example.com".into()),
        };
        let client = claims.into_client().unwrap();
        assert_eq!(client.id.as_str(), "oid-1");
        assert_eq!(client.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn empty_oid_falls_back_to_sub() {
        let claims = IdentityClaims {
            oid: Some(String::new()),
            sub: Some("sub-1".into()),
            name: None,
            email: None,
            preferred_username: None,
        };
        assert_eq!(claims.into_client().unwrap().id.as_str(), "sub-1");
    }

    #[test]
    fn subjectless_claims_are_rejected() {
        let claims = IdentityClaims {
            oid: None,
            sub: None,
            name: None,
            email: None,
            preferred_username: None,
        };
        assert!(matches!(claims.into_client(), Err(AuthError::TokenVerificationFailed(_))));
    }

    #[test]
    fn unknown_algorithms_never_widen_the_allow_list() {
        let mut config = AuthConfig::new("https://login.example.com/keys");
        config.allowed_algorithms = vec!["ES256".into(), "XX999".into()];
        let settings = VerifierSettings::from_config(&config);
        assert_eq!(settings.allowed_algorithms, vec![Algorithm::ES256]);
    }

    #[test]
    fn audience_check_is_off_when_unconfigured() {
        let settings = VerifierSettings::default();
        assert!(!settings.validation(Algorithm::RS256).validate_aud);
        let configured = VerifierSettings {
            audience: vec!["api://gate".into()],
            ..VerifierSettings::default()
        };
        assert!(configured.validation(Algorithm::RS256).validate_aud);
    }
}
