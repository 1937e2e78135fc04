// crates/dataset-gate-node/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for dataset-gate-node integration tests.
// Purpose: Provide token signers, router harnesses, and test PKI material.
// Dependencies: dataset-gate-node, jsonwebtoken, rcgen
// ============================================================================

//! ## Overview
//! Token signing uses freshly generated P-256 keys published through a
//! [`StaticKeySource`]; mutual-TLS tests use a throwaway CA from `rcgen`.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    dead_code,
    reason = "Shared test helpers; each test binary uses a subset."
)]

use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use dataset_gate_core::Client;
use dataset_gate_core::DatasetId;
use dataset_gate_core::InMemoryCheckoutLedger;
use dataset_gate_core::InMemoryDatasetManager;
use dataset_gate_node::ContentGrant;
use dataset_gate_node::ContentHandler;
use dataset_gate_node::DeliveryHandlers;
use dataset_gate_node::GatewayError;
use dataset_gate_node::GatewayState;
use dataset_gate_node::MetadataHandler;
use dataset_gate_node::RouterSettings;
use dataset_gate_node::SigningKeyCache;
use dataset_gate_node::StaticKeySource;
use dataset_gate_node::TokenVerifier;
use dataset_gate_node::VerifierSettings;
use dataset_gate_node::gateway_router;
use http_body_util::BodyExt;
use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::encode;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::jwk::JwkSet;
use rcgen::BasicConstraints;
use rcgen::CertificateParams;
use rcgen::CertifiedIssuer;
use rcgen::ExtendedKeyUsagePurpose;
use rcgen::IsCa;
use rcgen::KeyPair;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Token Signing
// ============================================================================

/// ES256 signer with a matching public JWK.
pub struct TestSigner {
    /// Key identifier placed in token headers and the JWK.
    kid: String,
    /// Private signing key.
    encoding: EncodingKey,
    /// Public key as published in a JWKS.
    jwk: Jwk,
}

impl TestSigner {
    /// Generates a fresh P-256 signer.
    pub fn new(kid: &str) -> Self {
        let pair = KeyPair::generate().unwrap();
        let encoding = EncodingKey::from_ec_pem(pair.serialize_pem().as_bytes()).unwrap();
        let mut jwk = Jwk::from_encoding_key(&encoding, Algorithm::ES256).unwrap();
        jwk.common.key_id = Some(kid.to_string());
        Self {
            kid: kid.to_string(),
            encoding,
            jwk,
        }
    }

    /// Public JWK for this signer.
    pub fn jwk(&self) -> Jwk {
        self.jwk.clone()
    }

    /// A JWKS containing only this signer's key.
    pub fn jwks(&self) -> JwkSet {
        JwkSet {
            keys: vec![self.jwk()],
        }
    }

    /// Signs arbitrary claims.
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.encoding).unwrap()
    }

    /// Signs a valid token for `subject`.
    pub fn token_for(&self, subject: &str) -> String {
        self.sign(&claims_for(subject))
    }
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

/// Unexpired identity claims for `subject`.
pub fn claims_for(subject: &str) -> Value {
    json!({
        "oid": subject,
        "sub": format!("sub-{subject}"),
        "name": "Test Client",
        "preferred_username": format!("{subject}@example.com"),
        "exp": unix_now() + 600,
    })
}

/// Verifier settings accepting ES256 only.
pub fn es256_settings() -> VerifierSettings {
    VerifierSettings {
        allowed_algorithms: vec![Algorithm::ES256],
        ..VerifierSettings::default()
    }
}

/// Builds a verifier over a static key set.
pub async fn verifier_for(jwks: JwkSet, settings: VerifierSettings) -> Arc<TokenVerifier> {
    let source = Arc::new(StaticKeySource::new(jwks));
    let keys = SigningKeyCache::warm(source, Duration::from_secs(300)).await.unwrap();
    Arc::new(TokenVerifier::new(keys, settings))
}

// ============================================================================
// SECTION: Delivery Handlers
// ============================================================================

/// Content handler returning a fixed payload and status.
pub struct FixedContent {
    /// Status to answer with.
    pub status: StatusCode,
    /// Body to answer with.
    pub body: &'static str,
}

#[async_trait]
impl ContentHandler for FixedContent {
    async fn deliver(
        &self,
        _grant: &ContentGrant,
        _client: &Client,
    ) -> Result<Response, GatewayError> {
        Ok((self.status, self.body).into_response())
    }
}

/// Content handler that never finishes within a test deadline.
pub struct StalledContent;

#[async_trait]
impl ContentHandler for StalledContent {
    async fn deliver(
        &self,
        _grant: &ContentGrant,
        _client: &Client,
    ) -> Result<Response, GatewayError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(StatusCode::OK.into_response())
    }
}

/// Metadata handler echoing the dataset and client identifiers.
pub struct EchoMetadata;

#[async_trait]
impl MetadataHandler for EchoMetadata {
    async fn describe(
        &self,
        dataset_id: &DatasetId,
        client: &Client,
    ) -> Result<Response, GatewayError> {
        Ok(format!("{dataset_id} for {}", client.id).into_response())
    }
}

// ============================================================================
// SECTION: Router Harness
// ============================================================================

/// Router wired to in-memory collaborators.
pub struct Harness {
    /// Gateway router under test.
    pub router: Router,
    /// Dataset collaborator.
    pub datasets: Arc<InMemoryDatasetManager>,
    /// Checkout ledger.
    pub ledger: Arc<InMemoryCheckoutLedger>,
    /// Signer trusted by the router's verifier.
    pub signer: TestSigner,
}

impl Harness {
    /// Builds a harness with default router settings.
    pub async fn new(handlers: DeliveryHandlers) -> Self {
        Self::with_settings(handlers, RouterSettings::default()).await
    }

    /// Builds a harness with explicit router settings.
    pub async fn with_settings(handlers: DeliveryHandlers, settings: RouterSettings) -> Self {
        let signer = TestSigner::new("test-key");
        let verifier = verifier_for(signer.jwks(), es256_settings()).await;
        let datasets = Arc::new(InMemoryDatasetManager::new());
        let ledger = Arc::new(InMemoryCheckoutLedger::new());
        let state = GatewayState::new(datasets.clone(), ledger.clone(), handlers);
        Self {
            router: gateway_router(state, verifier, settings),
            datasets,
            ledger,
            signer,
        }
    }

    /// A valid bearer token for `subject`.
    pub fn token(&self, subject: &str) -> String {
        self.signer.token_for(subject)
    }
}

/// Builds a request with an optional bearer token.
pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Collects a response body as UTF-8 text.
pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ============================================================================
// SECTION: PKI
// ============================================================================

/// PEM material for a CA, a server leaf, and a client leaf.
pub struct TestPki {
    /// Trust anchor certificate.
    pub ca_pem: String,
    /// Server certificate for `localhost`.
    pub server_cert_pem: String,
    /// Server private key.
    pub server_key_pem: String,
    /// Client certificate followed by its private key.
    pub client_identity_pem: String,
}

impl TestPki {
    /// Generates a CA and two leaves signed by it.
    pub fn generate() -> Self {
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca = CertifiedIssuer::self_signed(ca_params, KeyPair::generate().unwrap()).unwrap();

        let server_key = KeyPair::generate().unwrap();
        let mut server_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        let server_cert = server_params.signed_by(&server_key, &*ca).unwrap();

        let client_key = KeyPair::generate().unwrap();
        let mut client_params = CertificateParams::new(vec!["client.local".to_string()]).unwrap();
        client_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        let client_cert = client_params.signed_by(&client_key, &*ca).unwrap();

        Self {
            ca_pem: ca.pem(),
            server_cert_pem: server_cert.pem(),
            server_key_pem: server_key.serialize_pem(),
            client_identity_pem: format!("{}{}", client_cert.pem(), client_key.serialize_pem()),
        }
    }
}
