// crates/dataset-gate-node/src/lib.rs
// ============================================================================
// Module: Dataset Gate Node
// Description: Secure dataset-access gateway for a single node.
// Purpose: Authenticate requests, enforce dataset policy, and audit checkouts.
// Dependencies: axum, axum-server, jsonwebtoken, rustls, tokio
// ============================================================================

//! ## Overview
//! A node exposes two listeners. The HTTP gateway under `/dataset` requires a
//! bearer token verified against a remotely sourced signing-key set, gates
//! content behind each dataset's policy, and records a checkout for every
//! successful delivery. The RPC listener accepts only mutual-TLS connections
//! and hosts service routers supplied by the embedder.
//!
//! Invariants:
//! - No dataset logic runs before authentication succeeds.
//! - Content is released only with a [`ContentGrant`] and a registered
//!   [`ContentHandler`].
//! - Signing keys are replaced as whole snapshots; readers never see a
//!   partial key set.
//!
//! Security posture: request paths, headers, bodies, and tokens are untrusted.
//! Every startup failure is fatal and never retried.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod checkout;
pub mod error;
pub mod handlers;
pub mod node;
pub mod policy_gate;
pub mod router;
pub mod rpc;
pub mod signing_keys;
pub mod tls;
pub mod transport;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::AuthError;
pub use auth::parse_bearer_token;
pub use checkout::CheckoutRecorder;
pub use error::GatewayError;
pub use handlers::ContentHandler;
pub use handlers::DeliveryHandlers;
pub use handlers::MetadataHandler;
pub use node::Collaborators;
pub use node::GatewayNode;
pub use node::NodeError;
pub use policy_gate::ContentGrant;
pub use policy_gate::GateError;
pub use policy_gate::PolicyGate;
pub use router::GatewayState;
pub use router::RouterSettings;
pub use router::gateway_router;
pub use rpc::RpcSettings;
pub use rpc::SecureRpcServer;
pub use signing_keys::HttpKeySource;
pub use signing_keys::KeySource;
pub use signing_keys::KeySourceError;
pub use signing_keys::SigningKeyCache;
pub use signing_keys::SigningKeyError;
pub use signing_keys::StaticKeySource;
pub use tls::ListenerError;
pub use tls::ServerIdentity;
pub use transport::TransportSettings;
pub use verifier::TokenVerifier;
pub use verifier::VerifierSettings;
