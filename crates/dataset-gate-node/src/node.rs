// crates/dataset-gate-node/src/node.rs
// ============================================================================
// Module: Gateway Node
// Description: Composition of key cache, HTTP gateway, and secure RPC listener.
// Purpose: Start and stop every node component from one configuration.
// Dependencies: axum-server, tokio, dataset-gate-config
// ============================================================================

//! ## Overview
//! [`GatewayNode::from_config`] performs every fallible startup step up front:
//! it warms the signing keys, loads the RPC identity, and binds both
//! listeners. Nothing is served until [`GatewayNode::serve`], which runs the
//! HTTP gateway, the RPC server, and the key refresh task until
//! [`GatewayNode::shutdown`] is called.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use dataset_gate_config::ConfigError;
use dataset_gate_config::GatewayConfig;
use dataset_gate_core::CheckoutManager;
use dataset_gate_core::DatasetManager;
use dataset_gate_core::InMemoryCheckoutLedger;
use dataset_gate_core::InMemoryDatasetManager;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::handlers::DeliveryHandlers;
use crate::router::GatewayState;
use crate::router::RouterSettings;
use crate::router::gateway_router;
use crate::rpc::RpcSettings;
use crate::rpc::SecureRpcServer;
use crate::signing_keys::HttpKeySource;
use crate::signing_keys::SigningKeyCache;
use crate::signing_keys::SigningKeyError;
use crate::tls::ListenerError;
use crate::tls::ServerIdentity;
use crate::transport::TransportSettings;
use crate::verifier::TokenVerifier;
use crate::verifier::VerifierSettings;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Node startup and serving failures.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Secure listener could not be built or failed.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// Signing keys could not be loaded.
    #[error(transparent)]
    SigningKey(#[from] SigningKeyError),
    /// HTTP listener failure.
    #[error("node error: io: {0}")]
    Io(String),
    /// `serve` was called more than once.
    #[error("node error: already serving")]
    AlreadyServing,
}

// ============================================================================
// SECTION: Collaborators
// ============================================================================

/// External collaborators the gateway delegates to.
#[derive(Clone)]
pub struct Collaborators {
    /// Dataset storage and indexing.
    pub datasets: Arc<dyn DatasetManager>,
    /// Checkout ledger.
    pub checkouts: Arc<dyn CheckoutManager>,
    /// Content and metadata delivery hooks.
    pub handlers: DeliveryHandlers,
}

impl Collaborators {
    /// In-memory collaborators with no delivery handlers.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            datasets: Arc::new(InMemoryDatasetManager::new()),
            checkouts: Arc::new(InMemoryCheckoutLedger::new()),
            handlers: DeliveryHandlers::new(),
        }
    }
}

// ============================================================================
// SECTION: Node
// ============================================================================

/// A fully bootstrapped gateway node.
pub struct GatewayNode {
    /// HTTP listener, taken on `serve`.
    http_listener: Mutex<Option<TcpListener>>,
    /// Bound HTTP address.
    http_addr: SocketAddr,
    /// Shutdown handle for the HTTP gateway.
    http_handle: Handle<SocketAddr>,
    /// HTTP protocol timers.
    http_transport: TransportSettings,
    /// Authenticated gateway router.
    router: Router,
    /// Grace period for in-flight requests.
    shutdown_grace: Duration,
    /// Mutual-TLS RPC server.
    rpc: SecureRpcServer,
    /// Signing-key cache shared with the verifier.
    keys: Arc<SigningKeyCache>,
}

impl GatewayNode {
    /// Validates the configuration and performs every startup step.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] when the configuration is invalid, the signing
    /// keys cannot be loaded, the RPC identity is incomplete, or a listener
    /// cannot be bound.
    pub async fn from_config(
        config: &GatewayConfig,
        collaborators: Collaborators,
    ) -> Result<Self, NodeError> {
        config.validate()?;

        let source = HttpKeySource::from_config(&config.auth).map_err(SigningKeyError::from)?;
        let keys = SigningKeyCache::warm(Arc::new(source), config.auth.refresh_interval()).await?;

        let identity = ServerIdentity::from_paths(
            config.rpc.cert_path.as_deref().map(Path::new),
            config.rpc.key_path.as_deref().map(Path::new),
            config.rpc.client_ca_path.as_deref().map(Path::new),
        )?;
        let rpc_listener = bind(config.rpc.bind_addr()?).await?;
        let rpc = SecureRpcServer::new(
            &identity,
            rpc_listener,
            RpcSettings::from_config(&config.rpc, config.server.shutdown_grace()),
        )?;

        let http_listener = bind(config.server.bind_addr()?).await?;
        let http_addr =
            http_listener.local_addr().map_err(|err| NodeError::Io(err.to_string()))?;

        let verifier = Arc::new(TokenVerifier::new(
            Arc::clone(&keys),
            VerifierSettings::from_config(&config.auth),
        ));
        let state = GatewayState::new(
            collaborators.datasets,
            collaborators.checkouts,
            collaborators.handlers,
        );
        let router =
            gateway_router(state, verifier, RouterSettings::from_config(&config.server));

        Ok(Self {
            http_listener: Mutex::new(Some(http_listener)),
            http_addr,
            http_handle: Handle::new(),
            http_transport: TransportSettings {
                header_read_timeout: Some(config.server.header_read_timeout()),
                idle_timeout: config.server.idle_timeout(),
                keepalive_interval: None,
                keepalive_timeout: Duration::ZERO,
            },
            router,
            shutdown_grace: config.server.shutdown_grace(),
            rpc,
            keys,
        })
    }

    /// Adds an RPC service; services added after `serve` starts are ignored.
    pub fn register_rpc(&self, service: Router) {
        self.rpc.register(service);
    }

    /// Bound HTTP gateway address.
    #[must_use]
    pub const fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Bound RPC address.
    #[must_use]
    pub const fn rpc_addr(&self) -> SocketAddr {
        self.rpc.addr()
    }

    /// Signing-key cache used by the verifier.
    #[must_use]
    pub const fn keys(&self) -> &Arc<SigningKeyCache> {
        &self.keys
    }

    /// Serves HTTP and RPC until shutdown, then stops the key refresh task.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] when called twice or when either listener fails.
    pub async fn serve(&self) -> Result<(), NodeError> {
        let listener = self
            .http_listener
            .lock()
            .map_err(|_| NodeError::Io("http listener mutex poisoned".to_string()))?
            .take()
            .ok_or(NodeError::AlreadyServing)?;

        self.keys.spawn_refresh();
        let mut server = axum_server::Server::from_listener(listener)
            .acceptor(self.http_transport.idle_acceptor())
            .handle(self.http_handle.clone());
        self.http_transport.apply(server.http_builder());

        tracing::info!(http = %self.http_addr, rpc = %self.rpc.addr(), "dataset gate node serving");
        let http = async {
            server
                .serve(self.router.clone().into_make_service())
                .await
                .map_err(|err| NodeError::Io(err.to_string()))
        };
        let rpc = async { self.rpc.start().await.map_err(NodeError::from) };
        let result = tokio::try_join!(http, rpc);

        self.keys.shutdown().await;
        match result {
            Ok(((), ())) => {
                tracing::info!(http = %self.http_addr, "dataset gate node stopped");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "dataset gate node failed");
                self.shutdown();
                Err(err)
            }
        }
    }

    /// Begins graceful shutdown of both listeners.
    pub fn shutdown(&self) {
        tracing::info!(
            grace_secs = self.shutdown_grace.as_secs(),
            "dataset gate node shutting down"
        );
        self.http_handle.graceful_shutdown(Some(self.shutdown_grace));
        self.rpc.stop();
    }
}

/// Binds a TCP listener.
async fn bind(addr: SocketAddr) -> Result<TcpListener, NodeError> {
    TcpListener::bind(addr).await.map_err(|err| NodeError::Io(format!("bind {addr}: {err}")))
}
