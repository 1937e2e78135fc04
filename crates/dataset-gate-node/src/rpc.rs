// crates/dataset-gate-node/src/rpc.rs
// ============================================================================
// Module: Secure RPC Server
// Description: Mutual-TLS server bootstrap over an already-bound listener.
// Purpose: Host externally defined RPC services behind client-certificate auth.
// Dependencies: axum, axum-server, rustls, tokio
// ============================================================================

//! ## Overview
//! [`SecureRpcServer`] serves registered service routers over mutual TLS.
//! Construction validates the identity and never retries; `start` blocks
//! until the listener closes or `stop` completes, so callers run it as its
//! own task.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsAcceptor;
use axum_server::tls_rustls::RustlsConfig;
use dataset_gate_config::RpcConfig;
use rustls::ServerConfig;
use tokio::net::TcpListener;

use crate::tls::ListenerError;
use crate::tls::ServerIdentity;
use crate::transport::TransportSettings;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Timers for the secure listener.
#[derive(Debug, Clone, Copy)]
pub struct RpcSettings {
    /// Protocol timers and idle window.
    pub transport: TransportSettings,
    /// TLS handshake deadline.
    pub handshake_timeout: Duration,
    /// Grace period for in-flight calls on `stop`.
    pub shutdown_grace: Duration,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            transport: TransportSettings {
                header_read_timeout: None,
                idle_timeout: Duration::from_secs(300),
                keepalive_interval: Some(Duration::from_secs(300)),
                keepalive_timeout: Duration::from_secs(20),
            },
            handshake_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

impl RpcSettings {
    /// Builds settings from the `[rpc]` section and a shutdown grace period.
    #[must_use]
    pub const fn from_config(config: &RpcConfig, shutdown_grace: Duration) -> Self {
        Self {
            transport: TransportSettings {
                header_read_timeout: None,
                idle_timeout: config.idle_timeout(),
                keepalive_interval: Some(config.keepalive_interval()),
                keepalive_timeout: config.keepalive_timeout(),
            },
            handshake_timeout: config.handshake_timeout(),
            shutdown_grace,
        }
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Mutual-TLS server for RPC services.
pub struct SecureRpcServer {
    /// rustls configuration requiring client certificates.
    tls: Arc<ServerConfig>,
    /// Listener, taken on `start`.
    listener: Mutex<Option<TcpListener>>,
    /// Bound local address.
    addr: SocketAddr,
    /// Registered services, frozen on `start`.
    services: Mutex<Option<Router>>,
    /// Shutdown handle for the running server.
    handle: Handle<SocketAddr>,
    /// Protocol timers.
    settings: RpcSettings,
}

impl SecureRpcServer {
    /// Builds a server from identity material and a bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the TLS configuration cannot be built
    /// or the listener address is unavailable.
    pub fn new(
        identity: &ServerIdentity,
        listener: TcpListener,
        settings: RpcSettings,
    ) -> Result<Self, ListenerError> {
        let tls = identity.server_config()?;
        let addr = listener.local_addr().map_err(|err| ListenerError::Io(err.to_string()))?;
        Ok(Self {
            tls,
            listener: Mutex::new(Some(listener)),
            addr,
            services: Mutex::new(Some(Router::new())),
            handle: Handle::new(),
            settings,
        })
    }

    /// Merges a service router into the served surface.
    ///
    /// Services registered after `start` are ignored.
    pub fn register(&self, service: Router) {
        let Ok(mut guard) = self.services.lock() else {
            return;
        };
        match guard.take() {
            Some(router) => *guard = Some(router.merge(service)),
            None => {
                tracing::warn!(addr = %self.addr, "rpc service registered after start; ignored");
            }
        }
    }

    /// Serves until the listener closes or `stop` completes.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the server was already started or the
    /// transport fails.
    pub async fn start(&self) -> Result<(), ListenerError> {
        let listener = self
            .listener
            .lock()
            .map_err(|_| ListenerError::Transport("listener mutex poisoned".to_string()))?
            .take()
            .ok_or(ListenerError::AlreadyStarted)?;
        let router = self
            .services
            .lock()
            .map_err(|_| ListenerError::Transport("service mutex poisoned".to_string()))?
            .take()
            .unwrap_or_default();

        let acceptor = RustlsAcceptor::new(RustlsConfig::from_config(Arc::clone(&self.tls)))
            .handshake_timeout(self.settings.handshake_timeout)
            .acceptor(self.settings.transport.idle_acceptor());
        let mut server = axum_server::Server::from_listener(listener)
            .acceptor(acceptor)
            .handle(self.handle.clone());
        self.settings.transport.apply(server.http_builder());

        tracing::info!(addr = %self.addr, "secure rpc listener started");
        let result = server.serve(router.into_make_service()).await;
        match result {
            Ok(()) => {
                tracing::info!(addr = %self.addr, "secure rpc listener stopped");
                Ok(())
            }
            Err(err) => {
                tracing::error!(addr = %self.addr, error = %err, "secure rpc listener failed");
                Err(ListenerError::Transport(err.to_string()))
            }
        }
    }

    /// Gracefully shuts the server down, bounded by the grace period.
    pub fn stop(&self) {
        self.handle.graceful_shutdown(Some(self.settings.shutdown_grace));
    }

    /// Returns the bound network address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }
}
