// crates/dataset-gate-config/src/config.rs
// ============================================================================
// Module: Dataset Gate Configuration
// Description: Configuration loading and validation for a gateway node.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: a node never starts with a
//! partially understood config. Identity material paths are optional here;
//! their absence is reported by the listener bootstrap as a fatal error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Host;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "dataset-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "DATASET_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for any configured timeout or interval, in seconds.
pub(crate) const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;
/// Upper bound for the HTTP request body limit.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 64 * 1024 * 1024;
/// Upper bound for the JWKS response size limit.
pub(crate) const MAX_JWKS_BYTES_LIMIT: usize = 8 * 1024 * 1024;
/// Maximum number of audience or issuer entries.
pub(crate) const MAX_CLAIM_VALUES: usize = 32;
/// Signature algorithms a node may be configured to accept.
pub const SUPPORTED_ALGORITHMS: &[&str] =
    &["RS256", "RS384", "RS512", "PS256", "PS384", "PS512", "ES256", "ES384", "EdDSA"];

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Gateway node configuration loaded from `dataset-gate.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// HTTP gateway settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Mutually authenticated RPC listener settings.
    #[serde(default)]
    pub rpc: RpcConfig,
    /// Bearer-token verification settings.
    pub auth: AuthConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then `DATASET_GATE_CONFIG`, then
    /// `dataset-gate.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or fails
    /// validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.rpc.validate()?;
        self.auth.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Server Config
// ============================================================================

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address for the HTTP gateway.
    #[serde(default = "default_server_bind")]
    pub bind: String,
    /// Time allowed to receive request headers.
    #[serde(default = "default_header_read_timeout_secs")]
    pub header_read_timeout_secs: u64,
    /// Idle time after which a connection without inbound traffic is closed.
    #[serde(default = "default_server_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Deadline for producing a response.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Grace period for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_server_bind(),
            header_read_timeout_secs: default_header_read_timeout_secs(),
            idle_timeout_secs: default_server_idle_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl ServerConfig {
    /// Validates HTTP gateway settings.
    fn validate(&self) -> Result<(), ConfigError> {
        parse_bind("server.bind", &self.bind)?;
        validate_secs("server.header_read_timeout_secs", self.header_read_timeout_secs)?;
        validate_secs("server.idle_timeout_secs", self.idle_timeout_secs)?;
        validate_secs("server.request_timeout_secs", self.request_timeout_secs)?;
        validate_secs("server.shutdown_grace_secs", self.shutdown_grace_secs)?;
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }

    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_bind("server.bind", &self.bind)
    }

    /// Header read timeout as a [`Duration`].
    #[must_use]
    pub const fn header_read_timeout(&self) -> Duration {
        Duration::from_secs(self.header_read_timeout_secs)
    }

    /// Idle connection timeout as a [`Duration`].
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Request deadline as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Shutdown grace period as a [`Duration`].
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

// ============================================================================
// SECTION: RPC Config
// ============================================================================

/// Mutually authenticated RPC listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcConfig {
    /// Bind address for the RPC listener.
    #[serde(default = "default_rpc_bind")]
    pub bind: String,
    /// PEM file holding the leaf certificate chain.
    #[serde(default)]
    pub cert_path: Option<String>,
    /// PEM file holding the private key.
    #[serde(default)]
    pub key_path: Option<String>,
    /// PEM file holding trust anchors for client certificates.
    #[serde(default)]
    pub client_ca_path: Option<String>,
    /// Idle time after which a connection without inbound traffic is closed.
    #[serde(default = "default_rpc_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Interval between keepalive probes.
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,
    /// Time to wait for a keepalive acknowledgement.
    #[serde(default = "default_keepalive_timeout_secs")]
    pub keepalive_timeout_secs: u64,
    /// TLS handshake deadline.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            bind: default_rpc_bind(),
            cert_path: None,
            key_path: None,
            client_ca_path: None,
            idle_timeout_secs: default_rpc_idle_timeout_secs(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
            keepalive_timeout_secs: default_keepalive_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
        }
    }
}

impl RpcConfig {
    /// Validates RPC listener settings.
    fn validate(&self) -> Result<(), ConfigError> {
        parse_bind("rpc.bind", &self.bind)?;
        if let Some(path) = &self.cert_path {
            validate_path_string("rpc.cert_path", path)?;
        }
        if let Some(path) = &self.key_path {
            validate_path_string("rpc.key_path", path)?;
        }
        if let Some(path) = &self.client_ca_path {
            validate_path_string("rpc.client_ca_path", path)?;
        }
        validate_secs("rpc.idle_timeout_secs", self.idle_timeout_secs)?;
        validate_secs("rpc.keepalive_interval_secs", self.keepalive_interval_secs)?;
        validate_secs("rpc.keepalive_timeout_secs", self.keepalive_timeout_secs)?;
        validate_secs("rpc.handshake_timeout_secs", self.handshake_timeout_secs)?;
        Ok(())
    }

    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_bind("rpc.bind", &self.bind)
    }

    /// Idle connection timeout as a [`Duration`].
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Keepalive probe interval as a [`Duration`].
    #[must_use]
    pub const fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    /// Keepalive acknowledgement timeout as a [`Duration`].
    #[must_use]
    pub const fn keepalive_timeout(&self) -> Duration {
        Duration::from_secs(self.keepalive_timeout_secs)
    }

    /// TLS handshake deadline as a [`Duration`].
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

// ============================================================================
// SECTION: Auth Config
// ============================================================================

/// Bearer-token verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// JWKS discovery endpoint.
    pub jwks_uri: String,
    /// Interval between background key refreshes.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Timeout for a single JWKS fetch.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Maximum accepted JWKS response size in bytes.
    #[serde(default = "default_max_jwks_bytes")]
    pub max_jwks_bytes: usize,
    /// Signature algorithms accepted for bearer tokens.
    #[serde(default = "default_allowed_algorithms")]
    pub allowed_algorithms: Vec<String>,
    /// Clock skew tolerated for `exp`/`nbf`, in seconds.
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,
    /// Accepted `aud` values; empty disables audience checks.
    #[serde(default)]
    pub audience: Vec<String>,
    /// Accepted `iss` values; empty disables issuer checks.
    #[serde(default)]
    pub issuer: Vec<String>,
}

impl AuthConfig {
    /// Creates an auth config for `jwks_uri` with default settings.
    #[must_use]
    pub fn new(jwks_uri: impl Into<String>) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            refresh_interval_secs: default_refresh_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_jwks_bytes: default_max_jwks_bytes(),
            allowed_algorithms: default_allowed_algorithms(),
            leeway_secs: default_leeway_secs(),
            audience: Vec::new(),
            issuer: Vec::new(),
        }
    }

    /// Validates token verification settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.jwks_url()?;
        validate_secs("auth.refresh_interval_secs", self.refresh_interval_secs)?;
        validate_secs("auth.fetch_timeout_secs", self.fetch_timeout_secs)?;
        if self.leeway_secs > MAX_DURATION_SECS {
            return Err(ConfigError::Invalid("auth.leeway_secs is too large".to_string()));
        }
        if self.max_jwks_bytes == 0 || self.max_jwks_bytes > MAX_JWKS_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "auth.max_jwks_bytes must be between 1 and {MAX_JWKS_BYTES_LIMIT}"
            )));
        }
        if self.allowed_algorithms.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.allowed_algorithms must not be empty".to_string(),
            ));
        }
        for alg in &self.allowed_algorithms {
            if !SUPPORTED_ALGORITHMS.contains(&alg.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "auth.allowed_algorithms contains unsupported algorithm: {alg}"
                )));
            }
        }
        validate_claim_values("auth.audience", &self.audience)?;
        validate_claim_values("auth.issuer", &self.issuer)?;
        Ok(())
    }

    /// Returns the parsed JWKS endpoint.
    ///
    /// Plain `http` is only accepted for loopback hosts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URI is malformed or not https.
    pub fn jwks_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.jwks_uri)
            .map_err(|err| ConfigError::Invalid(format!("auth.jwks_uri is invalid: {err}")))?;
        match url.scheme() {
            "https" => Ok(url),
            "http" if is_loopback_host(&url) => Ok(url),
            "http" => Err(ConfigError::Invalid(
                "auth.jwks_uri must use https for non-loopback hosts".to_string(),
            )),
            other => Err(ConfigError::Invalid(format!(
                "auth.jwks_uri has unsupported scheme: {other}"
            ))),
        }
    }

    /// Background refresh interval as a [`Duration`].
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// JWKS fetch timeout as a [`Duration`].
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

// ============================================================================
// SECTION: Logging Config
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.level must be non-empty".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path using CLI args, env var, or the default name.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Parses a socket address field.
fn parse_bind(field: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .trim()
        .parse::<SocketAddr>()
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a socket address: {err}")))
}

/// Validates a duration expressed in whole seconds.
fn validate_secs(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_DURATION_SECS {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between 1 and {MAX_DURATION_SECS}"
        )));
    }
    Ok(())
}

/// Validates an audience or issuer list.
fn validate_claim_values(field: &str, values: &[String]) -> Result<(), ConfigError> {
    if values.len() > MAX_CLAIM_VALUES {
        return Err(ConfigError::Invalid(format!("{field} has too many entries")));
    }
    if values.iter().any(|value| value.trim().is_empty()) {
        return Err(ConfigError::Invalid(format!("{field} entries must be non-empty")));
    }
    Ok(())
}

/// Returns true when the URL host is a loopback name or address.
fn is_loopback_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(addr)) => addr.is_loopback(),
        Some(Host::Ipv6(addr)) => addr.is_loopback(),
        None => false,
    }
}

/// Default HTTP bind address.
fn default_server_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Default header read timeout.
pub(crate) const fn default_header_read_timeout_secs() -> u64 {
    30
}

/// Default HTTP idle timeout.
pub(crate) const fn default_server_idle_timeout_secs() -> u64 {
    120
}

/// Default request deadline.
pub(crate) const fn default_request_timeout_secs() -> u64 {
    300
}

/// Default maximum request body size.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default shutdown grace period.
pub(crate) const fn default_shutdown_grace_secs() -> u64 {
    30
}

/// Default RPC bind address.
fn default_rpc_bind() -> String {
    "0.0.0.0:5000".to_string()
}

/// Default RPC idle timeout (5 minutes).
pub(crate) const fn default_rpc_idle_timeout_secs() -> u64 {
    300
}

/// Default keepalive probe interval (5 minutes).
pub(crate) const fn default_keepalive_interval_secs() -> u64 {
    300
}

/// Default keepalive acknowledgement timeout.
pub(crate) const fn default_keepalive_timeout_secs() -> u64 {
    20
}

/// Default TLS handshake deadline.
pub(crate) const fn default_handshake_timeout_secs() -> u64 {
    10
}

/// Default signing-key refresh interval (5 minutes).
pub(crate) const fn default_refresh_interval_secs() -> u64 {
    300
}

/// Default JWKS fetch timeout.
pub(crate) const fn default_fetch_timeout_secs() -> u64 {
    5
}

/// Default JWKS response size limit.
pub(crate) const fn default_max_jwks_bytes() -> usize {
    512 * 1024
}

/// Default accepted signature algorithms.
fn default_allowed_algorithms() -> Vec<String> {
    vec!["RS256".to_string()]
}

/// Default clock skew leeway.
pub(crate) const fn default_leeway_secs() -> u64 {
    60
}

/// Default log filter.
fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
