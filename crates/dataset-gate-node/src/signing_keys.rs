// crates/dataset-gate-node/src/signing_keys.rs
// ============================================================================
// Module: Signing-Key Cache
// Description: Remote JWKS source and a background-refreshed key snapshot.
// Purpose: Keep token verification keys current without blocking requests.
// Dependencies: jsonwebtoken, reqwest, tokio, tokio-util
// ============================================================================

//! ## Overview
//! A [`KeySource`] produces a [`JwkSet`]; [`HttpKeySource`] fetches one from
//! the configured JWKS URI. [`SigningKeyCache`] converts the set into an
//! immutable [`KeySnapshot`] and swaps it in whole, so concurrent readers see
//! either the old or the new set and never a mix.
//!
//! The first fetch happens in [`SigningKeyCache::warm`] and must succeed.
//! Later refreshes that fail keep the previous snapshot in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::time::Duration;
use std::time::SystemTime;

use async_trait::async_trait;
use dataset_gate_config::AuthConfig;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::AlgorithmParameters;
use jsonwebtoken::jwk::EllipticCurve;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::jwk::JwkSet;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while fetching a JWKS document.
#[derive(Debug, Error)]
pub enum KeySourceError {
    /// HTTP client could not be built or the request failed.
    #[error("key source error: http: {0}")]
    Http(String),
    /// Endpoint answered with a non-success status.
    #[error("key source error: unexpected status {0}")]
    Status(u16),
    /// Response body exceeded the size limit.
    #[error("key source error: response exceeds {0} bytes")]
    TooLarge(usize),
    /// Response body is not a JWKS document.
    #[error("key source error: decode: {0}")]
    Decode(String),
}

/// Errors raised by the signing-key cache.
#[derive(Debug, Error)]
pub enum SigningKeyError {
    /// Fetching the key set failed.
    #[error("signing key error: {0}")]
    Source(#[from] KeySourceError),
    /// Key set contained no usable keys.
    #[error("signing key error: no usable signing keys")]
    Empty,
    /// Refresh period was zero.
    #[error("signing key error: refresh interval must be non-zero")]
    ZeroInterval,
}

// ============================================================================
// SECTION: Key Sources
// ============================================================================

/// Producer of JWKS documents.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetches the current key set.
    async fn fetch(&self) -> Result<JwkSet, KeySourceError>;
}

/// Fixed in-memory key source, useful for tests and air-gapped nodes.
#[derive(Debug, Clone)]
pub struct StaticKeySource {
    /// Key set returned by every fetch.
    keys: JwkSet,
}

impl StaticKeySource {
    /// Creates a source that always returns `keys`.
    #[must_use]
    pub const fn new(keys: JwkSet) -> Self {
        Self {
            keys,
        }
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> Result<JwkSet, KeySourceError> {
        Ok(self.keys.clone())
    }
}

/// JWKS fetched over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpKeySource {
    /// HTTP client with timeout and redirects disabled.
    client: reqwest::Client,
    /// JWKS endpoint.
    uri: Url,
    /// Maximum accepted response size.
    max_bytes: usize,
}

impl HttpKeySource {
    /// Builds a source for `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`KeySourceError::Http`] when the client cannot be built.
    pub fn new(uri: Url, timeout: Duration, max_bytes: usize) -> Result<Self, KeySourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dataset-gate/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| KeySourceError::Http(err.to_string()))?;
        Ok(Self {
            client,
            uri,
            max_bytes,
        })
    }

    /// Builds a source from the `[auth]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`KeySourceError`] when the URI is invalid or the client
    /// cannot be built.
    pub fn from_config(config: &AuthConfig) -> Result<Self, KeySourceError> {
        let uri = config.jwks_url().map_err(|err| KeySourceError::Http(err.to_string()))?;
        Self::new(uri, config.fetch_timeout(), config.max_jwks_bytes)
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<JwkSet, KeySourceError> {
        tracing::info!(event = "jwks_refresh", uri = %self.uri);
        let mut response = self
            .client
            .get(self.uri.clone())
            .send()
            .await
            .map_err(|err| KeySourceError::Http(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(KeySourceError::Status(status.as_u16()));
        }
        let limit = u64::try_from(self.max_bytes).unwrap_or(u64::MAX);
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(KeySourceError::TooLarge(self.max_bytes));
        }
        let mut body = Vec::new();
        while let Some(chunk) =
            response.chunk().await.map_err(|err| KeySourceError::Http(err.to_string()))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(KeySourceError::TooLarge(self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }
        serde_json::from_slice(&body).map_err(|err| KeySourceError::Decode(err.to_string()))
    }
}

// ============================================================================
// SECTION: Snapshots
// ============================================================================

/// A verification key with its resolved algorithm.
#[derive(Clone)]
pub struct SigningKey {
    /// Key identifier, when published.
    kid: Option<String>,
    /// Algorithm this key verifies.
    algorithm: Algorithm,
    /// Decoding key material.
    key: DecodingKey,
}

impl SigningKey {
    /// Returns the key identifier, when published.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Returns the algorithm resolved from the key metadata.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns the decoding key.
    #[must_use]
    pub const fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

/// Immutable set of verification keys.
#[derive(Clone)]
pub struct KeySnapshot {
    /// Keys in publication order.
    keys: Vec<SigningKey>,
    /// When the set was fetched.
    refreshed_at: SystemTime,
}

impl KeySnapshot {
    /// Converts a JWKS document, skipping keys that cannot be used.
    #[must_use]
    pub fn from_jwks(set: &JwkSet) -> Self {
        let keys = set
            .keys
            .iter()
            .filter_map(|jwk| {
                let kid = jwk.common.key_id.clone();
                let Some(algorithm) = resolve_algorithm(jwk) else {
                    tracing::debug!(
                        kid = kid.as_deref().unwrap_or("-"),
                        "skipping jwk without usable algorithm"
                    );
                    return None;
                };
                match DecodingKey::from_jwk(jwk) {
                    Ok(key) => Some(SigningKey {
                        kid,
                        algorithm,
                        key,
                    }),
                    Err(err) => {
                        tracing::debug!(
                            kid = kid.as_deref().unwrap_or("-"),
                            error = %err,
                            "skipping undecodable jwk"
                        );
                        None
                    }
                }
            })
            .collect();
        Self {
            keys,
            refreshed_at: SystemTime::now(),
        }
    }

    /// Returns the keys in publication order.
    #[must_use]
    pub fn keys(&self) -> &[SigningKey] {
        &self.keys
    }

    /// Returns the number of usable keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true when no key is usable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns when the set was fetched.
    #[must_use]
    pub const fn refreshed_at(&self) -> SystemTime {
        self.refreshed_at
    }
}

/// Resolves the verification algorithm for a JWK.
///
/// The published `alg` wins; otherwise the key type decides. Symmetric keys
/// never resolve.
#[must_use]
pub fn resolve_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    if matches!(jwk.algorithm, AlgorithmParameters::OctetKey(_)) {
        return None;
    }
    if let Some(published) = jwk.common.key_algorithm {
        let algorithm = Algorithm::from_str(&published.to_string()).ok()?;
        return (!is_symmetric(algorithm)).then_some(algorithm);
    }
    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Some(Algorithm::RS256),
        AlgorithmParameters::EllipticCurve(params) => match params.curve {
            EllipticCurve::P256 => Some(Algorithm::ES256),
            EllipticCurve::P384 => Some(Algorithm::ES384),
            EllipticCurve::P521 | EllipticCurve::Ed25519 => None,
        },
        AlgorithmParameters::OctetKeyPair(params) => {
            (params.curve == EllipticCurve::Ed25519).then_some(Algorithm::EdDSA)
        }
        AlgorithmParameters::OctetKey(_) => None,
    }
}

/// Returns true for HMAC algorithms.
const fn is_symmetric(algorithm: Algorithm) -> bool {
    matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Background refresh task state.
struct RefreshTask {
    /// Cancels the refresh loop.
    token: CancellationToken,
    /// Join handle for the refresh loop.
    handle: JoinHandle<()>,
}

/// Signing-key cache with atomic snapshot replacement.
pub struct SigningKeyCache {
    /// Key set producer.
    source: Arc<dyn KeySource>,
    /// Refresh period.
    interval: Duration,
    /// Current snapshot; replaced whole.
    snapshot: RwLock<Arc<KeySnapshot>>,
    /// Running refresh task, if any.
    task: Mutex<Option<RefreshTask>>,
}

impl SigningKeyCache {
    /// Fetches the initial key set; the cache is unusable until this succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SigningKeyError`] when the interval is zero, or when the
    /// fetch fails or yields no usable key.
    pub async fn warm(
        source: Arc<dyn KeySource>,
        interval: Duration,
    ) -> Result<Arc<Self>, SigningKeyError> {
        if interval.is_zero() {
            return Err(SigningKeyError::ZeroInterval);
        }
        let snapshot = load_snapshot(source.as_ref()).await?;
        tracing::info!(keys = snapshot.len(), "signing keys loaded");
        Ok(Arc::new(Self {
            source,
            interval,
            snapshot: RwLock::new(Arc::new(snapshot)),
            task: Mutex::new(None),
        }))
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<KeySnapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Returns the refresh period.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Refreshes once; on failure the previous snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`SigningKeyError`] describing why the refresh was discarded.
    pub async fn refresh_now(&self) -> Result<usize, SigningKeyError> {
        let snapshot = load_snapshot(self.source.as_ref()).await?;
        let count = snapshot.len();
        let fresh = Arc::new(snapshot);
        match self.snapshot.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        Ok(count)
    }

    /// Starts the periodic refresh task. Calling it again is a no-op.
    pub fn spawn_refresh(self: &Arc<Self>) {
        let Ok(mut task) = self.task.lock() else {
            return;
        };
        if task.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let cache = Arc::clone(self);
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cache.interval);
            // First tick is immediate; warm already loaded this period.
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => {
                        tracing::info!("signing key refresh stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        match cache.refresh_now().await {
                            Ok(keys) => tracing::debug!(keys, "signing keys refreshed"),
                            Err(err) => tracing::warn!(
                                error = %err,
                                "signing key refresh failed; keeping previous keys"
                            ),
                        }
                    }
                }
            }
        });
        *task = Some(RefreshTask {
            token,
            handle,
        });
    }

    /// Stops the refresh task and waits for it to finish.
    pub async fn shutdown(&self) {
        let task = self.task.lock().ok().and_then(|mut guard| guard.take());
        if let Some(task) = task {
            task.token.cancel();
            if let Err(err) = task.handle.await {
                tracing::warn!(error = %err, "signing key refresh task panicked");
            }
        }
    }
}

/// Fetches and converts a key set, rejecting sets with no usable key.
async fn load_snapshot(source: &dyn KeySource) -> Result<KeySnapshot, SigningKeyError> {
    let set = source.fetch().await?;
    let snapshot = KeySnapshot::from_jwks(&set);
    if snapshot.is_empty() {
        return Err(SigningKeyError::Empty);
    }
    Ok(snapshot)
}
