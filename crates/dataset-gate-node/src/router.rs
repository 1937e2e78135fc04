// crates/dataset-gate-node/src/router.rs
// ============================================================================
// Module: Gateway Router
// Description: The `/dataset` HTTP surface and its middleware stack.
// Purpose: Bind endpoints to the policy gate, handlers, and checkout recorder.
// Dependencies: axum, tower-http, tokio
// ============================================================================

//! ## Overview
//! [`gateway_router`] builds the authenticated `/dataset` surface. Every route
//! sits behind bearer authentication; content delivery additionally passes the
//! policy gate and is followed by a checkout record. Identifiers are the whole
//! path tail after the endpoint prefix, so they may contain `/`. An empty tail
//! still reaches the handler so it can answer 400.
//!
//! Layer order, outermost first: CORS, request deadline, bearer auth, body
//! limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use axum::Extension;
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::FromRequestParts;
use axum::extract::RawPathParams;
use axum::extract::Request;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CONTENT_LENGTH;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::MethodRouter;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use dataset_gate_config::ServerConfig;
use dataset_gate_core::CheckoutManager;
use dataset_gate_core::Client;
use dataset_gate_core::Dataset;
use dataset_gate_core::DatasetCheckout;
use dataset_gate_core::DatasetId;
use dataset_gate_core::DatasetManager;
use dataset_gate_core::Policy;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::auth::require_bearer;
use crate::checkout::CheckoutRecorder;
use crate::error::GatewayError;
use crate::handlers::DeliveryHandlers;
use crate::policy_gate::GateError;
use crate::policy_gate::PolicyGate;
use crate::verifier::TokenVerifier;

// ============================================================================
// SECTION: State and Settings
// ============================================================================

/// Shared state for gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Dataset collaborator.
    datasets: Arc<dyn DatasetManager>,
    /// Existence and policy gate.
    gate: PolicyGate,
    /// Checkout recorder.
    recorder: CheckoutRecorder,
    /// Registered delivery handlers.
    handlers: DeliveryHandlers,
}

impl GatewayState {
    /// Assembles handler state from the collaborators.
    #[must_use]
    pub fn new(
        datasets: Arc<dyn DatasetManager>,
        checkouts: Arc<dyn CheckoutManager>,
        handlers: DeliveryHandlers,
    ) -> Self {
        Self {
            gate: PolicyGate::new(Arc::clone(&datasets)),
            recorder: CheckoutRecorder::new(checkouts),
            datasets,
            handlers,
        }
    }
}

/// Request-level limits applied by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterSettings {
    /// Maximum request body size.
    pub max_body_bytes: usize,
    /// Per-request processing deadline.
    pub request_timeout: Duration,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

impl RouterSettings {
    /// Builds router limits from the `[server]` section.
    #[must_use]
    pub const fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_body_bytes: config.max_body_bytes,
            request_timeout: config.request_timeout(),
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the authenticated `/dataset` router.
pub fn gateway_router(
    state: GatewayState,
    verifier: Arc<TokenVerifier>,
    settings: RouterSettings,
) -> Router {
    let router = Router::new().route("/dataset/ids", get(list_dataset_ids));
    let router = with_dataset_route(router, "/dataset/info", get(dataset_info));
    let router = with_dataset_route(router, "/dataset/new_policy", put(set_dataset_policy));
    let router = with_dataset_route(router, "/dataset/data", get(get_dataset));
    let router = with_dataset_route(router, "/dataset/metadata", get(get_metadata));
    let router = with_dataset_route(router, "/dataset/addset", post(add_dataset));
    let router = with_dataset_route(router, "/dataset/removeset", get(remove_dataset));
    router
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(middleware::from_fn_with_state(verifier, require_bearer))
        .layer(middleware::from_fn_with_state(settings.request_timeout, enforce_deadline))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Registers `prefix/{*id}` and the empty-id `prefix/` on the same handler.
fn with_dataset_route(
    router: Router<GatewayState>,
    prefix: &str,
    method: MethodRouter<GatewayState>,
) -> Router<GatewayState> {
    router
        .route(&format!("{prefix}/{{*id}}"), method.clone())
        .route(&format!("{prefix}/"), method)
}

/// Bounds request processing by the configured deadline.
async fn enforce_deadline(
    State(deadline): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    tokio::time::timeout(deadline, next.run(request)).await.unwrap_or_else(|_| {
        tracing::warn!(
            path = %path,
            deadline_secs = deadline.as_secs(),
            "request deadline exceeded"
        );
        GatewayError::Timeout("request exceeded its processing deadline".to_string())
            .into_response()
    })
}

// ============================================================================
// SECTION: Extractors
// ============================================================================

/// Dataset identifier taken from the path tail; empty when absent.
struct DatasetPath(DatasetId);

impl<S> FromRequestParts<S> for DatasetPath
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let params = RawPathParams::from_request_parts(parts, state)
            .await
            .map_err(|rejection| GatewayError::MalformedRequest(rejection.body_text()))?;
        let id = params.iter().find(|(key, _)| *key == "id").map_or("", |(_, value)| value);
        Ok(Self(DatasetId::new(id)))
    }
}

/// Rejects empty identifiers on mutating endpoints.
fn require_identifier(dataset_id: &DatasetId) -> Result<(), GatewayError> {
    if dataset_id.is_empty() {
        return Err(GatewayError::MalformedRequest(
            "dataset identifier must not be empty".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Dataset summary returned by `/dataset/info`.
#[derive(Debug, Serialize)]
struct DatasetInfo {
    /// Dataset identifier.
    dataset: DatasetId,
    /// Current policy.
    policy: Policy,
    /// Every checkout recorded for the dataset.
    checkouts: Vec<DatasetCheckout>,
}

/// `GET /dataset/ids`
async fn list_dataset_ids(State(state): State<GatewayState>) -> Result<Response, GatewayError> {
    let ids = state.datasets.dataset_ids()?;
    let body = serde_json::to_vec(&ids)
        .map_err(|err| GatewayError::Internal(format!("dataset id encoding failed: {err}")))?;
    let length = HeaderValue::from(body.len());
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_LENGTH, length);
    Ok(response)
}

/// `GET /dataset/info/{id}`
async fn dataset_info(
    State(state): State<GatewayState>,
    DatasetPath(dataset_id): DatasetPath,
) -> Result<Json<DatasetInfo>, GatewayError> {
    state.gate.require_existing(&dataset_id)?;
    let dataset = state
        .datasets
        .dataset(&dataset_id)?
        .ok_or_else(|| GateError::DatasetNotFound(dataset_id.clone()))?;
    let checkouts = state.recorder.history(&dataset_id)?;
    Ok(Json(DatasetInfo {
        dataset: dataset.id,
        policy: dataset.policy,
        checkouts,
    }))
}

/// `PUT /dataset/new_policy/{id}`
async fn set_dataset_policy(
    State(state): State<GatewayState>,
    DatasetPath(dataset_id): DatasetPath,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, GatewayError> {
    let body =
        body.map_err(|rejection| GatewayError::MalformedRequest(rejection.body_text()))?;
    let content_type = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok());
    state.gate.set_policy(&dataset_id, content_type, &body)?;
    Ok((StatusCode::CREATED, format!("Successfully set a new policy for {dataset_id}\n"))
        .into_response())
}

/// `GET /dataset/data/{id}`
async fn get_dataset(
    State(state): State<GatewayState>,
    Extension(client): Extension<Client>,
    DatasetPath(dataset_id): DatasetPath,
) -> Result<Response, GatewayError> {
    let grant = state.gate.authorize_content(&dataset_id)?;
    let handler = state.handlers.content().ok_or_else(|| {
        tracing::warn!(dataset_id = %dataset_id, "no content handler registered");
        GateError::NotImplemented(
            "dataset download is not implemented for this service".to_string(),
        )
    })?;
    let response = handler.deliver(&grant, &client).await?;
    if response.status().is_success() {
        state.recorder.record(grant.dataset_id(), &client)?;
    }
    Ok(response)
}

/// `GET /dataset/metadata/{id}`
async fn get_metadata(
    State(state): State<GatewayState>,
    Extension(client): Extension<Client>,
    DatasetPath(dataset_id): DatasetPath,
) -> Result<Response, GatewayError> {
    state.gate.require_existing(&dataset_id)?;
    let handler = state.handlers.metadata().ok_or_else(|| {
        tracing::warn!(dataset_id = %dataset_id, "no metadata handler registered");
        GateError::NotImplemented("metadata handler is not registered".to_string())
    })?;
    handler.describe(&dataset_id, &client).await
}

/// `POST /dataset/addset/{id}`
async fn add_dataset(
    State(state): State<GatewayState>,
    DatasetPath(dataset_id): DatasetPath,
) -> Result<Response, GatewayError> {
    require_identifier(&dataset_id)?;
    state.datasets.insert_dataset(Dataset::new(dataset_id.clone())).inspect_err(|err| {
        tracing::info!(dataset_id = %dataset_id, error = %err, "dataset not added");
    })?;
    tracing::info!(dataset_id = %dataset_id, "dataset added");
    Ok((StatusCode::OK, format!("Successfully added dataset '{dataset_id}' to the node\n"))
        .into_response())
}

/// `GET /dataset/removeset/{id}`
async fn remove_dataset(
    State(state): State<GatewayState>,
    DatasetPath(dataset_id): DatasetPath,
) -> Result<Response, GatewayError> {
    require_identifier(&dataset_id)?;
    state.gate.require_existing(&dataset_id)?;
    state
        .datasets
        .remove_dataset(&dataset_id)
        .map_err(|err| GatewayError::Internal(err.to_string()))?;
    tracing::info!(dataset_id = %dataset_id, "dataset removed");
    Ok((StatusCode::OK, format!("Successfully removed dataset '{dataset_id}' from the node\n"))
        .into_response())
}
