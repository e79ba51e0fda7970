use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use umbra_core::{
    errors::ErrorKind,
    gas::{GasError, TransactionRequest},
    runtime::UmbraComponents,
    types::{ChainId, JsonRpcRequest, JsonRpcResponse, TokenAddress},
    upstream::UpstreamManager,
};

/// JSON error body shared by the non-RPC routes.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self { status, kind, message: message.into() }
    }

    fn from_kind(kind: ErrorKind) -> Self {
        Self::new(status_for(kind), kind.as_str(), kind.user_message())
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::InvalidInput.as_str(), message)
    }

    fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "relay_unreachable", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": { "kind": self.kind, "message": self.message } })))
            .into_response()
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NetworkUnreachable => StatusCode::BAD_GATEWAY,
        ErrorKind::BroadcasterUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Configuration => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
    }
}

/// Forwards a JSON-RPC request (single or batch) to `chain_id` through sequential fallback.
///
/// A node-side JSON-RPC error is passed through as-is. When every endpoint fails the
/// response is a JSON-RPC error with code `-32603` and a `502` status.
pub async fn handle_rpc(
    State(components): State<UmbraComponents>,
    Path(chain_id): Path<ChainId>,
    Json(payload): Json<Value>,
) -> Response {
    let upstreams = components.upstream_manager();

    match payload {
        Value::Array(items) => {
            debug!(chain_id, batch_size = items.len(), "batched rpc request");
            let responses = futures::future::join_all(
                items.into_iter().map(|item| forward_rpc(upstreams, chain_id, item)),
            )
            .await;
            let body: Vec<Value> = responses.into_iter().map(|(_, body)| body).collect();
            (StatusCode::OK, Json(Value::Array(body))).into_response()
        }
        single => {
            let (status, body) = forward_rpc(upstreams, chain_id, single).await;
            (status, Json(body)).into_response()
        }
    }
}

async fn forward_rpc(
    upstreams: &Arc<UpstreamManager>,
    chain_id: ChainId,
    payload: Value,
) -> (StatusCode, Value) {
    let id = Arc::new(payload.get("id").cloned().unwrap_or(Value::Null));

    let request: JsonRpcRequest = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(e) => {
            let response = JsonRpcResponse::error(-32600, format!("invalid request: {e}"), id);
            return (StatusCode::BAD_REQUEST, to_value(&response));
        }
    };

    match upstreams.send_request(chain_id, &request).await {
        Ok(response) => (StatusCode::OK, to_value(&response)),
        Err(e) => {
            let kind = e.kind();
            warn!(chain_id, method = %request.method, error = %e, "rpc forwarding failed");
            let response =
                JsonRpcResponse::error(-32603, kind.user_message().to_string(), request.id);
            (status_for(kind), to_value(&response))
        }
    }
}

fn to_value(response: &JsonRpcResponse) -> Value {
    serde_json::to_value(response).unwrap_or(Value::Null)
}

#[derive(Debug, Default, Deserialize)]
pub struct BroadcasterQuery {
    #[serde(default)]
    pub relay_adapt: bool,
}

/// Finds a relay accepting `token` on `chain_id`.
///
/// # Errors
///
/// `400` for a malformed token, `404` when no relay serves it or the chain is unknown, `503`
/// when discovery is unavailable.
pub async fn handle_broadcaster(
    State(components): State<UmbraComponents>,
    Path((chain_id, token)): Path<(ChainId, String)>,
    Query(query): Query<BroadcasterQuery>,
) -> Result<Json<Value>, ApiError> {
    let token = TokenAddress::try_from(token.as_str())
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let found = components
        .broadcasters()
        .find_broadcaster(chain_id, &token, query.relay_adapt)
        .await
        .map_err(|e| {
            warn!(chain_id, token = %token, error = %e, "broadcaster discovery failed");
            ApiError::from_kind(e.kind())
        })?;

    match found {
        Some(selection) => Ok(Json(json!(selection))),
        None => Err(ApiError::not_found(format!("no broadcaster accepts {token}"))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasRequest {
    pub tx: TransactionRequest,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub relay_adapt: bool,
}

/// Direct estimate when `token` is absent, relayed estimate otherwise.
///
/// # Errors
///
/// Status follows the error kind; a missing broadcaster is `404`.
pub async fn handle_gas(
    State(components): State<UmbraComponents>,
    Path(chain_id): Path<ChainId>,
    Json(request): Json<GasRequest>,
) -> Result<Json<Value>, ApiError> {
    let estimator = components.gas_estimator();

    let body = match request.token {
        None => estimator.estimate_gas(chain_id, &request.tx).await.map(|e| json!(e)),
        Some(token) => {
            let token = TokenAddress::try_from(token.as_str())
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            estimator
                .estimate_relayed(chain_id, &request.tx, &token, request.relay_adapt)
                .await
                .map(|e| json!(e))
        }
    };

    body.map(Json).map_err(|e| {
        warn!(chain_id, error = %e, "gas estimation failed");
        match e {
            GasError::NoBroadcaster { .. } => ApiError::not_found(e.to_string()),
            GasError::Rejected { .. } => ApiError::bad_request(e.to_string()),
            other => ApiError::from_kind(other.kind()),
        }
    })
}

/// # Errors
///
/// `502` when the relay is unreachable.
pub async fn handle_relay_fees(
    State(components): State<UmbraComponents>,
) -> Result<Json<Value>, ApiError> {
    let fees = components.broadcasters().relay().fees().await.map_err(|e| {
        warn!(error = %e, "relay fee proxy failed");
        ApiError::bad_gateway(e.to_string())
    })?;
    Ok(Json(json!(fees)))
}

/// Forwards a submission body to the relay verbatim and answers with the relay's own status
/// and JSON body, rejections included.
///
/// # Errors
///
/// `502` when the relay cannot be reached or answers with something other than JSON.
pub async fn handle_relay_submit(
    State(components): State<UmbraComponents>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let relay = components.broadcasters().relay();
    info!(relay = %relay.base_url(), bytes = body.len(), "forwarding relay submission");

    let reply = relay.submit(body).await.map_err(|e| {
        warn!(error = %e, "relay submission failed");
        ApiError::bad_gateway(e.to_string())
    })?;
    let status = StatusCode::from_u16(reply.status).map_err(|_| {
        warn!(status = reply.status, "relay answered with an unusable status");
        ApiError::bad_gateway(format!("relay answered with status {}", reply.status))
    })?;
    Ok((status, Json(reply.body)))
}

/// # Errors
///
/// `502` when the relay is unreachable.
pub async fn handle_relay_info(
    State(components): State<UmbraComponents>,
) -> Result<Json<Value>, ApiError> {
    components.broadcasters().relay().info().await.map(Json).map_err(|e| {
        warn!(error = %e, "relay info proxy failed");
        ApiError::bad_gateway(e.to_string())
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChainHealth {
    chain_id: ChainId,
    name: String,
    network: String,
    endpoints: usize,
    preferred_endpoint: Option<String>,
    failed_endpoints: Vec<String>,
    discovery_mode: Option<String>,
    discovery_state: Option<String>,
    discovery_ready: bool,
}

pub async fn handle_health(State(components): State<UmbraComponents>) -> Json<Value> {
    let upstreams = components.upstream_manager();
    let broadcasters = components.broadcasters();

    let mut chains: Vec<ChainHealth> = upstreams
        .chains()
        .into_iter()
        .map(|chain_id| {
            let snapshot = upstreams.registry().snapshot(chain_id);
            ChainHealth {
                chain_id,
                name: upstreams.chain_name(chain_id).unwrap_or_default().to_string(),
                network: upstreams
                    .network_class(chain_id)
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
                endpoints: upstreams.endpoints(chain_id).len(),
                preferred_endpoint: upstreams
                    .registry()
                    .peek_preferred(chain_id)
                    .ok()
                    .flatten()
                    .map(|url| url.to_string()),
                failed_endpoints: snapshot.failed,
                discovery_mode: broadcasters.mode(chain_id).ok().map(|m| m.to_string()),
                discovery_state: broadcasters.state(chain_id).ok().map(|s| s.to_string()),
                discovery_ready: broadcasters.is_ready(chain_id),
            }
        })
        .collect();
    chains.sort_by_key(|c| c.chain_id);

    Json(json!({ "status": "ok", "chains": chains }))
}
