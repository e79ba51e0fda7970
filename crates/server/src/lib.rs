//! HTTP surface for umbra.
//!
//! Thin handlers over the core components: JSON-RPC forwarding through sequential
//! fallback, broadcaster lookup, gas estimation and a pass-through proxy to the configured
//! relay.

pub mod middleware;
pub mod router;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use umbra_core::{config::ServerConfig, runtime::UmbraComponents};

/// Largest accepted request body. Relay submissions carry proofs, so this is generous.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Builds the application router.
pub fn create_app(components: UmbraComponents, config: &ServerConfig) -> Router {
    let (set_request_id, propagate_request_id) = middleware::create_request_id_layers();

    let json_routes = Router::new()
        .route("/rpc/:chain_id", post(router::handle_rpc))
        .route("/gas/:chain_id", post(router::handle_gas))
        .route("/relay/submit", post(router::handle_relay_submit))
        .layer(axum_middleware::from_fn(middleware::require_json_content_type));

    let api = Router::new()
        .route("/health", get(router::handle_health))
        .route("/broadcaster/:chain_id/:token", get(router::handle_broadcaster))
        .route("/relay/fees", get(router::handle_relay_fees))
        .route("/relay/debug/v1/info", get(router::handle_relay_info))
        .merge(json_routes)
        .with_state(components);

    // layers run bottom-up: the request id is set before tracing sees the request
    api.layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http().make_span_with(middleware::make_request_span))
        .layer(propagate_request_id)
        .layer(set_request_id)
}
