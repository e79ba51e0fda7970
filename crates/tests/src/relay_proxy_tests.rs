//! The server's relay pass-through, broadcaster lookup and health routes.

use crate::mock_infrastructure::{app_config, RelayMockBuilder, RpcMockBuilder, ONE, SEPOLIA, USDC};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mockito::Matcher;
use serde_json::{json, Value};
use tower::ServiceExt;
use umbra_core::runtime::UmbraRuntime;

fn app(rpc_url: &str, relay_url: &str) -> Router {
    let config = app_config(&[rpc_url.to_string()], relay_url);
    let runtime = UmbraRuntime::builder().with_config(config.clone()).build().unwrap();
    server::create_app(runtime.components().clone(), &config.server)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_fees_are_proxied() {
    let mut relay = RelayMockBuilder::new().await;
    relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let (status, body) = send(app("http://127.0.0.1:1", &relay.url()), get("/relay/fees")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["railgunAddress"], "0zk1relay");
    assert_eq!(body["fees"][USDC]["feesID"], "fees-1");
}

#[tokio::test]
async fn test_submission_body_is_forwarded_verbatim() {
    let submission = json!({"chainId": SEPOLIA, "feesID": "fees-1", "transaction": "0xabcdef"});
    let mut relay = RelayMockBuilder::new().await;
    let submit = relay
        .server()
        .mock("POST", "/submit")
        .match_body(Matcher::Json(submission.clone()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"txHash": "0x01"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let (status, body) = send(app("http://127.0.0.1:1", &relay.url()), self::submit(&submission)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"txHash": "0x01"}));
    submit.assert_async().await;
}

fn submit(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/relay/submit")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_submission_rejection_keeps_relay_status_and_body() {
    let mut relay = RelayMockBuilder::new().await;
    let rejected = relay
        .server()
        .mock("POST", "/submit")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"fee too low"}"#)
        .expect(1)
        .create_async()
        .await;

    let request = submit(&json!({"chainId": SEPOLIA, "transaction": "0xabcdef"}));
    let (status, body) = send(app("http://127.0.0.1:1", &relay.url()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "fee too low"}));
    rejected.assert_async().await;
}

#[tokio::test]
async fn test_submission_to_unreachable_relay_is_bad_gateway() {
    let app = app("http://127.0.0.1:1", "http://127.0.0.1:1");

    let (status, body) = send(app, submit(&json!({"chainId": SEPOLIA}))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["kind"], "relay_unreachable");
}

#[tokio::test]
async fn test_submission_requires_json() {
    let relay = RelayMockBuilder::new().await;
    let request = Request::builder()
        .method("POST")
        .uri("/relay/submit")
        .header("content-type", "text/plain")
        .body(Body::from("0xabcdef"))
        .unwrap();

    let (status, _) = send(app("http://127.0.0.1:1", &relay.url()), request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_info_is_proxied() {
    let mut relay = RelayMockBuilder::new().await;
    relay.mock_info(&json!({"listenAddresses": ["/ip4/127.0.0.1/tcp/9000"]})).await;

    let (status, body) =
        send(app("http://127.0.0.1:1", &relay.url()), get("/relay/debug/v1/info")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["listenAddresses"][0], "/ip4/127.0.0.1/tcp/9000");
}

#[tokio::test]
async fn test_relay_down_is_bad_gateway() {
    let app = app("http://127.0.0.1:1", "http://127.0.0.1:1");
    let (status, body) = send(app, get("/relay/fees")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["kind"], "relay_unreachable");
}

#[tokio::test]
async fn test_broadcaster_lookup_returns_selection() {
    let mut relay = RelayMockBuilder::new().await;
    relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let (status, body) = send(
        app("http://127.0.0.1:1", &relay.url()),
        get(&format!("/broadcaster/{SEPOLIA}/{USDC}?relay_adapt=true")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["relayAddress"], "0zk1relay");
    assert_eq!(body["feesID"], "fees-1");
}

#[tokio::test]
async fn test_health_reports_endpoint_and_discovery_state() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_block_number(5);
    let mut relay = RelayMockBuilder::new().await;
    relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let app = app(&node.url(), &relay.url());

    let (status, body) = send(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let chain = &body["chains"][0];
    assert_eq!(chain["chainId"], SEPOLIA);
    assert_eq!(chain["network"], "test");
    assert_eq!(chain["preferredEndpoint"], node.url());
    assert_eq!(chain["discoveryMode"], "http");
    assert_eq!(chain["discoveryReady"], false);

    let (status, _) = send(app.clone(), get(&format!("/broadcaster/{SEPOLIA}/{USDC}"))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(app, get("/health")).await;
    assert_eq!(body["chains"][0]["discoveryReady"], true);
    assert_eq!(body["chains"][0]["discoveryState"], "ready");
}

#[tokio::test]
async fn test_health_leaves_exhausted_chain_untouched() {
    let urls = ["http://127.0.0.1:1".to_string(), "http://127.0.0.1:2".to_string()];
    let config = app_config(&urls, "http://127.0.0.1:1");
    let runtime = UmbraRuntime::builder().with_config(config.clone()).build().unwrap();
    let registry = runtime.upstream_manager().registry();
    for url in &urls {
        registry.record_failure(SEPOLIA, url);
    }
    let app = server::create_app(runtime.components().clone(), &config.server);

    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chains"][0]["preferredEndpoint"], Value::Null);
    assert_eq!(body["chains"][0]["failedEndpoints"], json!(urls));
    assert_eq!(registry.snapshot(SEPOLIA).failed.len(), 2);
}
