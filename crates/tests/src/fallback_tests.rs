//! Sequential fallback over real HTTP endpoints.
//!
//! Each chain gets several mockito nodes. The tests check the order endpoints are tried in,
//! how outcomes land in the health registry, and which failures move on to the next node.

use crate::mock_infrastructure::{test_chain, RpcMockBuilder, SEPOLIA};
use mockito::Matcher;
use serde_json::json;
use umbra_core::{
    errors::ErrorKind,
    types::JsonRpcRequest,
    upstream::{FallbackError, UpstreamManager, UpstreamManagerBuilder},
};

/// Port 1 refuses connections.
const DEAD: &str = "http://127.0.0.1:1";

fn manager(urls: &[String]) -> UpstreamManager {
    UpstreamManagerBuilder::new().chain(test_chain(SEPOLIA, urls)).build().unwrap()
}

fn block_number() -> JsonRpcRequest {
    JsonRpcRequest::new("eth_blockNumber", None, json!(1))
}

#[tokio::test]
async fn test_first_healthy_endpoint_answers() {
    let mut primary = RpcMockBuilder::new().await;
    primary.mock_block_number(100);
    let mut backup = RpcMockBuilder::new().await;
    backup.mock_block_number(200);

    let manager = manager(&[primary.url(), backup.url()]);
    let response = manager.send_request(SEPOLIA, &block_number()).await.unwrap();

    assert_eq!(response.result, Some(json!("0x64")));
    assert!(primary.verify_all_called());
    assert!(!backup.verify_all_called());
}

#[tokio::test]
async fn test_failed_endpoint_is_skipped_until_recovery() {
    let mut flaky = RpcMockBuilder::new().await;
    let flaky_mock = flaky
        .server()
        .mock("POST", "/")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let mut backup = RpcMockBuilder::new().await;
    let backup_mock = backup
        .server()
        .mock("POST", "/")
        .match_body(Matcher::Regex("eth_blockNumber".into()))
        .with_status(200)
        .with_body(json!({"jsonrpc": "2.0", "id": 1, "result": "0xc8"}).to_string())
        .expect(3)
        .create_async()
        .await;

    let manager = manager(&[flaky.url(), backup.url()]);

    for _ in 0..3 {
        let response = manager.send_request(SEPOLIA, &block_number()).await.unwrap();
        assert_eq!(response.result, Some(json!("0xc8")));
    }

    // the failed primary was only tried once; later calls started at the backup
    flaky_mock.assert_async().await;
    backup_mock.assert_async().await;

    let snapshot = manager.registry().snapshot(SEPOLIA);
    assert_eq!(snapshot.failed, vec![flaky.url()]);
    assert_eq!(snapshot.last_success, Some(backup.url()));
}

#[tokio::test]
async fn test_last_success_is_preferred_over_configured_order() {
    let mut first = RpcMockBuilder::new().await;
    first.mock_block_number(1);
    let mut second = RpcMockBuilder::new().await;
    second.mock_block_number(2);

    let manager = manager(&[first.url(), second.url()]);
    manager.registry().record_success(SEPOLIA, &second.url());

    let response = manager.send_request(SEPOLIA, &block_number()).await.unwrap();

    assert_eq!(response.result, Some(json!("0x2")));
    assert!(!first.verify_all_called());
}

#[tokio::test]
async fn test_unreachable_endpoint_falls_through() {
    let mut live = RpcMockBuilder::new().await;
    live.mock_block_number(7);

    let manager = manager(&[DEAD.to_string(), live.url()]);
    let response = manager.send_request(SEPOLIA, &block_number()).await.unwrap();

    assert_eq!(response.result, Some(json!("0x7")));
    assert_eq!(manager.registry().snapshot(SEPOLIA).failed, vec![DEAD.to_string()]);
}

#[tokio::test]
async fn test_all_endpoints_failing_resets_health() {
    let mut a = RpcMockBuilder::new().await;
    a.mock_server_error();
    let mut b = RpcMockBuilder::new().await;
    b.mock_server_error();

    let manager = manager(&[a.url(), b.url()]);
    let err = manager.send_request(SEPOLIA, &block_number()).await.unwrap_err();

    assert!(matches!(err, FallbackError::Exhausted { attempts: 2, .. }));
    assert_eq!(err.kind(), ErrorKind::NetworkUnreachable);
    assert!(manager.registry().snapshot(SEPOLIA).failed.is_empty());

    // the next call starts over at the first configured endpoint
    assert_eq!(manager.registry().preferred_endpoint(SEPOLIA).unwrap().as_ref(), a.url());
}

#[tokio::test]
async fn test_reverted_call_is_answer_not_failure() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_rpc_error("eth_call", 3, "execution reverted: insufficient balance");
    let mut backup = RpcMockBuilder::new().await;
    backup.mock_method("eth_call", &json!("0x"));

    let manager = manager(&[node.url(), backup.url()]);
    let params = json!([{"to": "0x01"}, "latest"]);
    let request = JsonRpcRequest::new("eth_call", Some(params), json!(9));
    let response = manager.send_request(SEPOLIA, &request).await.unwrap();

    let error = response.error.unwrap();
    assert_eq!(error.code, 3);
    assert!(error.message.contains("execution reverted"));
    assert!(!backup.verify_all_called());
    assert!(manager.registry().snapshot(SEPOLIA).failed.is_empty());
}

#[tokio::test]
async fn test_provider_rpc_error_moves_to_next_endpoint() {
    let mut limited = RpcMockBuilder::new().await;
    limited.mock_rpc_error("eth_blockNumber", -32005, "rate limit exceeded");
    let mut backup = RpcMockBuilder::new().await;
    backup.mock_block_number(42);

    let manager = manager(&[limited.url(), backup.url()]);
    let response = manager.send_request(SEPOLIA, &block_number()).await.unwrap();

    assert_eq!(response.result, Some(json!("0x2a")));
    assert_eq!(manager.registry().snapshot(SEPOLIA).failed, vec![limited.url()]);
}

#[tokio::test]
async fn test_chains_do_not_share_health() {
    let mut sepolia_node = RpcMockBuilder::new().await;
    sepolia_node.mock_server_error();
    let mut sepolia_backup = RpcMockBuilder::new().await;
    sepolia_backup.mock_block_number(1);
    let mut other_node = RpcMockBuilder::new().await;
    other_node.mock_block_number(2);

    let manager = UpstreamManagerBuilder::new()
        .chain(test_chain(SEPOLIA, &[sepolia_node.url(), sepolia_backup.url()]))
        .chain(test_chain(80_002, &[other_node.url()]))
        .build()
        .unwrap();

    manager.send_request(SEPOLIA, &block_number()).await.unwrap();

    assert!(manager.registry().snapshot(80_002).failed.is_empty());
    assert_eq!(manager.registry().preferred_endpoint(80_002).unwrap().as_ref(), other_node.url());
}

#[tokio::test]
async fn test_unconfigured_chain_is_configuration_error() {
    let manager = manager(&[DEAD.to_string()]);

    let err = manager.send_request(999, &block_number()).await.unwrap_err();

    assert!(matches!(err, FallbackError::NoCandidates { chain: 999 }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_probe_records_every_outcome() {
    let mut live = RpcMockBuilder::new().await;
    live.mock_block_number(1_000);

    let manager = manager(&[DEAD.to_string(), live.url()]);
    let results = manager.probe(SEPOLIA).await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].error.is_some());
    assert_eq!(results[1].block_number, Some(1_000));

    let snapshot = manager.registry().snapshot(SEPOLIA);
    assert_eq!(snapshot.failed, vec![DEAD.to_string()]);
    assert_eq!(snapshot.last_success, Some(live.url()));
}
