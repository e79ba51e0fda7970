//! HTTP-mode broadcaster discovery against a mock relay.

use crate::mock_infrastructure::{RelayMockBuilder, ONE, SEPOLIA, USDC, WETH};
use alloy_primitives::U256;
use futures::future::join_all;
use std::{sync::Arc, time::Duration};
use umbra_core::{
    broadcaster::{DiscoveryError, FeeSource, HttpDiscovery, RelayClient, SessionState},
    errors::ErrorKind,
    types::TokenAddress,
    upstream::HttpClient,
};

fn discovery(relay_url: &str, ttl: Duration) -> HttpDiscovery {
    let client = Arc::new(HttpClient::new().unwrap());
    let relay = RelayClient::new(client, relay_url, Duration::from_secs(5));
    HttpDiscovery::new(Arc::new(relay) as Arc<dyn FeeSource>, ttl, Duration::from_secs(5))
}

fn token(address: &str) -> TokenAddress {
    address.parse().unwrap()
}

#[tokio::test]
async fn test_finds_listed_token() {
    let mut relay = RelayMockBuilder::new().await;
    relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let discovery = discovery(&relay.url(), Duration::from_secs(60));
    let selection = discovery.find(SEPOLIA, &token(USDC), false).await.unwrap().unwrap();

    assert_eq!(selection.relay_address, "0zk1relay");
    assert_eq!(selection.fees_id, "fees-1");
    assert_eq!(selection.fee_per_unit_gas, U256::from(1_000_000_000_000_000_000u64));
    assert!(discovery.is_ready(SEPOLIA));
}

#[tokio::test]
async fn test_token_lookup_is_case_insensitive() {
    let mut relay = RelayMockBuilder::new().await;
    relay
        .mock_fees("0zk1relay", &[("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", ONE, "f")], 1)
        .await;

    let discovery = discovery(&relay.url(), Duration::from_secs(60));
    let selection = discovery.find(SEPOLIA, &token(USDC), true).await.unwrap();

    assert!(selection.is_some());
}

#[tokio::test]
async fn test_unlisted_token_is_not_found() {
    let mut relay = RelayMockBuilder::new().await;
    relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let discovery = discovery(&relay.url(), Duration::from_secs(60));

    assert_eq!(discovery.find(SEPOLIA, &token(WETH), false).await.unwrap(), None);
    // a miss is not a failure
    assert_eq!(discovery.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_snapshot_is_reused_within_ttl() {
    let mut relay = RelayMockBuilder::new().await;
    let fees = relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let discovery = discovery(&relay.url(), Duration::from_secs(60));
    for _ in 0..5 {
        discovery.find(SEPOLIA, &token(USDC), false).await.unwrap();
    }

    fees.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_lookups_share_one_fetch() {
    let mut relay = RelayMockBuilder::new().await;
    let fees = relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let discovery = discovery(&relay.url(), Duration::from_secs(60));
    let usdc = token(USDC);
    let results = join_all((0..10).map(|_| discovery.find(SEPOLIA, &usdc, false))).await;

    assert!(results.iter().all(|r| matches!(r, Ok(Some(_)))));
    fees.assert_async().await;
}

#[tokio::test]
async fn test_expired_snapshot_is_refetched() {
    let mut relay = RelayMockBuilder::new().await;
    let fees = relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 2).await;

    let discovery = discovery(&relay.url(), Duration::from_millis(50));
    discovery.find(SEPOLIA, &token(USDC), false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    discovery.find(SEPOLIA, &token(USDC), false).await.unwrap();

    fees.assert_async().await;
}

#[tokio::test]
async fn test_fetch_failure_leaves_session_failed_then_recovers() {
    let mut relay = RelayMockBuilder::new().await;
    let failure = relay.mock_fees_failure(503, 1).await;

    let discovery = discovery(&relay.url(), Duration::from_secs(60));
    let err = discovery.find(SEPOLIA, &token(USDC), false).await.unwrap_err();

    assert!(matches!(err, DiscoveryError::FeeFetch(_)));
    assert_eq!(err.kind(), ErrorKind::BroadcasterUnavailable);
    assert_eq!(discovery.state(), SessionState::Failed);
    assert!(discovery.snapshot().is_none());
    failure.assert_async().await;
    failure.remove_async().await;

    relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-2")], 1).await;
    let selection = discovery.find(SEPOLIA, &token(USDC), false).await.unwrap().unwrap();

    assert_eq!(selection.fees_id, "fees-2");
    assert_eq!(discovery.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_switching_chain_replaces_snapshot() {
    let mut relay = RelayMockBuilder::new().await;
    let fees = relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 2).await;

    let discovery = discovery(&relay.url(), Duration::from_secs(60));
    discovery.start(SEPOLIA).await.unwrap();
    discovery.start(80_002).await.unwrap();

    assert!(!discovery.is_ready(SEPOLIA));
    assert!(discovery.is_ready(80_002));
    assert_eq!(discovery.snapshot().unwrap().chain_id, 80_002);
    fees.assert_async().await;
}

#[tokio::test]
async fn test_malformed_fee_schedule_is_fetch_failure() {
    let mut relay = RelayMockBuilder::new().await;
    relay
        .server()
        .mock("GET", "/fees")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let discovery = discovery(&relay.url(), Duration::from_secs(60));
    let err = discovery.start(SEPOLIA).await.unwrap_err();

    assert!(matches!(err, DiscoveryError::FeeFetch(_)));
}
