//! Gas and relay fee estimation through the assembled runtime.

use crate::mock_infrastructure::{
    app_config, RelayMockBuilder, RpcMockBuilder, ONE, SEPOLIA, USDC, WETH,
};
use alloy_primitives::U256;
use umbra_core::{
    errors::ErrorKind,
    gas::{GasError, GasEstimateKind, TransactionRequest},
    runtime::UmbraRuntime,
    types::TokenAddress,
};

const POOL: &str = "0x1111111111111111111111111111111111111111";
const ADAPTER: &str = "0x2222222222222222222222222222222222222222";
const GWEI: u64 = 1_000_000_000;

fn tx() -> TransactionRequest {
    TransactionRequest {
        from: None,
        to: POOL.to_string(),
        data: Some("0xdeadbeef".into()),
        value: None,
    }
}

fn usdc() -> TokenAddress {
    USDC.parse().unwrap()
}

fn runtime(rpc_urls: &[String], relay_url: &str, adapter: Option<&str>) -> UmbraRuntime {
    let mut config = app_config(rpc_urls, relay_url);
    config.gas.relay_adapt_address = adapter.map(str::to_string);
    UmbraRuntime::builder().with_config(config).build().unwrap()
}

#[tokio::test]
async fn test_relayed_estimate_prices_fee_in_token() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_estimate_gas(100_000).mock_gas_price(20 * GWEI);
    let mut relay = RelayMockBuilder::new().await;
    // 2.0 token units per unit of gas
    relay.mock_fees("0zk1relay", &[(USDC, "0x1bc16d674ec80000", "fees-7")], 1).await;

    let runtime = runtime(&[node.url()], &relay.url(), None);
    let estimate =
        runtime.gas_estimator().estimate_relayed(SEPOLIA, &tx(), &usdc(), false).await.unwrap();

    assert_eq!(estimate.gas.gas_limit, 100_000);
    assert_eq!(estimate.gas.kind, GasEstimateKind::Exact);
    assert_eq!(estimate.gas_price, U256::from(20 * GWEI));
    assert_eq!(estimate.broadcaster.fees_id, "fees-7");
    // 100_000 gas * 20 gwei * 2.0
    assert_eq!(estimate.broadcaster_fee, U256::from(4_000_000u64 * GWEI));
}

#[tokio::test]
async fn test_relay_adapt_estimate_targets_adapter() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_estimate_gas_to(ADAPTER, 250_000).mock_gas_price(GWEI);
    let mut relay = RelayMockBuilder::new().await;
    relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let runtime = runtime(&[node.url()], &relay.url(), Some(ADAPTER));
    let estimate =
        runtime.gas_estimator().estimate_relayed(SEPOLIA, &tx(), &usdc(), true).await.unwrap();

    assert_eq!(estimate.gas.gas_limit, 250_000);
    assert_eq!(estimate.gas.kind, GasEstimateKind::Exact);
}

#[tokio::test]
async fn test_relay_adapt_without_adapter_is_lower_bound() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_estimate_gas(21_000).mock_gas_price(GWEI);
    let mut relay = RelayMockBuilder::new().await;
    relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let runtime = runtime(&[node.url()], &relay.url(), None);
    let estimate =
        runtime.gas_estimator().estimate_relayed(SEPOLIA, &tx(), &usdc(), true).await.unwrap();

    assert_eq!(estimate.gas.gas_limit, 21_000 + 150_000);
    assert_eq!(estimate.gas.kind, GasEstimateKind::LowerBound);
    assert_eq!(estimate.broadcaster_fee, U256::from(171_000u64 * GWEI));
}

#[tokio::test]
async fn test_estimate_falls_back_across_endpoints() {
    let mut broken = RpcMockBuilder::new().await;
    broken.mock_server_error();
    let mut node = RpcMockBuilder::new().await;
    node.mock_estimate_gas(60_000).mock_gas_price(GWEI);
    let mut relay = RelayMockBuilder::new().await;
    relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let runtime = runtime(&[broken.url(), node.url()], &relay.url(), None);
    let estimate =
        runtime.gas_estimator().estimate_relayed(SEPOLIA, &tx(), &usdc(), false).await.unwrap();

    assert_eq!(estimate.gas.gas_limit, 60_000);
    assert_eq!(
        runtime.upstream_manager().registry().snapshot(SEPOLIA).last_success,
        Some(node.url())
    );
}

#[tokio::test]
async fn test_unlisted_token_has_no_broadcaster() {
    let node = RpcMockBuilder::new().await;
    let mut relay = RelayMockBuilder::new().await;
    relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let runtime = runtime(&[node.url()], &relay.url(), None);
    let weth: TokenAddress = WETH.parse().unwrap();
    let err =
        runtime.gas_estimator().estimate_relayed(SEPOLIA, &tx(), &weth, false).await.unwrap_err();

    assert!(matches!(err, GasError::NoBroadcaster { chain: SEPOLIA, .. }));
    assert_eq!(err.kind(), ErrorKind::BroadcasterUnavailable);
}

#[tokio::test]
async fn test_relay_down_is_broadcaster_unavailable() {
    let node = RpcMockBuilder::new().await;
    let mut relay = RelayMockBuilder::new().await;
    relay.mock_fees_failure(502, 1).await;

    let runtime = runtime(&[node.url()], &relay.url(), None);
    let err =
        runtime.gas_estimator().estimate_relayed(SEPOLIA, &tx(), &usdc(), false).await.unwrap_err();

    assert!(matches!(err, GasError::Discovery(_)));
    assert_eq!(err.kind(), ErrorKind::BroadcasterUnavailable);
    assert!(err.kind().is_retryable());
}

#[tokio::test]
async fn test_reverting_transaction_is_rejected() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_rpc_error("eth_estimateGas", 3, "execution reverted: invalid proof");
    let mut relay = RelayMockBuilder::new().await;
    relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let runtime = runtime(&[node.url()], &relay.url(), None);
    let err =
        runtime.gas_estimator().estimate_relayed(SEPOLIA, &tx(), &usdc(), false).await.unwrap_err();

    assert!(matches!(err, GasError::Rejected { code: 3, .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(runtime.upstream_manager().registry().snapshot(SEPOLIA).failed.is_empty());
}

#[tokio::test]
async fn test_every_endpoint_down_is_network_unreachable() {
    let mut a = RpcMockBuilder::new().await;
    a.mock_server_error();

    let runtime = runtime(&[a.url()], "http://127.0.0.1:1", None);
    let err = runtime.gas_estimator().estimate_gas(SEPOLIA, &tx()).await.unwrap_err();

    assert!(matches!(err, GasError::Network(_)));
    assert_eq!(err.kind(), ErrorKind::NetworkUnreachable);
    assert_eq!(err.kind().user_message(), "could not reach network");
}
