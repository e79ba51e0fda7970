//! Runtime builder validation, discovery warmup and shutdown.
//!
//! Tests use `tokio::time::timeout` so a broken shutdown fails instead of hanging.

use crate::mock_infrastructure::{app_config, RelayMockBuilder, ONE, SEPOLIA, USDC};
use tokio::time::{timeout, Duration};
use umbra_core::{
    broadcaster::{DiscoveryMode, SessionState},
    config::AppConfig,
    runtime::{RuntimeError, UmbraRuntime, UmbraRuntimeBuilder},
};

const UNUSED_RPC: &str = "https://rpc.sepolia.example";
const UNUSED_RELAY: &str = "http://127.0.0.1:9";

fn config() -> AppConfig {
    app_config(&[UNUSED_RPC.to_string()], UNUSED_RELAY)
}

#[tokio::test]
async fn test_builder_missing_config_returns_error() {
    let result = UmbraRuntimeBuilder::new().build();

    assert!(matches!(result, Err(RuntimeError::ConfigValidation(_))));
}

#[tokio::test]
async fn test_builder_rejects_chain_without_endpoints() {
    let mut config = config();
    config.chains[0].rpc_urls.clear();

    let result = UmbraRuntime::builder().with_config(config).build();

    assert!(matches!(
        result,
        Err(RuntimeError::ConfigValidation(msg)) if msg.contains("no rpc urls")
    ));
}

#[tokio::test]
async fn test_builder_rejects_unsupported_quorum() {
    let mut config = config();
    config.quorum.quorum = 2;

    let result = UmbraRuntime::builder().with_config(config).build();

    assert!(matches!(result, Err(RuntimeError::ConfigValidation(msg)) if msg.contains("quorum")));
}

#[tokio::test]
async fn test_builder_rejects_unknown_warmup_chain() {
    let mut config = config();
    config.broadcaster.warmup_chain_id = Some(1);

    let result = UmbraRuntime::builder().with_config(config).build();

    assert!(matches!(result, Err(RuntimeError::ConfigValidation(msg)) if msg.contains("warmup")));
}

#[tokio::test]
async fn test_components_are_wired_from_config() {
    let runtime = UmbraRuntime::builder().with_config(config()).build().unwrap();

    assert_eq!(runtime.upstream_manager().chains(), vec![SEPOLIA]);
    assert_eq!(runtime.upstream_manager().endpoints(SEPOLIA).len(), 1);
    assert_eq!(runtime.broadcasters().mode(SEPOLIA).unwrap(), DiscoveryMode::Http);
    assert_eq!(runtime.broadcasters().relay().base_url(), UNUSED_RELAY);
    assert_eq!(runtime.config().chains.len(), 1);

    timeout(Duration::from_secs(2), runtime.shutdown()).await.unwrap();
}

#[tokio::test]
async fn test_components_outlive_runtime_clone() {
    let runtime = UmbraRuntime::builder().with_config(config()).build().unwrap();
    let components = runtime.components().clone();

    timeout(Duration::from_secs(2), runtime.shutdown()).await.unwrap();

    assert_eq!(components.upstream_manager().chains(), vec![SEPOLIA]);
}

#[tokio::test]
async fn test_without_warmup_discovery_stays_idle() {
    let mut relay = RelayMockBuilder::new().await;
    let fees = relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 0).await;

    let mut config = app_config(&[UNUSED_RPC.to_string()], &relay.url());
    config.broadcaster.warmup_chain_id = Some(SEPOLIA);

    let runtime = UmbraRuntime::builder().with_config(config).build().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(runtime.broadcasters().state(SEPOLIA).unwrap(), SessionState::Uninitialized);
    runtime.shutdown().await;
    fees.assert_async().await;
}

#[tokio::test]
async fn test_warmup_starts_discovery_in_background() {
    let mut relay = RelayMockBuilder::new().await;
    let fees = relay.mock_fees("0zk1relay", &[(USDC, ONE, "fees-1")], 1).await;

    let mut config = app_config(&[UNUSED_RPC.to_string()], &relay.url());
    config.broadcaster.warmup_chain_id = Some(SEPOLIA);

    let runtime = UmbraRuntime::builder()
        .with_config(config)
        .enable_discovery_warmup()
        .build()
        .unwrap();

    timeout(Duration::from_secs(5), async {
        while !runtime.broadcasters().is_ready(SEPOLIA) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    // the warm snapshot answers without another fetch
    let token = USDC.parse().unwrap();
    let found = runtime.broadcasters().find_broadcaster(SEPOLIA, &token, false).await.unwrap();
    assert!(found.is_some());

    timeout(Duration::from_secs(2), runtime.shutdown()).await.unwrap();
    fees.assert_async().await;
}

#[tokio::test]
async fn test_shutdown_interrupts_slow_warmup() {
    // the relay never answers within the test, so warmup is still running at shutdown
    let mut config = app_config(&[UNUSED_RPC.to_string()], "http://10.255.255.1:81");
    config.broadcaster.warmup_chain_id = Some(SEPOLIA);
    config.broadcaster.fee_fetch_timeout_seconds = 60;

    let runtime = UmbraRuntime::builder()
        .with_config(config)
        .enable_discovery_warmup()
        .build()
        .unwrap();

    timeout(Duration::from_secs(2), runtime.shutdown())
        .await
        .expect("shutdown should not wait for the warmup fetch");
}
