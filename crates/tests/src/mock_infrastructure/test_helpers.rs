//! Configuration fixtures shared by the integration tests.

use umbra_core::{
    config::{AppConfig, BroadcasterConfig, ChainConfig},
    types::{ChainId, NetworkClass},
};

pub const SEPOLIA: ChainId = 11_155_111;

pub const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";

/// 1.0 scaled by 10^18.
pub const ONE: &str = "0x0de0b6b3a7640000";

/// A test-network chain served by `rpc_urls`, in order.
#[must_use]
pub fn test_chain(chain_id: ChainId, rpc_urls: &[String]) -> ChainConfig {
    ChainConfig {
        chain_id,
        name: format!("testnet-{chain_id}"),
        network: NetworkClass::Test,
        rpc_urls: rpc_urls.to_vec(),
    }
}

/// Configuration with Sepolia on `rpc_urls` and HTTP discovery against `relay_url`.
#[must_use]
pub fn app_config(rpc_urls: &[String], relay_url: &str) -> AppConfig {
    AppConfig {
        chains: vec![test_chain(SEPOLIA, rpc_urls)],
        broadcaster: BroadcasterConfig {
            relay_base_url: relay_url.to_string(),
            ..BroadcasterConfig::default()
        },
        ..AppConfig::default()
    }
}
