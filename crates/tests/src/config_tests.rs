//! Layered configuration loading: file, defaults and `UMBRA__` environment overrides.
//!
//! These tests mutate process environment variables and run serially.

use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;
use umbra_core::{config::AppConfig, types::NetworkClass};

const CONFIG: &str = r#"
[[chains]]
chain_id = 11155111
name = "sepolia"
network = "test"
rpc_urls = ["https://rpc.sepolia.example", "https://sepolia.backup.example"]

[[chains]]
chain_id = 1
name = "ethereum"
network = "production"
rpc_urls = ["https://eth.example"]

[broadcaster]
relay_base_url = "http://127.0.0.1:3000"
bootstrap_peers = ["/ip4/127.0.0.1/tcp/9000"]
"#;

/// Writes `contents` to `config.toml` inside a fresh directory removed on drop.
fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
#[serial]
fn test_file_is_layered_over_defaults() {
    let (_dir, path) = write_config(CONFIG);

    let config = AppConfig::from_file(&path).unwrap();

    assert_eq!(config.environment, "development");
    assert_eq!(config.server.bind_port, 3030);
    assert_eq!(config.chains.len(), 2);
    assert_eq!(config.chains[1].network, NetworkClass::Production);
    assert_eq!(config.broadcaster.fee_ttl_seconds, 60);
    assert_eq!(config.quorum.quorum, 1);
    assert!(config.has_production_chains());
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let (_dir, path) = write_config(CONFIG);
    std::env::set_var("UMBRA__SERVER__BIND_PORT", "8088");
    std::env::set_var("UMBRA__BROADCASTER__FEE_TTL_SECONDS", "15");

    let config = AppConfig::from_file(&path);

    std::env::remove_var("UMBRA__SERVER__BIND_PORT");
    std::env::remove_var("UMBRA__BROADCASTER__FEE_TTL_SECONDS");

    let config = config.unwrap();
    assert_eq!(config.server.bind_port, 8088);
    assert_eq!(config.fee_ttl().as_secs(), 15);
    assert_eq!(config.chains.len(), 2);
}

#[test]
#[serial]
fn test_config_path_from_environment() {
    let (_dir, path) = write_config(CONFIG);
    std::env::set_var("UMBRA_CONFIG", &path);

    let config = AppConfig::load();

    std::env::remove_var("UMBRA_CONFIG");

    assert_eq!(config.unwrap().chains[0].name, "sepolia");
}

#[test]
#[serial]
fn test_missing_file_yields_no_chains() {
    let config = AppConfig::from_file("does/not/exist.toml").unwrap();

    assert!(config.chains.is_empty());
    assert_eq!(config.validate().unwrap_err(), "no chains configured");
}

#[test]
#[serial]
fn test_invalid_bootstrap_peer_is_rejected() {
    let broken = CONFIG.replace("/ip4/127.0.0.1/tcp/9000", "not-a-multiaddr");
    let (_dir, path) = write_config(&broken);

    let config = AppConfig::from_file(&path).unwrap();

    assert!(config.validate().unwrap_err().contains("invalid bootstrap peer"));
}
