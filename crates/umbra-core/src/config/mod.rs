//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `UMBRA_CONFIG` env var
//! 3. **Environment variables**: `UMBRA__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`ServerConfig`]: HTTP server settings (bind address, concurrency)
//! - [`ChainConfig`]: per-chain candidate endpoints and test/production classification
//! - [`BroadcasterConfig`]: relay discovery settings for both discovery modes
//! - [`QuorumConfig`]: quorum provider settings
//! - [`GasConfig`]: relay-adapt contract and overhead used by relayed estimates
//! - [`TimeoutsConfig`]: per-call endpoint timeouts
//! - [`LoggingConfig`]: Log level and format
//!
//! # Validation
//!
//! Configuration is validated at load time by the binaries. Invalid configurations (e.g.,
//! a chain with no endpoints, invalid URLs) return errors rather than failing silently.
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind_port = 3030
//!
//! [[chains]]
//! chain_id = 11155111
//! name = "sepolia"
//! network = "test"
//! rpc_urls = ["https://rpc.sepolia.example", "https://sepolia.backup.example"]
//!
//! [broadcaster]
//! relay_base_url = "http://127.0.0.1:3000"
//! ```

use crate::{
    types::{ChainId, NetworkClass},
    upstream::endpoint::EndpointTimeouts,
};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, time::Duration};

/// HTTP server configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Must be greater than 0. Defaults to `3030`.
    pub bind_port: u16,

    /// Maximum number of concurrent requests the server can handle. Defaults to `100`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Request timeout in seconds. Defaults to `150`, above the submission timeout.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_max_concurrent_requests() -> usize {
    100
}

fn default_request_timeout_seconds() -> u64 {
    150
}

/// One chain and its ordered list of candidate RPC endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Numeric chain id (e.g., `1` for mainnet, `11155111` for Sepolia).
    pub chain_id: ChainId,

    /// Human-readable name used in logs.
    #[serde(default)]
    pub name: String,

    /// Whether this is a test chain (HTTP relay discovery) or a production chain
    /// (peer-to-peer discovery). Defaults to `test`.
    #[serde(default)]
    pub network: NetworkClass,

    /// Candidate endpoints in configuration order. Must not be empty.
    #[serde(default)]
    pub rpc_urls: Vec<String>,
}

/// Relay discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcasterConfig {
    /// Base URL of the HTTP relay used on test chains.
    #[serde(default = "default_relay_base_url")]
    pub relay_base_url: String,

    /// Seconds a fetched fee snapshot stays fresh. Defaults to `60`.
    #[serde(default = "default_fee_ttl_seconds")]
    pub fee_ttl_seconds: u64,

    /// Timeout of one fee fetch. Defaults to `10`.
    #[serde(default = "default_fee_fetch_timeout_seconds")]
    pub fee_fetch_timeout_seconds: u64,

    /// Timeout of peer-to-peer session initialization. Defaults to `60`.
    #[serde(default = "default_discovery_timeout_seconds")]
    pub discovery_timeout_seconds: u64,

    /// Multiaddrs dialed when joining the gossip network.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,

    /// Connected peers required before the gossip session counts as joined.
    #[serde(default = "default_min_peers")]
    pub min_peers: usize,

    /// Chain whose discovery session is started in the background at launch.
    #[serde(default)]
    pub warmup_chain_id: Option<ChainId>,
}

fn default_relay_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_fee_ttl_seconds() -> u64 {
    60
}

fn default_fee_fetch_timeout_seconds() -> u64 {
    10
}

fn default_discovery_timeout_seconds() -> u64 {
    60
}

fn default_min_peers() -> usize {
    1
}

/// Quorum provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuorumConfig {
    /// Number of agreeing responses required. Only `1` is supported.
    #[serde(default = "default_quorum")]
    pub quorum: usize,

    /// Milliseconds an attempt may stay silent before the next candidate is launched.
    #[serde(default = "default_stall_timeout_ms")]
    pub stall_timeout_ms: u64,
}

fn default_quorum() -> usize {
    1
}

fn default_stall_timeout_ms() -> u64 {
    2500
}

/// Settings used by relayed gas estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// Relay-adapt contract the relayed transaction is sent to, when known.
    #[serde(default)]
    pub relay_adapt_address: Option<String>,

    /// Gas added to a direct estimate when the relay-adapt estimate is unavailable.
    #[serde(default = "default_relay_adapt_overhead_gas")]
    pub relay_adapt_overhead_gas: u64,
}

fn default_relay_adapt_overhead_gas() -> u64 {
    150_000
}

/// Endpoint call timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Reads and estimations. Defaults to `5`.
    #[serde(default = "default_query_seconds")]
    pub query_seconds: u64,

    /// Transaction submission. Defaults to `120`.
    #[serde(default = "default_submit_seconds")]
    pub submit_seconds: u64,
}

fn default_query_seconds() -> u64 {
    5
}

fn default_submit_seconds() -> u64 {
    120
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is unset.
    pub level: String,
    /// Output format, `pretty` or `json`.
    pub format: String,
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment (e.g., "development", "production"). Defaults to `"development"`.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Configured chains. Cannot be empty.
    #[serde(default)]
    pub chains: Vec<ChainConfig>,

    #[serde(default)]
    pub broadcaster: BroadcasterConfig,

    #[serde(default)]
    pub quorum: QuorumConfig,

    #[serde(default)]
    pub gas: GasConfig,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: 3030,
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            relay_base_url: default_relay_base_url(),
            fee_ttl_seconds: default_fee_ttl_seconds(),
            fee_fetch_timeout_seconds: default_fee_fetch_timeout_seconds(),
            discovery_timeout_seconds: default_discovery_timeout_seconds(),
            bootstrap_peers: Vec::new(),
            min_peers: default_min_peers(),
            warmup_chain_id: None,
        }
    }
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self { quorum: default_quorum(), stall_timeout_ms: default_stall_timeout_ms() }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            relay_adapt_address: None,
            relay_adapt_overhead_gas: default_relay_adapt_overhead_gas(),
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self { query_seconds: default_query_seconds(), submit_seconds: default_submit_seconds() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            chains: vec![ChainConfig {
                chain_id: 11_155_111,
                name: "sepolia".to_string(),
                network: NetworkClass::Test,
                rpc_urls: vec!["https://ethereum-sepolia-rpc.publicnode.com".to_string()],
            }],
            broadcaster: BroadcasterConfig::default(),
            quorum: QuorumConfig::default(),
            gas: GasConfig::default(),
            timeouts: TimeoutsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Environment variables with the `UMBRA__` prefix can override any configuration value.
    /// Use `__` as a separator for nested fields (e.g., `UMBRA__SERVER__BIND_PORT=8080`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("environment", "development")?
            .set_default("server.bind_address", "127.0.0.1")?
            .set_default("server.bind_port", 3030)?
            .set_default("server.max_concurrent_requests", 100)?
            .set_default("server.request_timeout_seconds", 150)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("UMBRA").prefix_separator("__").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Loads configuration from `config/config.toml` with fallback to defaults.
    ///
    /// The config file path can be overridden using the `UMBRA_CONFIG` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("UMBRA_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
            .parse()
            .map_err(|_| {
                format!(
                    "invalid socket address: {}:{}",
                    self.server.bind_address, self.server.bind_port
                )
            })
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    #[must_use]
    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    #[must_use]
    pub fn endpoint_timeouts(&self) -> EndpointTimeouts {
        EndpointTimeouts {
            query: Duration::from_secs(self.timeouts.query_seconds),
            submit: Duration::from_secs(self.timeouts.submit_seconds),
        }
    }

    #[must_use]
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.quorum.stall_timeout_ms)
    }

    #[must_use]
    pub fn fee_ttl(&self) -> Duration {
        Duration::from_secs(self.broadcaster.fee_ttl_seconds)
    }

    #[must_use]
    pub fn fee_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.broadcaster.fee_fetch_timeout_seconds)
    }

    #[must_use]
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.broadcaster.discovery_timeout_seconds)
    }

    /// Whether any configured chain needs peer-to-peer discovery.
    #[must_use]
    pub fn has_production_chains(&self) -> bool {
        self.chains.iter().any(|c| c.network == NetworkClass::Production)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// Checks include:
    /// - At least one chain is configured, and every chain has at least one endpoint
    /// - Chain ids are unique
    /// - All URLs are properly formatted
    /// - All timeouts and TTLs are greater than zero
    /// - Quorum is `1`
    /// - Logging format is either `"json"` or `"pretty"`
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.chains.is_empty() {
            return Err("no chains configured".to_string());
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.chain_id) {
                return Err(format!("duplicate chain id {}", chain.chain_id));
            }
            if chain.rpc_urls.is_empty() {
                return Err(format!("no rpc urls configured for chain {}", chain.chain_id));
            }
            for rpc_url in &chain.rpc_urls {
                validate_http_url(rpc_url)
                    .map_err(|e| format!("invalid rpc url for chain {}: {e}", chain.chain_id))?;
            }
        }

        validate_http_url(&self.broadcaster.relay_base_url)
            .map_err(|e| format!("invalid relay base url: {e}"))?;

        if let Some(warmup) = self.broadcaster.warmup_chain_id {
            if self.chain(warmup).is_none() {
                return Err(format!("warmup chain {warmup} is not configured"));
            }
        }

        for peer in &self.broadcaster.bootstrap_peers {
            peer.parse::<libp2p::Multiaddr>()
                .map_err(|e| format!("invalid bootstrap peer {peer}: {e}"))?;
        }

        if self.broadcaster.fee_ttl_seconds == 0 {
            return Err("fee TTL must be greater than 0".to_string());
        }

        if self.broadcaster.fee_fetch_timeout_seconds == 0 ||
            self.broadcaster.discovery_timeout_seconds == 0
        {
            return Err("broadcaster timeouts must be greater than 0".to_string());
        }

        if self.timeouts.query_seconds == 0 || self.timeouts.submit_seconds == 0 {
            return Err("endpoint timeouts must be greater than 0".to_string());
        }

        if self.quorum.quorum != 1 {
            return Err(format!(
                "quorum of {} is not supported, only a quorum of 1",
                self.quorum.quorum
            ));
        }

        if self.quorum.stall_timeout_ms == 0 {
            return Err("stall timeout must be greater than 0".to_string());
        }

        if self.server.max_concurrent_requests == 0 {
            return Err("max concurrent requests must be greater than 0".to_string());
        }

        if self.server.bind_port == 0 {
            return Err("bind port must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}

fn validate_http_url(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("{raw}: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("{raw}: unsupported scheme {other}")),
    }
}
