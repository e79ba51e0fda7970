//! Integration tests for umbra.
//!
//! Every test runs against in-process mockito servers standing in for RPC nodes and relays,
//! so no external network is needed:
//!
//! - `fallback_tests`: sequential fallback and endpoint health across real HTTP endpoints
//! - `quorum_tests`: quorum-of-one racing over real HTTP endpoints
//! - `http_discovery_tests`: fee snapshot caching, single-flight refresh and failure recovery
//! - `gas_tests`: relayed gas estimation through the assembled runtime
//! - `relay_proxy_tests`: the server's relay pass-through and health routes
//! - `runtime_tests`: runtime builder validation and shutdown
//! - `config_tests`: layered configuration loading and environment overrides
//! - `mock_infrastructure`: reusable RPC node and relay mocks
//!
//! ```bash
//! cargo test --package tests
//! ```

#[cfg(test)]
mod fallback_tests;


#[cfg(test)]
mod http_discovery_tests;

#[cfg(test)]
mod gas_tests;

#[cfg(test)]
mod relay_proxy_tests;

#[cfg(test)]
mod runtime_tests;

#[cfg(test)]
mod config_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
