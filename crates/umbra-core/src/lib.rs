//! # Umbra Core
//!
//! Network resilience and relay discovery for a private token-swap client.
//!
//! - **[`upstream`]**: endpoint health registry, sequential fallback over a chain's RPC
//!   endpoints, and a quorum-of-one provider that races stalled endpoints.
//! - **[`broadcaster`]**: relay discovery, over HTTP for test chains and over libp2p gossip
//!   for production chains, with single-flight session initialization and TTL-bounded fee
//!   caching.
//! - **[`gas`]**: gas and relay fee estimation built on the two layers above.
//! - **[`runtime`]**: wires everything from an [`AppConfig`](config::AppConfig).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       GasEstimator                       │
//! │        ┌──────────────────┐   ┌────────────────────┐     │
//! │        │  UpstreamManager │   │ BroadcasterService │     │
//! │        └────────┬─────────┘   └─────────┬──────────┘     │
//! │                 │                       │                │
//! │   ┌─────────────▼─────────┐   ┌─────────▼───────────┐    │
//! │   │  FallbackExecutor     │   │ HttpDiscovery (test)│    │
//! │   │  QuorumProvider       │   │ P2pDiscovery (prod) │    │
//! │   │  EndpointRegistry     │   │  └ libp2p gossipsub │    │
//! │   └───────────────────────┘   └─────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod broadcaster;
pub mod config;
pub mod errors;
pub mod gas;
pub mod runtime;
pub mod types;
pub mod upstream;
