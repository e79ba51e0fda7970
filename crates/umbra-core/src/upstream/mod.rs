//! Chain node communication with endpoint health tracking and fallback.
//!
//! This module handles communication with a chain's configured RPC endpoints:
//! - HTTP client with concurrency control ([`HttpClient`])
//! - Per-chain health bookkeeping ([`EndpointRegistry`])
//! - Sequential fallback across candidates ([`FallbackExecutor`])
//! - Quorum-of-one racing for steady-state reads ([`QuorumProvider`])
//! - The chain-facing facade tying them together ([`UpstreamManager`])
//!
//! ## Request Flow
//!
//! ```text
//! send_request(chain, req)
//!     │
//!     └─ FallbackExecutor ── preferred endpoint first (EndpointRegistry)
//!           │
//!           ├─ ok        → record_success, return
//!           ├─ caller error (revert, bad params) → returned as JSON-RPC error response
//!           └─ failure   → record_failure, next candidate
//!                            └─ all failed → reset chain, FallbackError::Exhausted
//! ```

pub mod builder;
pub mod endpoint;
pub mod errors;
pub mod fallback;
pub mod http_client;
pub mod manager;
pub mod quorum;
pub mod registry;

pub use builder::{BuilderError, UpstreamManagerBuilder};
pub use endpoint::{EndpointTimeouts, RpcEndpoint, RpcTransport};
pub use errors::{RpcErrorCategory, UpstreamError};
pub use fallback::{Candidate, FallbackError, FallbackExecutor};
pub use http_client::{HttpClient, HttpClientConfig};
pub use manager::{ProbeResult, UpstreamManager};
pub use quorum::QuorumProvider;
pub use registry::{EndpointRegistry, HealthSnapshot, RegistryError};
