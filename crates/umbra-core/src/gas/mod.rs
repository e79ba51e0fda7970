//! Gas and relay fee estimation.
//!
//! Consumes the upstream fallback path for node queries and broadcaster discovery for the
//! relay's fee rate.

pub mod estimator;

pub use estimator::GasEstimator;

use crate::{
    broadcaster::DiscoveryError,
    errors::ErrorKind,
    types::{BroadcasterSelection, ChainId, TokenAddress},
    upstream::{FallbackError, UpstreamError},
};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Call object passed to `eth_estimateGas`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Whether a gas figure came from the node or from the component heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GasEstimateKind {
    /// Returned by `eth_estimateGas` for the exact transaction.
    Exact,
    /// Direct estimate plus a fixed relay-adapt overhead. Not a verified bound: the real
    /// cost may be higher.
    LowerBound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    pub gas_limit: u64,
    pub kind: GasEstimateKind,
}

/// Gas and relay fee for a transaction submitted through a broadcaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayedGasEstimate {
    pub broadcaster: BroadcasterSelection,
    pub gas: GasEstimate,
    pub gas_price: U256,
    /// Fee owed to the relay, in token units.
    pub broadcaster_fee: U256,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GasError {
    #[error(transparent)]
    Network(#[from] FallbackError<UpstreamError>),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("no broadcaster accepts {token} on chain {chain}")]
    NoBroadcaster { chain: ChainId, token: TokenAddress },

    /// The node answered with a JSON-RPC error, typically a revert.
    #[error("estimate rejected ({code}): {message}")]
    Rejected { code: i32, message: String },

    #[error("invalid node response: {0}")]
    InvalidResponse(String),

    #[error("fee computation overflowed")]
    Overflow,
}

impl GasError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(e) => e.kind(),
            Self::Discovery(e) => e.kind(),
            Self::NoBroadcaster { .. } => ErrorKind::BroadcasterUnavailable,
            Self::Rejected { .. } | Self::Overflow => ErrorKind::InvalidInput,
            Self::InvalidResponse(_) => ErrorKind::NetworkUnreachable,
        }
    }
}
