use crate::{errors::ErrorKind, types::ChainId};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while establishing or querying relay discovery.
///
/// `Clone` so a single in-flight initialization can hand the same outcome to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DiscoveryError {
    /// Fetching the relay fee schedule failed
    #[error("fee fetch failed: {0}")]
    FeeFetch(String),

    /// An operation did not finish within its bound
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: &'static str, after: Duration },

    /// Joining the gossip network failed
    #[error("gossip join failed: {0}")]
    Join(String),

    /// The chain is not configured for discovery
    #[error("chain {0} is not configured for relay discovery")]
    UnknownChain(ChainId),

    /// Peer-to-peer discovery is not available in this deployment
    #[error("peer-to-peer discovery is not enabled")]
    P2pDisabled,

    /// The discovery session was shut down
    #[error("discovery session shut down")]
    Shutdown,
}

impl DiscoveryError {
    /// Caller-facing classification. Discovery problems are always recoverable by retrying,
    /// except a chain that was never configured.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownChain(_) | Self::P2pDisabled => ErrorKind::Configuration,
            _ => ErrorKind::BroadcasterUnavailable,
        }
    }
}

/// Lifecycle of a discovery session.
///
/// ```text
/// Uninitialized --start--> Initializing --ok--> Ready
///                          Initializing --err--> Failed --start--> Initializing
/// Ready --start(other chain)--> Initializing
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl SessionState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
