//! Caller-facing error classification.
//!
//! Every public error type in this crate exposes a `kind()` that maps onto [`ErrorKind`].
//! Presentation layers render [`ErrorKind::user_message`] instead of inspecting raw
//! transport errors.

use serde::Serialize;

/// Coarse classification of a failure as seen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Every endpoint for the chain failed, or the node returned garbage.
    NetworkUnreachable,
    /// No relay could be found, or relay discovery failed to initialize.
    BroadcasterUnavailable,
    /// Deployment mistake such as a chain with no configured endpoints. Not retried.
    Configuration,
    /// The request itself was rejected (bad params, reverted call).
    InvalidInput,
}

impl ErrorKind {
    /// Short message suitable for direct display.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NetworkUnreachable => "could not reach network",
            Self::BroadcasterUnavailable => "no relay available, try again shortly",
            Self::Configuration => "network is not configured",
            Self::InvalidInput => "request was rejected",
        }
    }

    /// Returns `true` when retrying the same request later can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkUnreachable | Self::BroadcasterUnavailable)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkUnreachable => "network_unreachable",
            Self::BroadcasterUnavailable => "broadcaster_unavailable",
            Self::Configuration => "configuration",
            Self::InvalidInput => "invalid_input",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
