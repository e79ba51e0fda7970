use crate::errors::ErrorKind;
use thiserror::Error;

/// Who is to blame for a JSON-RPC error object returned by a node.
///
/// Caller errors end a request in both the fallback executor and the quorum provider.
/// The quorum provider also reads it to skip marking rate-limited endpoints failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorCategory {
    /// Malformed request, unknown method or bad params.
    ClientError,
    /// The node itself is broken or overloaded.
    ProviderError,
    /// `-32005`, limit exceeded.
    RateLimit,
    /// The node could not parse what it was sent, or sent back garbage.
    ParseError,
    /// The call executed and reverted (out of gas, insufficient funds, bad nonce and similar).
    ExecutionError,
}

/// Message fragments that mark a `-32000..=-32099` server error as an execution failure.
const EXECUTION_MARKERS: [&str; 5] =
    ["revert", "out of gas", "insufficient funds", "nonce too low", "gas too low"];

impl RpcErrorCategory {
    /// Classifies a JSON-RPC error by code, looking at the message only for the
    /// implementation-defined `-32000..=-32099` range.
    ///
    /// Code `3` is geth's "execution reverted with data".
    #[must_use]
    pub fn classify(code: i32, message: &str) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32602..=-32600 => Self::ClientError,
            -32005 => Self::RateLimit,
            3 => Self::ExecutionError,
            -32099..=-32000 => {
                let message = message.to_lowercase();
                if EXECUTION_MARKERS.iter().any(|marker| message.contains(marker)) {
                    Self::ExecutionError
                } else {
                    Self::ProviderError
                }
            }
            _ => Self::ProviderError,
        }
    }

    /// `true` when the endpoint should be recorded as failed.
    #[must_use]
    pub fn marks_endpoint_failed(&self) -> bool {
        matches!(self, Self::ProviderError | Self::ParseError)
    }

    /// `true` if the node answered and the error belongs to the caller's request.
    ///
    /// Such responses are complete round trips and are handed back to the caller as-is
    /// instead of being retried on another endpoint.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::ClientError | Self::ExecutionError)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientError => "client_error",
            Self::ProviderError => "provider_error",
            Self::RateLimit => "rate_limit",
            Self::ParseError => "parse_error",
            Self::ExecutionError => "execution_error",
        }
    }
}

/// Failure talking to one RPC endpoint or to the relay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UpstreamError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-2xx status with the (truncated) body.
    #[error("http status {0}: {1}")]
    HttpError(u16, String),

    /// JSON-RPC error object: code and message.
    #[error("rpc error {0}: {1}")]
    RpcError(i32, String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Every candidate raced by the quorum provider failed.
    #[error("no endpoint answered")]
    NoHealthyUpstreams,

    /// The request could not be serialized.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The shared HTTP client's permit pool is closed.
    #[error("concurrency limit reached: {0}")]
    ConcurrencyLimit(String),
}

impl UpstreamError {
    /// Category of a JSON-RPC error; `None` for transport failures.
    #[must_use]
    pub fn rpc_category(&self) -> Option<RpcErrorCategory> {
        match self {
            Self::RpcError(code, message) => Some(RpcErrorCategory::classify(*code, message)),
            _ => None,
        }
    }

    /// `true` when the endpoint that produced this error should be recorded as failed.
    ///
    /// Transport failures, unreadable answers and 5xx statuses count against the endpoint.
    /// Rate limits, 4xx statuses and anything the caller caused do not.
    #[must_use]
    pub fn marks_endpoint_failed(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionFailed(_) | Self::InvalidResponse(_) => true,
            Self::HttpError(status, _) => (500..=599).contains(status),
            Self::RpcError(..) => self.rpc_category().is_some_and(|c| c.marks_endpoint_failed()),
            _ => false,
        }
    }

    /// `true` for JSON-RPC errors that reject the caller's request itself.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        self.rpc_category().is_some_and(|c| c.is_caller_error())
    }

    /// Caller-facing classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidInput,
            Self::RpcError(..) if self.is_caller_error() => ErrorKind::InvalidInput,
            _ => ErrorKind::NetworkUnreachable,
        }
    }
}
