//! Core type definitions shared across the registry, executors and discovery service.
//!
//! # Type Categories
//!
//! ## JSON-RPC Protocol Types
//! - [`JsonRpcRequest`], [`JsonRpcResponse`], [`JsonRpcError`]: Protocol conformance
//!
//! ## Chain Types
//! - [`ChainId`], [`NetworkClass`]: Logical network identity and its deployment class
//!
//! ## Relay Types
//! - [`TokenAddress`]: Canonical lower-case ERC-20 address
//! - [`BroadcasterSelection`]: Value handed back to callers by discovery queries
//!
//! Fee quantities are carried as [`U256`] because relay fee schedules are scaled by 10^18
//! and overflow 64-bit integers.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, sync::Arc};

/// Logical network identifier (EIP-155 chain id).
pub type ChainId = u64;

/// JSON-RPC protocol version constant to avoid repeated allocations.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for JSON-RPC version - zero allocation for static usage.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// Static deployment classification of a chain.
///
/// Test chains discover broadcasters through a fixed HTTP relay, production chains
/// through the gossip network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkClass {
    #[default]
    Test,
    Production,
}

impl NetworkClass {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for NetworkClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON-RPC 2.0 request structure.
///
/// - `jsonrpc`: Uses `Cow<'static, str>` to avoid allocation when constructing with the static
///   version string "2.0".
/// - `id`: Uses `Arc<serde_json::Value>` so the id can be echoed into error responses without a
///   deep copy.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use umbra_core::types::JsonRpcRequest;
///
/// let request = JsonRpcRequest::new("eth_blockNumber", None, json!(1));
///
/// assert_eq!(request.method, "eth_blockNumber");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    pub id: Arc<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
///
/// A response contains either a `result` (success) or an `error` (failure), but never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Arc<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with zero allocation for the version string.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        id: serde_json::Value,
    ) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, method: method.into(), params, id: Arc::new(id) }
    }
}

impl JsonRpcResponse {
    /// Creates a successful JSON-RPC response.
    #[must_use]
    pub fn success(result: serde_json::Value, id: Arc<serde_json::Value>) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, result: Some(result), error: None, id }
    }

    /// Creates an error JSON-RPC response.
    #[must_use]
    pub fn error(code: i32, message: String, id: Arc<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION_COW,
            result: None,
            error: Some(JsonRpcError { code, message, data: None }),
            id,
        }
    }
}

/// JSON-RPC 2.0 error object.
///
/// Standard error codes follow the JSON-RPC 2.0 convention:
///
/// - `-32700`: Parse error (invalid JSON)
/// - `-32600`: Invalid request (malformed JSON-RPC)
/// - `-32601`: Method not found
/// - `-32602`: Invalid params
/// - `-32603`: Internal error
/// - `-32000` to `-32099`: Server-defined errors (implementation-specific)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Error type for address and quantity parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("missing 0x prefix")]
    MissingPrefix,
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
}

/// ERC-20 token address. Displays in canonical form (`0x` + 40 lower-case hex digits).
///
/// Relay fee schedules are keyed by lower-cased addresses, so every lookup goes through
/// this type to make matching case-insensitive.
///
/// # Example
/// ```
/// use umbra_core::types::TokenAddress;
///
/// let token: TokenAddress = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".parse().unwrap();
/// assert_eq!(token.to_string(), "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenAddress(Address);

impl TokenAddress {
    #[must_use]
    pub fn address(&self) -> Address {
        self.0
    }
}

impl From<Address> for TokenAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl TryFrom<&str> for TokenAddress {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if !trimmed.starts_with("0x") {
            return Err(ParseError::MissingPrefix);
        }
        // checksum is not enforced: fee schedules key tokens in lower case
        trimmed
            .parse::<Address>()
            .map(Self)
            .map_err(|e| ParseError::InvalidAddress(format!("{value}: {e}")))
    }
}

impl TryFrom<String> for TokenAddress {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<TokenAddress> for String {
    fn from(address: TokenAddress) -> Self {
        address.to_string()
    }
}

impl std::str::FromStr for TokenAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl std::fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Parses a JSON-RPC or relay quantity, accepting `0x`-prefixed hex or plain decimal.
///
/// # Errors
///
/// Returns [`ParseError::InvalidQuantity`] if the string is empty or not a valid number.
pub fn parse_quantity(value: &str) -> Result<U256, ParseError> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some("") => return Err(ParseError::InvalidQuantity(value.to_string())),
        Some(hex_digits) => U256::from_str_radix(hex_digits, 16),
        None if trimmed.is_empty() => return Err(ParseError::InvalidQuantity(value.to_string())),
        None => U256::from_str_radix(trimmed, 10),
    };
    parsed.map_err(|e| ParseError::InvalidQuantity(format!("{value}: {e}")))
}

/// Result of a broadcaster discovery query.
///
/// Immutable value returned to callers; the discovery service never hands out references
/// into its own cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcasterSelection {
    /// Shielded receiving address of the relay.
    pub relay_address: String,
    /// Token the relay accepts as fee payment.
    pub token: TokenAddress,
    /// Token units charged per unit of gas, scaled by 10^18.
    pub fee_per_unit_gas: U256,
    /// Opaque fee-schedule identifier that must accompany a submission.
    #[serde(rename = "feesID")]
    pub fees_id: String,
}
