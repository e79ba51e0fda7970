use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

use crate::{
    types::{ChainId, JsonRpcRequest, JsonRpcResponse},
    upstream::{fallback::Candidate, http_client::HttpClient},
};

use super::errors::UpstreamError;

/// Method whose requests get the long submission timeout.
pub const SUBMIT_METHOD: &str = "eth_sendRawTransaction";

/// Per-call timeouts applied by [`RpcEndpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointTimeouts {
    /// Reads and estimations.
    pub query: Duration,
    /// Transaction submission.
    pub submit: Duration,
}

impl Default for EndpointTimeouts {
    fn default() -> Self {
        Self { query: Duration::from_secs(5), submit: Duration::from_secs(120) }
    }
}

impl EndpointTimeouts {
    #[must_use]
    pub fn for_method(&self, method: &str) -> Duration {
        if method == SUBMIT_METHOD {
            self.submit
        } else {
            self.query
        }
    }
}

/// A single JSON-RPC call target.
///
/// Implemented by [`RpcEndpoint`] for real nodes and by in-memory doubles in tests. The
/// quorum provider is written against this trait so it never needs a socket to be tested.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Address used as the endpoint's identity in the health registry.
    fn address(&self) -> &str;

    /// Sends one request. A JSON-RPC error object in the response is returned as
    /// [`UpstreamError::RpcError`].
    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, UpstreamError>;
}

/// One configured node URL of a chain.
pub struct RpcEndpoint {
    chain_id: ChainId,
    url: Arc<str>,
    http_client: Arc<HttpClient>,
    timeouts: EndpointTimeouts,
}

impl std::fmt::Debug for RpcEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcEndpoint")
            .field("chain_id", &self.chain_id)
            .field("url", &self.url)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl RpcEndpoint {
    #[must_use]
    pub fn new(
        chain_id: ChainId,
        url: impl Into<Arc<str>>,
        http_client: Arc<HttpClient>,
        timeouts: EndpointTimeouts,
    ) -> Self {
        Self { chain_id, url: url.into(), http_client, timeouts }
    }

    #[must_use]
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    #[must_use]
    pub fn url(&self) -> &Arc<str> {
        &self.url
    }

    /// Sends a JSON-RPC request to this node.
    ///
    /// Applies the submission timeout to `eth_sendRawTransaction` and the query timeout to
    /// everything else.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::InvalidRequest` if request serialization fails.
    /// Returns `UpstreamError::InvalidResponse` if response parsing fails.
    /// Returns `UpstreamError::RpcError` if the RPC response contains an error.
    /// Transport failures are passed through from [`HttpClient::post_json`].
    pub async fn send_request(
        &self,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, UpstreamError> {
        let timeout = self.timeouts.for_method(&request.method);

        tracing::trace!(
            chain_id = self.chain_id,
            endpoint = %self.url,
            method = %request.method,
            "sending request to endpoint"
        );

        let body = serde_json::to_vec(request).map_err(|e| {
            UpstreamError::InvalidRequest(format!("failed to serialize request: {e}"))
        })?;

        let response_bytes =
            self.http_client.post_json(&self.url, bytes::Bytes::from(body), timeout).await?;

        let json_response: JsonRpcResponse = serde_json::from_slice(&response_bytes)
            .map_err(|e| UpstreamError::InvalidResponse(format!("invalid JSON: {e}")))?;

        if let Some(error) = &json_response.error {
            return Err(UpstreamError::RpcError(error.code, error.message.clone()));
        }

        if json_response.result.is_none() {
            return Err(UpstreamError::InvalidResponse(
                "response has neither result nor error".into(),
            ));
        }

        Ok(json_response)
    }

    /// Fetches the latest block number. Used by probes.
    ///
    /// # Errors
    ///
    /// Same as [`send_request`](Self::send_request), plus `InvalidResponse` when the result
    /// is not a hex quantity.
    pub async fn block_number(&self) -> Result<u64, UpstreamError> {
        let request =
            JsonRpcRequest::new("eth_blockNumber", None, serde_json::Value::Number(1.into()));
        let response = self.send_request(&request).await?;

        response
            .result
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .and_then(|hex| u64::from_str_radix(hex.trim_start_matches("0x"), 16).ok())
            .ok_or_else(|| UpstreamError::InvalidResponse("block number is not a quantity".into()))
    }
}

#[async_trait]
impl RpcTransport for RpcEndpoint {
    fn address(&self) -> &str {
        &self.url
    }

    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, UpstreamError> {
        self.send_request(request).await
    }
}

impl Candidate for Arc<RpcEndpoint> {
    fn address(&self) -> &str {
        &self.url
    }
}
