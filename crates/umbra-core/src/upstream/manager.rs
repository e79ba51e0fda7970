use super::{
    endpoint::{RpcEndpoint, RpcTransport},
    errors::UpstreamError,
    fallback::{FallbackError, FallbackExecutor},
    http_client::HttpClient,
    quorum::QuorumProvider,
    registry::{EndpointRegistry, RegistryError},
};
use crate::types::{ChainId, JsonRpcRequest, JsonRpcResponse, NetworkClass};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::info;

/// Endpoints and classification of one chain.
pub(super) struct ChainUpstreams {
    pub(super) name: String,
    pub(super) network: NetworkClass,
    pub(super) endpoints: Vec<Arc<RpcEndpoint>>,
}

/// Outcome of probing one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub url: String,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Chain-facing facade over every configured endpoint.
///
/// `UpstreamManager` owns one endpoint list per chain, the shared [`EndpointRegistry`] and the
/// [`FallbackExecutor`]. Requests go through sequential fallback, starting at the chain's
/// preferred endpoint. Thread-safe and designed for concurrent access.
///
/// Use [`UpstreamManagerBuilder`](super::UpstreamManagerBuilder) to construct one.
pub struct UpstreamManager {
    chains: HashMap<ChainId, ChainUpstreams>,
    registry: Arc<EndpointRegistry>,
    executor: FallbackExecutor,
    http_client: Arc<HttpClient>,
    stall_timeout: Duration,
}

impl UpstreamManager {
    pub(super) fn new(
        chains: HashMap<ChainId, ChainUpstreams>,
        registry: Arc<EndpointRegistry>,
        executor: FallbackExecutor,
        http_client: Arc<HttpClient>,
        stall_timeout: Duration,
    ) -> Self {
        for (chain_id, chain) in &chains {
            info!(
                chain_id = chain_id,
                name = %chain.name,
                network = %chain.network,
                endpoints = chain.endpoints.len(),
                "chain configured"
            );
        }
        Self { chains, registry, executor, http_client, stall_timeout }
    }

    /// Sends a JSON-RPC request to `chain` through sequential fallback.
    ///
    /// A caller-side JSON-RPC error (reverted call, invalid params) is a valid answer from
    /// the node: it is returned as an `Ok` response carrying the error object and does not
    /// mark the endpoint failed. Any other failure moves on to the next endpoint.
    ///
    /// # Errors
    ///
    /// - [`FallbackError::NoCandidates`] if the chain has no configured endpoints
    /// - [`FallbackError::Exhausted`] if every endpoint failed
    pub async fn send_request(
        &self,
        chain: ChainId,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, FallbackError<UpstreamError>> {
        let endpoints = self.endpoints(chain);

        self.executor
            .run_with_fallback(chain, endpoints, |endpoint: Arc<RpcEndpoint>| async move {
                match endpoint.send_request(request).await {
                    Err(e) if e.is_caller_error() => Ok(into_error_response(e, request)),
                    other => other,
                }
            })
            .await
    }

    /// Builds a quorum provider over `chain`'s endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoCandidates`] if the chain has no configured endpoints.
    pub fn quorum_provider(&self, chain: ChainId) -> Result<QuorumProvider, RegistryError> {
        let endpoints = self.endpoints(chain);
        if endpoints.is_empty() {
            return Err(RegistryError::NoCandidates(chain));
        }

        let transports = endpoints
            .iter()
            .map(|endpoint| Arc::clone(endpoint) as Arc<dyn RpcTransport>)
            .collect();

        Ok(QuorumProvider::new(chain, transports, Arc::clone(&self.registry), self.stall_timeout))
    }

    /// Pings every endpoint of `chain` with `eth_blockNumber` concurrently and records each
    /// outcome in the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoCandidates`] if the chain has no configured endpoints.
    pub async fn probe(&self, chain: ChainId) -> Result<Vec<ProbeResult>, RegistryError> {
        let endpoints = self.endpoints(chain);
        if endpoints.is_empty() {
            return Err(RegistryError::NoCandidates(chain));
        }

        let probes = endpoints.iter().map(|endpoint| async move {
            let start = std::time::Instant::now();
            let outcome = endpoint.block_number().await;
            let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            (endpoint, outcome, latency_ms)
        });

        let results = futures::future::join_all(probes).await;

        Ok(results
            .into_iter()
            .map(|(endpoint, outcome, latency_ms)| match outcome {
                Ok(block_number) => {
                    self.registry.record_success(chain, endpoint.url());
                    ProbeResult {
                        url: endpoint.url().to_string(),
                        latency_ms,
                        block_number: Some(block_number),
                        error: None,
                    }
                }
                Err(e) => {
                    self.registry.record_failure(chain, endpoint.url());
                    ProbeResult {
                        url: endpoint.url().to_string(),
                        latency_ms,
                        block_number: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect())
    }

    /// Endpoints of `chain` in configuration order. Empty for unknown chains.
    #[must_use]
    pub fn endpoints(&self, chain: ChainId) -> &[Arc<RpcEndpoint>] {
        self.chains.get(&chain).map_or(&[], |c| c.endpoints.as_slice())
    }

    #[must_use]
    pub fn network_class(&self, chain: ChainId) -> Option<NetworkClass> {
        self.chains.get(&chain).map(|c| c.network)
    }

    #[must_use]
    pub fn chain_name(&self, chain: ChainId) -> Option<&str> {
        self.chains.get(&chain).map(|c| c.name.as_str())
    }

    /// Chains with at least one endpoint, sorted ascending.
    #[must_use]
    pub fn chains(&self) -> Vec<ChainId> {
        self.registry.chains()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn http_client(&self) -> &Arc<HttpClient> {
        &self.http_client
    }
}

fn into_error_response(error: UpstreamError, request: &JsonRpcRequest) -> JsonRpcResponse {
    let id = Arc::clone(&request.id);
    match error {
        UpstreamError::RpcError(code, message) => JsonRpcResponse::error(code, message, id),
        other => JsonRpcResponse::error(-32603, other.to_string(), id),
    }
}
