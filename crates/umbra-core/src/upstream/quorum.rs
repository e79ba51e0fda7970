//! Quorum-of-one racing over a chain's endpoints.
//!
//! Candidates are launched one at a time in registry-preferred order. The next candidate is
//! launched as soon as the previous one fails, or when it has been silent for longer than the
//! stall timeout. Earlier attempts stay alive after a stall launch, so a slow node that
//! eventually answers can still win. The first successful response is returned and every
//! attempt still in flight is dropped.

use crate::{
    errors::ErrorKind,
    types::{ChainId, JsonRpcRequest, JsonRpcResponse},
    upstream::{endpoint::RpcTransport, errors::UpstreamError, registry::EndpointRegistry},
};
use futures_util::{stream::FuturesUnordered, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default delay before a silent attempt is joined by the next candidate.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_millis(2500);

/// Races a chain's endpoints and accepts the first success.
pub struct QuorumProvider {
    chain: ChainId,
    candidates: Vec<Arc<dyn RpcTransport>>,
    registry: Arc<EndpointRegistry>,
    stall_timeout: Duration,
}

impl QuorumProvider {
    #[must_use]
    pub fn new(
        chain: ChainId,
        candidates: Vec<Arc<dyn RpcTransport>>,
        registry: Arc<EndpointRegistry>,
        stall_timeout: Duration,
    ) -> Self {
        Self { chain, candidates, registry, stall_timeout }
    }

    #[must_use]
    pub fn chain(&self) -> ChainId {
        self.chain
    }

    #[must_use]
    pub fn stall_timeout(&self) -> Duration {
        self.stall_timeout
    }

    fn launch_order(&self) -> Vec<Arc<dyn RpcTransport>> {
        let addresses: Vec<&str> = self.candidates.iter().map(|c| c.address()).collect();
        let start = self.registry.preferred_index(self.chain, &addresses).unwrap_or(0);

        self.candidates[start..].iter().chain(&self.candidates[..start]).cloned().collect()
    }

    /// Sends `request`, racing candidates as described in the module docs.
    ///
    /// # Errors
    ///
    /// - A caller-side [`UpstreamError::RpcError`] (reverted call, bad params) is returned as
    ///   soon as any node answers with it. The node is not penalized.
    /// - [`UpstreamError::NoHealthyUpstreams`] if there are no candidates or every candidate
    ///   failed.
    pub async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, UpstreamError> {
        let mut queue = self.launch_order().into_iter();
        let mut in_flight = FuturesUnordered::new();

        let launch = |transport: Arc<dyn RpcTransport>| {
            let request = request.clone();
            async move {
                let result = transport.send(&request).await;
                (transport, result)
            }
        };

        let Some(first) = queue.next() else {
            return Err(UpstreamError::NoHealthyUpstreams);
        };
        in_flight.push(launch(first));
        let mut stall_deadline = Instant::now() + self.stall_timeout;

        loop {
            let has_queued = queue.len() > 0;

            tokio::select! {
                biased;

                Some((transport, result)) = in_flight.next() => match result {
                    Ok(response) => {
                        debug!(
                            chain_id = self.chain,
                            endpoint = %transport.address(),
                            "quorum attempt succeeded"
                        );
                        self.registry.record_success(self.chain, transport.address());
                        return Ok(response);
                    }
                    Err(e) if e.kind() == ErrorKind::InvalidInput => {
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(
                            chain_id = self.chain,
                            endpoint = %transport.address(),
                            error = %e,
                            "quorum attempt failed"
                        );
                        if e.marks_endpoint_failed() {
                            self.registry.record_failure(self.chain, transport.address());
                        }
                        if let Some(next) = queue.next() {
                            in_flight.push(launch(next));
                            stall_deadline = Instant::now() + self.stall_timeout;
                        }
                    }
                },

                () = tokio::time::sleep_until(stall_deadline), if has_queued => {
                    if let Some(next) = queue.next() {
                        debug!(
                            chain_id = self.chain,
                            endpoint = %next.address(),
                            stall_ms = self.stall_timeout.as_millis(),
                            "attempt stalled, launching next candidate"
                        );
                        in_flight.push(launch(next));
                        stall_deadline = Instant::now() + self.stall_timeout;
                    }
                }

                else => break,
            }
        }

        warn!(
            chain_id = self.chain,
            candidates = self.candidates.len(),
            "all quorum attempts failed"
        );
        Err(UpstreamError::NoHealthyUpstreams)
    }
}
