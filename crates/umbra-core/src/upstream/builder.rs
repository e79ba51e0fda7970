//! Builder for constructing an `UpstreamManager` from configured chains.

use super::{
    endpoint::{EndpointTimeouts, RpcEndpoint},
    fallback::FallbackExecutor,
    http_client::{HttpClient, HttpClientConfig},
    manager::{ChainUpstreams, UpstreamManager},
    quorum::DEFAULT_STALL_TIMEOUT,
    registry::EndpointRegistry,
};
use crate::{
    config::{AppConfig, ChainConfig},
    types::ChainId,
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use thiserror::Error;

/// Errors that can occur during upstream manager construction.
#[derive(Debug, Error)]
pub enum BuilderError {
    /// HTTP client initialization failed
    #[error("failed to initialize HTTP client: {0}")]
    HttpClientInit(String),

    /// The same chain id was added twice
    #[error("chain {0} configured more than once")]
    DuplicateChain(ChainId),
}

/// Builder for constructing an [`UpstreamManager`].
///
/// # Examples
///
/// ```no_run
/// # use umbra_core::{config::AppConfig, upstream::UpstreamManagerBuilder};
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::load()?;
///
/// let manager = UpstreamManagerBuilder::from_config(&config)
///     .concurrency_limit(200)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct UpstreamManagerBuilder {
    chains: Vec<ChainConfig>,
    concurrency_limit: usize,
    http_client: Option<Arc<HttpClient>>,
    timeouts: EndpointTimeouts,
    stall_timeout: Duration,
}

impl UpstreamManagerBuilder {
    /// Creates a builder with no chains and default timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chains: Vec::new(),
            concurrency_limit: HttpClientConfig::default().concurrent_limit,
            http_client: None,
            timeouts: EndpointTimeouts::default(),
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }

    /// Creates a builder carrying the chains, timeouts and stall timeout of `config`.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            chains: config.chains.clone(),
            timeouts: config.endpoint_timeouts(),
            stall_timeout: config.stall_timeout(),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn chain(mut self, chain: ChainConfig) -> Self {
        self.chains.push(chain);
        self
    }

    /// Sets HTTP client concurrency limit (default: 1000).
    #[must_use]
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Shares an existing HTTP client instead of creating one.
    #[must_use]
    pub fn http_client(mut self, client: Arc<HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    #[must_use]
    pub fn timeouts(mut self, timeouts: EndpointTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn stall_timeout(mut self, stall_timeout: Duration) -> Self {
        self.stall_timeout = stall_timeout;
        self
    }

    /// Builds the manager.
    ///
    /// Chains without endpoints are accepted; requests for them fail with a configuration
    /// error at call time.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::HttpClientInit`] if the HTTP client cannot be created, and
    /// [`BuilderError::DuplicateChain`] if a chain id appears twice.
    pub fn build(self) -> Result<UpstreamManager, BuilderError> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => Arc::new(
                HttpClient::with_concurrency_limit(self.concurrency_limit)
                    .map_err(|e| BuilderError::HttpClientInit(e.to_string()))?,
            ),
        };

        let mut candidates = HashMap::with_capacity(self.chains.len());
        let mut chains = HashMap::with_capacity(self.chains.len());

        for chain in self.chains {
            if chains.contains_key(&chain.chain_id) {
                return Err(BuilderError::DuplicateChain(chain.chain_id));
            }

            let endpoints = chain
                .rpc_urls
                .iter()
                .map(|url| {
                    Arc::new(RpcEndpoint::new(
                        chain.chain_id,
                        url.as_str(),
                        Arc::clone(&http_client),
                        self.timeouts,
                    ))
                })
                .collect();

            candidates.insert(chain.chain_id, chain.rpc_urls.clone());
            chains.insert(
                chain.chain_id,
                ChainUpstreams { name: chain.name, network: chain.network, endpoints },
            );
        }

        let registry = Arc::new(EndpointRegistry::new(candidates));
        let executor = FallbackExecutor::new(Arc::clone(&registry));

        Ok(UpstreamManager::new(chains, registry, executor, http_client, self.stall_timeout))
    }
}

impl Default for UpstreamManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
