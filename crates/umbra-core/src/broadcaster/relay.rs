use crate::{
    broadcaster::{
        errors::DiscoveryError,
        fees::{FeeSource, RelayFeesResponse},
    },
    types::ChainId,
    upstream::{HttpClient, UpstreamError},
};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tracing::debug;

pub const FEES_PATH: &str = "/fees";
pub const SUBMIT_PATH: &str = "/submit";
pub const INFO_PATH: &str = "/debug/v1/info";

/// What a reachable relay answered: its HTTP status and JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReply {
    pub status: u16,
    pub body: serde_json::Value,
}

/// Client for a single HTTP relay.
///
/// Used directly by the relay proxy handlers and, through [`FeeSource`], by HTTP-mode
/// discovery.
pub struct RelayClient {
    http_client: Arc<HttpClient>,
    base_url: String,
    fee_timeout: Duration,
    submit_timeout: Duration,
    info_timeout: Duration,
}

impl RelayClient {
    #[must_use]
    pub fn new(http_client: Arc<HttpClient>, base_url: &str, fee_timeout: Duration) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            fee_timeout,
            submit_timeout: Duration::from_secs(120),
            info_timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fetches the relay's fee schedule.
    ///
    /// # Errors
    ///
    /// Transport errors from [`HttpClient`], or `InvalidResponse` if the body is not a fee
    /// schedule.
    pub async fn fees(&self) -> Result<RelayFeesResponse, UpstreamError> {
        let body = self.http_client.get(&self.url(FEES_PATH), self.fee_timeout).await?;
        serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::InvalidResponse(format!("invalid fee schedule: {e}")))
    }

    /// Forwards a submission body verbatim and returns the relay's answer.
    ///
    /// A rejection (4xx or 5xx with a JSON body) is a valid answer and comes back as a
    /// [`RelayReply`] carrying that status.
    ///
    /// # Errors
    ///
    /// Transport errors from [`HttpClient`], or `InvalidResponse` if the relay answers with
    /// something other than JSON.
    pub async fn submit(&self, body: bytes::Bytes) -> Result<RelayReply, UpstreamError> {
        let (status, response) = self
            .http_client
            .post_json_passthrough(&self.url(SUBMIT_PATH), body, self.submit_timeout)
            .await?;
        let body = serde_json::from_slice(&response).map_err(|e| {
            UpstreamError::InvalidResponse(format!("invalid submit response ({status}): {e}"))
        })?;
        if !(200..300).contains(&status) {
            debug!(relay = %self.base_url, status, "relay rejected submission");
        }
        Ok(RelayReply { status, body })
    }

    /// Fetches the relay's diagnostic info (listen addresses and similar).
    ///
    /// # Errors
    ///
    /// Transport errors and non-2xx statuses from [`HttpClient`], or `InvalidResponse` if
    /// the body is not JSON.
    pub async fn info(&self) -> Result<serde_json::Value, UpstreamError> {
        let body = self.http_client.get(&self.url(INFO_PATH), self.info_timeout).await?;
        serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::InvalidResponse(format!("invalid info response: {e}")))
    }
}

#[async_trait]
impl FeeSource for RelayClient {
    async fn fetch_fees(&self, chain: ChainId) -> Result<RelayFeesResponse, DiscoveryError> {
        debug!(chain_id = chain, relay = %self.base_url, "fetching relay fees");
        self.fees().await.map_err(|e| DiscoveryError::FeeFetch(e.to_string()))
    }
}
