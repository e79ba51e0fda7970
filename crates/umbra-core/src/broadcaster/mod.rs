//! Relay ("broadcaster") discovery.
//!
//! Test chains use [`HttpDiscovery`] against a single configured relay. Production chains use
//! [`P2pDiscovery`] over libp2p gossip. [`BroadcasterService`] routes each chain to its mode.

pub mod errors;
pub mod fees;
pub mod gossip;
pub mod http;
pub mod p2p;
pub mod relay;
pub mod singleflight;

pub use errors::{DiscoveryError, SessionState};
pub use fees::{FeeEntry, FeeSnapshot, FeeSource, RelayFeeEntry, RelayFeesResponse};
pub use gossip::{GossipConfig, Libp2pGossipClient};
pub use http::HttpDiscovery;
pub use p2p::{GossipClient, P2pDiscovery};
pub use relay::{RelayClient, RelayReply};

use crate::{
    config::AppConfig,
    types::{BroadcasterSelection, ChainId, NetworkClass, TokenAddress},
    upstream::HttpClient,
};
use serde::Serialize;
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::info;

/// Discovery transport used for a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    Http,
    PeerToPeer,
}

impl From<NetworkClass> for DiscoveryMode {
    fn from(class: NetworkClass) -> Self {
        match class {
            NetworkClass::Test => Self::Http,
            NetworkClass::Production => Self::PeerToPeer,
        }
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::PeerToPeer => "p2p",
        })
    }
}

pub struct BroadcasterService {
    classes: HashMap<ChainId, NetworkClass>,
    relay: Arc<RelayClient>,
    http: HttpDiscovery,
    p2p: Option<P2pDiscovery>,
}

impl BroadcasterService {
    #[must_use]
    pub fn new(
        classes: HashMap<ChainId, NetworkClass>,
        relay: Arc<RelayClient>,
        http: HttpDiscovery,
        p2p: Option<P2pDiscovery>,
    ) -> Self {
        Self { classes, relay, http, p2p }
    }

    /// Wires discovery from configuration. The gossip client is only spawned when a
    /// production chain is configured, which requires a running tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscoveryError`] if the gossip client cannot be built.
    pub fn from_config(
        config: &AppConfig,
        http_client: Arc<HttpClient>,
    ) -> Result<Self, DiscoveryError> {
        let classes = config.chains.iter().map(|c| (c.chain_id, c.network)).collect();

        let relay = Arc::new(RelayClient::new(
            http_client,
            &config.broadcaster.relay_base_url,
            config.fee_fetch_timeout(),
        ));
        let http = HttpDiscovery::new(
            Arc::clone(&relay) as Arc<dyn FeeSource>,
            config.fee_ttl(),
            config.fee_fetch_timeout(),
        );

        let p2p = if config.has_production_chains() {
            let gossip = GossipConfig::from_config(&config.broadcaster)?;
            let client = Libp2pGossipClient::spawn(gossip)?;
            Some(P2pDiscovery::new(Arc::new(client), config.discovery_timeout()))
        } else {
            None
        };

        info!(
            relay = %relay.base_url(),
            p2p = p2p.is_some(),
            "broadcaster discovery configured"
        );
        Ok(Self::new(classes, relay, http, p2p))
    }

    /// # Errors
    ///
    /// Returns [`DiscoveryError::UnknownChain`] for an unconfigured chain.
    pub fn mode(&self, chain: ChainId) -> Result<DiscoveryMode, DiscoveryError> {
        self.classes
            .get(&chain)
            .map(|class| DiscoveryMode::from(*class))
            .ok_or(DiscoveryError::UnknownChain(chain))
    }

    fn p2p(&self) -> Result<&P2pDiscovery, DiscoveryError> {
        self.p2p.as_ref().ok_or(DiscoveryError::P2pDisabled)
    }

    /// Starts (or refreshes) the discovery session of `chain`.
    ///
    /// # Errors
    ///
    /// Returns the session's start failure.
    pub async fn start(&self, chain: ChainId) -> Result<(), DiscoveryError> {
        match self.mode(chain)? {
            DiscoveryMode::Http => self.http.start(chain).await,
            DiscoveryMode::PeerToPeer => self.p2p()?.start(chain).await,
        }
    }

    /// Finds a relay able to carry a transaction paying its fee in `token`.
    ///
    /// `Ok(None)` means discovery worked but no relay serves the token.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscoveryError`] when the session could not be started.
    pub async fn find_broadcaster(
        &self,
        chain: ChainId,
        token: &TokenAddress,
        wants_relay_adapt: bool,
    ) -> Result<Option<BroadcasterSelection>, DiscoveryError> {
        match self.mode(chain)? {
            DiscoveryMode::Http => self.http.find(chain, token, wants_relay_adapt).await,
            DiscoveryMode::PeerToPeer => {
                self.p2p()?.find(chain, token, wants_relay_adapt).await
            }
        }
    }

    #[must_use]
    pub fn is_ready(&self, chain: ChainId) -> bool {
        match self.mode(chain) {
            Ok(DiscoveryMode::Http) => self.http.is_ready(chain),
            Ok(DiscoveryMode::PeerToPeer) => self.p2p.as_ref().is_some_and(|p| p.is_ready(chain)),
            Err(_) => false,
        }
    }

    /// Session state of the mode serving `chain`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::UnknownChain`] for an unconfigured chain.
    pub fn state(&self, chain: ChainId) -> Result<SessionState, DiscoveryError> {
        Ok(match self.mode(chain)? {
            DiscoveryMode::Http => self.http.state(),
            DiscoveryMode::PeerToPeer => self.p2p()?.state(),
        })
    }

    /// Relay used by HTTP mode, also the target of the relay proxy.
    #[must_use]
    pub fn relay(&self) -> &Arc<RelayClient> {
        &self.relay
    }

    pub async fn shutdown(&self) {
        if let Some(p2p) = &self.p2p {
            p2p.shutdown().await;
        }
    }
}
