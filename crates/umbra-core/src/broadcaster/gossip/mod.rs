//! libp2p gossip client for production relay discovery.
//!
//! The swarm is owned by a single driver task. [`Libp2pGossipClient`] talks to it over a
//! command channel and reads fee data from the shared [`BroadcasterFeeCache`], so lookups
//! never wait on the network.

pub mod behaviour;
pub mod fee_cache;

pub use behaviour::{fee_topic, RelayBehaviour, PROTOCOL_VERSION};
pub use fee_cache::{BroadcasterFeeCache, FeeMessage, SelectedBroadcaster};

use crate::{
    broadcaster::{errors::DiscoveryError, p2p::GossipClient},
    config::BroadcasterConfig,
    types::{ChainId, TokenAddress},
};
use async_trait::async_trait;
use behaviour::RelayBehaviourEvent;
use futures::StreamExt;
use libp2p::{
    gossipsub, noise,
    swarm::{Swarm, SwarmEvent},
    tcp, yamux, Multiaddr, PeerId, SwarmBuilder,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

const COMMAND_BUFFER: usize = 32;
const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct GossipConfig {
    pub bootstrap_peers: Vec<Multiaddr>,
    pub min_peers: usize,
    pub prune_interval: Duration,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self { bootstrap_peers: Vec::new(), min_peers: 1, prune_interval: Duration::from_secs(30) }
    }
}

impl GossipConfig {
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Join`] for a bootstrap peer that is not a multiaddr.
    pub fn from_config(config: &BroadcasterConfig) -> Result<Self, DiscoveryError> {
        let bootstrap_peers = config
            .bootstrap_peers
            .iter()
            .map(|peer| {
                peer.parse::<Multiaddr>()
                    .map_err(|e| DiscoveryError::Join(format!("bad bootstrap peer {peer}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { bootstrap_peers, min_peers: config.min_peers, ..Self::default() })
    }
}

enum Command {
    Join { chain: ChainId, reply: oneshot::Sender<Result<(), DiscoveryError>> },
    Switch { from: ChainId, to: ChainId, reply: oneshot::Sender<Result<(), DiscoveryError>> },
    Leave { reply: oneshot::Sender<()> },
}

pub struct Libp2pGossipClient {
    commands: mpsc::Sender<Command>,
    cache: Arc<BroadcasterFeeCache>,
    local_peer_id: PeerId,
}

impl Libp2pGossipClient {
    /// Builds the swarm and spawns its driver task. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Join`] if the transport or behaviour cannot be built.
    pub fn spawn(config: GossipConfig) -> Result<Self, DiscoveryError> {
        let join_err = |e: &dyn std::fmt::Display| DiscoveryError::Join(e.to_string());

        let swarm = SwarmBuilder::with_new_identity()
            .with_tokio()
            .with_tcp(tcp::Config::default(), noise::Config::new, yamux::Config::default)
            .map_err(|e| join_err(&e))?
            .with_dns()
            .map_err(|e| join_err(&e))?
            .with_behaviour(|key| {
                RelayBehaviour::new(key)
                    .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { e.into() })
            })
            .map_err(|e| join_err(&e))?
            .with_swarm_config(|c| c.with_idle_connection_timeout(IDLE_CONNECTION_TIMEOUT))
            .build();

        let local_peer_id = *swarm.local_peer_id();
        let cache = Arc::new(BroadcasterFeeCache::new());
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);

        let driver = Driver {
            swarm,
            config,
            cache: Arc::clone(&cache),
            commands: receiver,
            chain: None,
            pending_joins: Vec::new(),
        };
        tokio::spawn(driver.run());

        info!(peer_id = %local_peer_id, "gossip client started");
        Ok(Self { commands, cache, local_peer_id })
    }

    #[must_use]
    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<BroadcasterFeeCache> {
        &self.cache
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DiscoveryError> {
        let (reply, response) = oneshot::channel();
        self.commands.send(command(reply)).await.map_err(|_| DiscoveryError::Shutdown)?;
        response.await.map_err(|_| DiscoveryError::Shutdown)
    }
}

#[async_trait]
impl GossipClient for Libp2pGossipClient {
    async fn join(&self, chain: ChainId) -> Result<(), DiscoveryError> {
        self.request(|reply| Command::Join { chain, reply }).await?
    }

    fn supports_chain_switch(&self) -> bool {
        true
    }

    async fn switch_chain(&self, from: ChainId, to: ChainId) -> Result<(), DiscoveryError> {
        self.request(|reply| Command::Switch { from, to, reply }).await?
    }

    async fn find_best_broadcaster(
        &self,
        chain: ChainId,
        token: &TokenAddress,
        wants_relay_adapt: bool,
    ) -> Option<SelectedBroadcaster> {
        self.cache.best_broadcaster(chain, token, wants_relay_adapt, now_ms())
    }

    async fn shutdown(&self) {
        if self.request(|reply| Command::Leave { reply }).await.is_err() {
            debug!("gossip driver already stopped");
        }
    }
}

struct Driver {
    swarm: Swarm<RelayBehaviour>,
    config: GossipConfig,
    cache: Arc<BroadcasterFeeCache>,
    commands: mpsc::Receiver<Command>,
    chain: Option<ChainId>,
    pending_joins: Vec<oneshot::Sender<Result<(), DiscoveryError>>>,
}

impl Driver {
    async fn run(mut self) {
        let mut prune = tokio::time::interval(self.config.prune_interval);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                event = self.swarm.select_next_some() => self.handle_event(event),
                _ = prune.tick() => {
                    let pruned = self.cache.prune_expired(now_ms());
                    if pruned > 0 {
                        trace!(pruned, "expired relay fees pruned");
                    }
                }
            }
        }

        self.fail_pending(&DiscoveryError::Shutdown);
        debug!("gossip driver stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Join { chain, reply } => {
                if let Err(e) = self.subscribe(chain) {
                    let _ = reply.send(Err(e));
                    return;
                }
                self.dial_if_needed();
                if self.has_enough_peers() {
                    let _ = reply.send(Ok(()));
                } else if self.config.bootstrap_peers.is_empty() {
                    let _ = reply.send(Err(DiscoveryError::Join(
                        "no bootstrap peers configured".into(),
                    )));
                } else {
                    self.pending_joins.push(reply);
                }
            }
            Command::Switch { from, to, reply } => {
                if self.chain != Some(from) {
                    debug!(
                        expected = from,
                        actual = ?self.chain,
                        "switching from an unexpected chain"
                    );
                }
                let _ = reply.send(self.subscribe(to));
            }
            Command::Leave { reply } => {
                if let Some(chain) = self.chain.take() {
                    let _ = self.swarm.behaviour_mut().gossipsub.unsubscribe(&fee_topic(chain));
                    self.cache.clear_chain(chain);
                    info!(chain_id = chain, "left gossip topic");
                }
                self.fail_pending(&DiscoveryError::Shutdown);
                let _ = reply.send(());
            }
        }
    }

    fn subscribe(&mut self, chain: ChainId) -> Result<(), DiscoveryError> {
        let gossipsub = &mut self.swarm.behaviour_mut().gossipsub;

        if let Some(previous) = self.chain.filter(|previous| *previous != chain) {
            let _ = gossipsub.unsubscribe(&fee_topic(previous));
            self.cache.clear_chain(previous);
        }

        let topic = fee_topic(chain);
        gossipsub
            .subscribe(&topic)
            .map_err(|e| DiscoveryError::Join(format!("subscribe to {topic} failed: {e}")))?;
        self.chain = Some(chain);
        info!(chain_id = chain, topic = %topic, "subscribed to fee topic");
        Ok(())
    }

    fn dial_if_needed(&mut self) {
        if self.has_enough_peers() {
            return;
        }
        for peer in self.config.bootstrap_peers.clone() {
            match self.swarm.dial(peer.clone()) {
                Ok(()) => debug!(address = %peer, "dialing bootstrap peer"),
                Err(e) => warn!(address = %peer, error = %e, "bootstrap dial rejected"),
            }
        }
    }

    fn has_enough_peers(&self) -> bool {
        self.swarm.connected_peers().count() >= self.config.min_peers
    }

    fn fail_pending(&mut self, error: &DiscoveryError) {
        for reply in self.pending_joins.drain(..) {
            let _ = reply.send(Err(error.clone()));
        }
    }

    fn handle_event(&mut self, event: SwarmEvent<RelayBehaviourEvent>) {
        match event {
            SwarmEvent::ConnectionEstablished { peer_id, .. } => {
                debug!(peer_id = %peer_id, "peer connected");
                if self.has_enough_peers() && self.chain.is_some() {
                    for reply in self.pending_joins.drain(..) {
                        let _ = reply.send(Ok(()));
                    }
                }
            }
            SwarmEvent::ConnectionClosed { peer_id, .. } => {
                debug!(peer_id = %peer_id, "peer disconnected");
            }
            SwarmEvent::OutgoingConnectionError { peer_id, error, .. } => {
                warn!(peer_id = ?peer_id, error = %error, "outgoing connection failed");
            }
            SwarmEvent::Behaviour(RelayBehaviourEvent::Gossipsub(gossipsub::Event::Message {
                propagation_source,
                message,
                ..
            })) => self.handle_message(propagation_source, &message.data),
            SwarmEvent::Behaviour(RelayBehaviourEvent::Identify(event)) => {
                trace!(?event, "identify");
            }
            _ => {}
        }
    }

    fn handle_message(&mut self, source: PeerId, data: &[u8]) {
        let message: FeeMessage = match serde_json::from_slice(data) {
            Ok(message) => message,
            Err(e) => {
                debug!(peer_id = %source, error = %e, "dropping malformed fee message");
                return;
            }
        };

        if self.chain != Some(message.chain_id) {
            trace!(chain_id = message.chain_id, "fee message for another chain");
            return;
        }
        self.cache.insert(message);
    }
}

fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
