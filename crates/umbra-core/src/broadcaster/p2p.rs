//! Peer-to-peer relay discovery for production chains.
//!
//! The session joins the gossip network of one chain at a time. Moving to another chain
//! switches the subscription in place when the client supports it and reinitializes
//! otherwise. Concurrent `start` calls share one in-flight initialization.

use crate::{
    broadcaster::{
        errors::{DiscoveryError, SessionState},
        gossip::SelectedBroadcaster,
        singleflight::SingleFlight,
    },
    types::{BroadcasterSelection, ChainId, TokenAddress},
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

const MAX_START_ATTEMPTS: usize = 3;

/// Gossip network handle used by [`P2pDiscovery`].
#[async_trait]
pub trait GossipClient: Send + Sync {
    /// Joins the fee gossip of `chain`. Resolves once enough peers are connected.
    async fn join(&self, chain: ChainId) -> Result<(), DiscoveryError>;

    /// Whether [`switch_chain`](Self::switch_chain) can move a live session.
    fn supports_chain_switch(&self) -> bool;

    /// Moves a live session from `from` to `to` without reconnecting.
    async fn switch_chain(&self, from: ChainId, to: ChainId) -> Result<(), DiscoveryError>;

    /// Cheapest relay currently advertising `token` on `chain`.
    async fn find_best_broadcaster(
        &self,
        chain: ChainId,
        token: &TokenAddress,
        wants_relay_adapt: bool,
    ) -> Option<SelectedBroadcaster>;

    /// Leaves the current session. Idempotent.
    async fn shutdown(&self);
}

#[derive(Debug, Default, Clone, Copy)]
struct Session {
    state: SessionState,
    chain: Option<ChainId>,
}

type StartOutcome = (ChainId, Result<(), DiscoveryError>);

pub struct P2pDiscovery {
    client: Arc<dyn GossipClient>,
    join_timeout: Duration,
    session: Arc<RwLock<Session>>,
    start_flight: SingleFlight<StartOutcome>,
}

impl P2pDiscovery {
    #[must_use]
    pub fn new(client: Arc<dyn GossipClient>, join_timeout: Duration) -> Self {
        Self {
            client,
            join_timeout,
            session: Arc::new(RwLock::new(Session::default())),
            start_flight: SingleFlight::new(),
        }
    }

    /// Makes the session `Ready` for `chain`.
    ///
    /// Returns immediately when already ready for `chain`. Callers arriving while an
    /// initialization is pending share its outcome.
    ///
    /// # Errors
    ///
    /// Returns the join failure or [`DiscoveryError::Timeout`]. The session is left `Failed`
    /// and a later call retries.
    pub async fn start(&self, chain: ChainId) -> Result<(), DiscoveryError> {
        let mut last = Ok(());

        for _ in 0..MAX_START_ATTEMPTS {
            if self.is_ready(chain) {
                return Ok(());
            }

            let (started, outcome) = self
                .start_flight
                .run(|| {
                    let previous = std::mem::replace(
                        &mut *self.session.write(),
                        Session { state: SessionState::Initializing, chain: Some(chain) },
                    );
                    initialize(
                        Arc::clone(&self.client),
                        Arc::clone(&self.session),
                        previous,
                        chain,
                        self.join_timeout,
                    )
                })
                .await;

            if started == chain {
                return outcome;
            }
            last = outcome;
        }

        last?;
        Err(DiscoveryError::Join(format!(
            "chain {chain} kept losing the start slot to other chains"
        )))
    }

    /// Finds the cheapest relay for `token` on `chain`, joining first if needed.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscoveryError`] when the session cannot be made ready.
    pub async fn find(
        &self,
        chain: ChainId,
        token: &TokenAddress,
        wants_relay_adapt: bool,
    ) -> Result<Option<BroadcasterSelection>, DiscoveryError> {
        self.start(chain).await?;

        let selected = self.client.find_best_broadcaster(chain, token, wants_relay_adapt).await;
        debug!(
            chain_id = chain,
            token = %token,
            relay_adapt = wants_relay_adapt,
            found = selected.is_some(),
            "p2p broadcaster lookup"
        );

        Ok(selected.map(|s| BroadcasterSelection {
            relay_address: s.railgun_address,
            token: s.token,
            fee_per_unit_gas: s.fee_per_unit_gas,
            fees_id: s.fees_id,
        }))
    }

    /// Liveness snapshot: `Ready` for `chain` right now. A later query may still fail.
    #[must_use]
    pub fn is_ready(&self, chain: ChainId) -> bool {
        let session = *self.session.read();
        session.state == SessionState::Ready && session.chain == Some(chain)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.read().state
    }

    /// Leaves the gossip network and returns to `Uninitialized`.
    pub async fn shutdown(&self) {
        self.client.shutdown().await;
        *self.session.write() = Session::default();
        info!("p2p discovery shut down");
    }
}

async fn initialize(
    client: Arc<dyn GossipClient>,
    session: Arc<RwLock<Session>>,
    previous: Session,
    chain: ChainId,
    join_timeout: Duration,
) -> StartOutcome {
    let attempt = async {
        match previous {
            Session { state: SessionState::Ready, chain: Some(from) }
                if from != chain && client.supports_chain_switch() =>
            {
                info!(from = from, to = chain, "switching gossip chain in place");
                client.switch_chain(from, chain).await
            }
            Session { chain: Some(from), .. } => {
                info!(from = from, to = chain, "reinitializing gossip session");
                client.shutdown().await;
                client.join(chain).await
            }
            Session { chain: None, .. } => {
                info!(chain_id = chain, "joining gossip network");
                client.join(chain).await
            }
        }
    };

    let outcome = match tokio::time::timeout(join_timeout, attempt).await {
        Ok(result) => result,
        Err(_) => Err(DiscoveryError::Timeout { operation: "gossip join", after: join_timeout }),
    };

    let state = match &outcome {
        Ok(()) => {
            info!(chain_id = chain, "p2p discovery ready");
            SessionState::Ready
        }
        Err(e) => {
            warn!(chain_id = chain, error = %e, "p2p discovery failed to start");
            SessionState::Failed
        }
    };
    *session.write() = Session { state, chain: Some(chain) };

    (chain, outcome)
}
