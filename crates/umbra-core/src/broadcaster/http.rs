//! HTTP-mode relay discovery for test chains.
//!
//! The session fetches a fee snapshot from one relay and keeps it for a TTL. Freshness is
//! checked on every query regardless of session state, so a `Ready` session with a stale
//! snapshot refetches before answering. Concurrent refreshes share one fetch.

use crate::{
    broadcaster::{
        errors::{DiscoveryError, SessionState},
        fees::{FeeSnapshot, FeeSource},
        singleflight::SingleFlight,
    },
    types::{BroadcasterSelection, ChainId, TokenAddress},
};
use arc_swap::ArcSwapOption;
use parking_lot::RwLock;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Bound on how many times `start` re-joins a refresh that turned out to be for another
/// chain.
const MAX_START_ATTEMPTS: usize = 3;

#[derive(Debug, Default, Clone, Copy)]
struct Session {
    state: SessionState,
    chain: Option<ChainId>,
}

type RefreshOutcome = (ChainId, Result<(), DiscoveryError>);

pub struct HttpDiscovery {
    source: Arc<dyn FeeSource>,
    ttl: Duration,
    fetch_timeout: Duration,
    session: Arc<RwLock<Session>>,
    snapshot: Arc<ArcSwapOption<FeeSnapshot>>,
    refresh: SingleFlight<RefreshOutcome>,
}

impl HttpDiscovery {
    #[must_use]
    pub fn new(source: Arc<dyn FeeSource>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            source,
            ttl,
            fetch_timeout,
            session: Arc::new(RwLock::new(Session::default())),
            snapshot: Arc::new(ArcSwapOption::empty()),
            refresh: SingleFlight::new(),
        }
    }

    /// Makes sure a fresh snapshot for `chain` is held.
    ///
    /// A no-op when the session is `Ready` for `chain` and the snapshot is within its TTL.
    /// Otherwise refreshes, joining a refresh already in flight.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure. The session is left `Failed` with no snapshot, and a later
    /// call retries.
    pub async fn start(&self, chain: ChainId) -> Result<(), DiscoveryError> {
        let mut last = Ok(());

        for _ in 0..MAX_START_ATTEMPTS {
            if self.is_fresh(chain) {
                return Ok(());
            }

            let (refreshed, outcome) = self
                .refresh
                .run(|| {
                    *self.session.write() =
                        Session { state: SessionState::Initializing, chain: Some(chain) };
                    refresh(
                        Arc::clone(&self.source),
                        Arc::clone(&self.session),
                        Arc::clone(&self.snapshot),
                        chain,
                        self.fetch_timeout,
                    )
                })
                .await;

            if refreshed == chain {
                return outcome;
            }
            debug!(chain_id = chain, joined = refreshed, "joined refresh for another chain");
            last = outcome;
        }

        last?;
        Err(DiscoveryError::FeeFetch(format!(
            "chain {chain} kept losing the refresh slot to other chains"
        )))
    }

    /// Finds the relay fee for `token` on `chain`, refreshing the snapshot first if needed.
    ///
    /// Returns `Ok(None)` when the relay does not list the token. HTTP relays always support
    /// relay-adapt, so `wants_relay_adapt` does not narrow the result.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscoveryError`] when no fresh snapshot could be obtained.
    pub async fn find(
        &self,
        chain: ChainId,
        token: &TokenAddress,
        wants_relay_adapt: bool,
    ) -> Result<Option<BroadcasterSelection>, DiscoveryError> {
        self.start(chain).await?;

        let snapshot = self
            .snapshot
            .load_full()
            .filter(|s| s.chain_id == chain)
            .ok_or_else(|| DiscoveryError::FeeFetch("fee snapshot was replaced".into()))?;

        let selection = snapshot.lookup(token);
        debug!(
            chain_id = chain,
            token = %token,
            relay_adapt = wants_relay_adapt,
            found = selection.is_some(),
            "http broadcaster lookup"
        );
        Ok(selection)
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

    /// Current snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<FeeSnapshot>> {
        self.snapshot.load_full()
    }

    fn is_fresh(&self, chain: ChainId) -> bool {
        if !self.is_ready(chain) {
            return false;
        }
        self.snapshot
            .load()
            .as_ref()
            .is_some_and(|s| s.chain_id == chain && !s.is_stale(self.ttl, Instant::now()))
    }
}

async fn refresh(
    source: Arc<dyn FeeSource>,
    session: Arc<RwLock<Session>>,
    snapshot: Arc<ArcSwapOption<FeeSnapshot>>,
    chain: ChainId,
    fetch_timeout: Duration,
) -> RefreshOutcome {
    let fetched = match tokio::time::timeout(fetch_timeout, source.fetch_fees(chain)).await {
        Ok(result) => result,
        Err(_) => Err(DiscoveryError::Timeout { operation: "fee fetch", after: fetch_timeout }),
    };

    match fetched {
        Ok(response) => {
            let fresh = FeeSnapshot::from_response(chain, response, Instant::now());
            info!(
                chain_id = chain,
                relay = %fresh.relay_address,
                tokens = fresh.fees.len(),
                "relay fee snapshot refreshed"
            );
            snapshot.store(Some(Arc::new(fresh)));
            *session.write() = Session { state: SessionState::Ready, chain: Some(chain) };
            (chain, Ok(()))
        }
        Err(e) => {
            warn!(chain_id = chain, error = %e, "relay fee refresh failed");
            snapshot.store(None);
            *session.write() = Session { state: SessionState::Failed, chain: Some(chain) };
            (chain, Err(e))
        }
    }
}
