//! Runtime lifecycle: the optional discovery warmup task and graceful shutdown.

use crate::{
    broadcaster::BroadcasterService, config::AppConfig, gas::GasEstimator, types::ChainId,
    upstream::UpstreamManager,
};
use std::sync::Arc;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

use super::{builder::UmbraRuntimeBuilder, UmbraComponents};

/// Owns the core components and their background work.
pub struct UmbraRuntime {
    components: UmbraComponents,
    config: AppConfig,
    shutdown_tx: broadcast::Sender<()>,
    warmup_task: Option<JoinHandle<()>>,
}

impl UmbraRuntime {
    #[must_use]
    pub fn builder() -> UmbraRuntimeBuilder {
        UmbraRuntimeBuilder::new()
    }

    pub(super) fn new(
        components: UmbraComponents,
        config: AppConfig,
        warmup_chain: Option<ChainId>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);
        let warmup_task = warmup_chain.map(|chain| {
            Self::start_discovery_warmup(
                Arc::clone(components.broadcasters()),
                chain,
                shutdown_tx.subscribe(),
            )
        });

        Self { components, config, shutdown_tx, warmup_task }
    }

    #[must_use]
    pub fn components(&self) -> &UmbraComponents {
        &self.components
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn upstream_manager(&self) -> &Arc<UpstreamManager> {
        self.components.upstream_manager()
    }

    #[must_use]
    pub fn broadcasters(&self) -> &Arc<BroadcasterService> {
        self.components.broadcasters()
    }

    #[must_use]
    pub fn gas_estimator(&self) -> &Arc<GasEstimator> {
        self.components.gas_estimator()
    }

    /// Stops background work and leaves the gossip network.
    pub async fn shutdown(self) {
        info!("shutting down umbra runtime");
        if self.shutdown_tx.send(()).is_err() {
            debug!("no background task listening for shutdown");
        }

        if let Some(task) = self.warmup_task {
            if let Err(e) = task.await {
                warn!(error = %e, "discovery warmup task ended abnormally");
            }
        }

        self.components.broadcasters().shutdown().await;
        info!("umbra runtime shutdown complete");
    }

    fn start_discovery_warmup(
        broadcasters: Arc<BroadcasterService>,
        chain: ChainId,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => debug!(chain_id = chain, "discovery warmup cancelled"),
                result = broadcasters.start(chain) => match result {
                    Ok(()) => info!(chain_id = chain, "discovery warmed up"),
                    // not fatal: the next query retries
                    Err(e) => warn!(chain_id = chain, error = %e, "discovery warmup failed"),
                },
            }
        })
    }
}
