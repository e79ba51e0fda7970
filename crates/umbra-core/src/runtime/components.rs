use crate::{broadcaster::BroadcasterService, gas::GasEstimator, upstream::UpstreamManager};
use std::sync::Arc;

/// Container for the initialized core components.
///
/// Cheap to clone; every component is behind an `Arc` and safe to share across tasks.
#[derive(Clone)]
pub struct UmbraComponents {
    upstream_manager: Arc<UpstreamManager>,
    broadcasters: Arc<BroadcasterService>,
    gas_estimator: Arc<GasEstimator>,
}

impl UmbraComponents {
    #[must_use]
    pub fn new(
        upstream_manager: Arc<UpstreamManager>,
        broadcasters: Arc<BroadcasterService>,
        gas_estimator: Arc<GasEstimator>,
    ) -> Self {
        Self { upstream_manager, broadcasters, gas_estimator }
    }

    #[must_use]
    pub fn upstream_manager(&self) -> &Arc<UpstreamManager> {
        &self.upstream_manager
    }

    #[must_use]
    pub fn broadcasters(&self) -> &Arc<BroadcasterService> {
        &self.broadcasters
    }

    #[must_use]
    pub fn gas_estimator(&self) -> &Arc<GasEstimator> {
        &self.gas_estimator
    }
}
