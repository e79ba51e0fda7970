//! Builder for the runtime.

use crate::{
    broadcaster::{BroadcasterService, DiscoveryError},
    config::AppConfig,
    gas::GasEstimator,
    upstream::{BuilderError, UpstreamManagerBuilder},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::{lifecycle::UmbraRuntime, UmbraComponents};

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration validation failed
    #[error("configuration validation failed: {0}")]
    ConfigValidation(String),

    #[error("upstream initialization failed: {0}")]
    Upstreams(#[from] BuilderError),

    #[error("broadcaster discovery initialization failed: {0}")]
    Discovery(#[from] DiscoveryError),
}

pub struct UmbraRuntimeBuilder {
    config: Option<AppConfig>,
    discovery_warmup: bool,
}

impl UmbraRuntimeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { config: None, discovery_warmup: false }
    }

    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Starts discovery for `broadcaster.warmup_chain_id` in the background once built.
    /// A no-op when no warmup chain is configured.
    #[must_use]
    pub fn enable_discovery_warmup(mut self) -> Self {
        self.discovery_warmup = true;
        self
    }

    /// Validates the configuration and initializes every component.
    ///
    /// Must be called inside a tokio runtime when a production chain is configured, since
    /// the gossip client spawns its driver task.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the configuration is missing or invalid, or a component
    /// fails to initialize.
    pub fn build(self) -> Result<UmbraRuntime, RuntimeError> {
        let config = self
            .config
            .ok_or_else(|| RuntimeError::ConfigValidation("no configuration provided".into()))?;
        config.validate().map_err(RuntimeError::ConfigValidation)?;

        info!(
            chains = config.chains.len(),
            environment = %config.environment,
            warmup = self.discovery_warmup,
            "initializing umbra runtime"
        );

        let upstream_manager = Arc::new(UpstreamManagerBuilder::from_config(&config).build()?);
        debug!("upstream manager initialized");

        let broadcasters = Arc::new(BroadcasterService::from_config(
            &config,
            Arc::clone(upstream_manager.http_client()),
        )?);
        debug!("broadcaster discovery initialized");

        let gas_estimator = Arc::new(GasEstimator::new(
            Arc::clone(&upstream_manager),
            Arc::clone(&broadcasters),
            &config.gas,
        ));

        let components = UmbraComponents::new(upstream_manager, broadcasters, gas_estimator);
        let warmup_chain =
            if self.discovery_warmup { config.broadcaster.warmup_chain_id } else { None };

        Ok(UmbraRuntime::new(components, config, warmup_chain))
    }
}

impl Default for UmbraRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
