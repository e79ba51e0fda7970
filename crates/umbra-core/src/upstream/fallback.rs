//! Sequential fallback over an ordered candidate list.
//!
//! [`FallbackExecutor::run_with_fallback`] tries one unit of work against each candidate in
//! turn, starting from the registry's preferred endpoint and wrapping around, until one
//! succeeds. Exhaustion is a typed return value ([`FallbackError::Exhausted`]) rather than a
//! panic or a sentinel.
//!
//! ```text
//! candidates [E1, E2, E3], preferred = E2
//!
//!   try-order: E2 -> E3 -> E1
//!      ok  -> record_success, return
//!      err -> record_failure, keep error, next
//!   all err -> reset(chain), Exhausted { last error }
//! ```
//!
//! Each candidate is tried at most once per call. Retrying a single endpoint with backoff
//! is left to callers.

use crate::{
    errors::ErrorKind,
    types::ChainId,
    upstream::{
        errors::UpstreamError,
        registry::{EndpointRegistry, RegistryError},
    },
};
use std::{fmt::Display, future::Future, sync::Arc};
use thiserror::Error;
use tracing::{debug, warn};

/// Anything that names an endpoint address.
pub trait Candidate: Clone {
    fn address(&self) -> &str;
}

impl Candidate for Arc<str> {
    fn address(&self) -> &str {
        self
    }
}

impl Candidate for String {
    fn address(&self) -> &str {
        self
    }
}

impl Candidate for &str {
    fn address(&self) -> &str {
        self
    }
}

/// Outcome of a fallback run in which no candidate succeeded.
#[derive(Debug, Error)]
pub enum FallbackError<E> {
    /// No candidates were supplied for the chain.
    #[error("no endpoints configured for chain {chain}")]
    NoCandidates { chain: ChainId },

    /// Every candidate was tried once and failed.
    #[error("all {attempts} endpoints failed for chain {chain}: {last}")]
    Exhausted { chain: ChainId, attempts: usize, last: E },
}

impl<E> FallbackError<E> {
    #[must_use]
    pub fn chain(&self) -> ChainId {
        match self {
            Self::NoCandidates { chain } | Self::Exhausted { chain, .. } => *chain,
        }
    }

    /// Last underlying failure, if any candidate was tried.
    #[must_use]
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::NoCandidates { .. } => None,
            Self::Exhausted { last, .. } => Some(last),
        }
    }
}

impl FallbackError<UpstreamError> {
    /// Caller-facing classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCandidates { .. } => ErrorKind::Configuration,
            Self::Exhausted { .. } => ErrorKind::NetworkUnreachable,
        }
    }
}

impl<E> From<RegistryError> for FallbackError<E> {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NoCandidates(chain) => Self::NoCandidates { chain },
        }
    }
}

/// Runs units of work against candidates in registry-preferred order.
#[derive(Debug, Clone)]
pub struct FallbackExecutor {
    registry: Arc<EndpointRegistry>,
}

impl FallbackExecutor {
    #[must_use]
    pub fn new(registry: Arc<EndpointRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    /// Returns `candidates` rotated so the registry-preferred one comes first, preserving
    /// the relative order of the rest.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoCandidates`] if `candidates` is empty.
    pub fn try_order<C: Candidate>(
        &self,
        chain: ChainId,
        candidates: &[C],
    ) -> Result<Vec<C>, RegistryError> {
        let addresses: Vec<&str> = candidates.iter().map(Candidate::address).collect();
        let start = self.registry.preferred_index(chain, &addresses)?;

        let mut order = Vec::with_capacity(candidates.len());
        order.extend_from_slice(&candidates[start..]);
        order.extend_from_slice(&candidates[..start]);
        Ok(order)
    }

    /// Invokes `operation` on each candidate in try-order until one succeeds.
    ///
    /// On success the candidate is recorded as the chain's last success and the result is
    /// returned immediately. On failure the candidate is recorded as failed and the next one
    /// is tried. If all fail, the chain's failed set is reset and the last error is returned
    /// inside [`FallbackError::Exhausted`].
    ///
    /// # Errors
    ///
    /// - [`FallbackError::NoCandidates`] if `candidates` is empty
    /// - [`FallbackError::Exhausted`] if every candidate failed
    pub async fn run_with_fallback<C, T, E, F, Fut>(
        &self,
        chain: ChainId,
        candidates: &[C],
        mut operation: F,
    ) -> Result<T, FallbackError<E>>
    where
        C: Candidate,
        E: Display,
        F: FnMut(C) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let order = self.try_order(chain, candidates)?;
        let attempts = order.len();
        let mut last_error = None;

        for (attempt, candidate) in order.into_iter().enumerate() {
            let address = candidate.address().to_string();

            match operation(candidate).await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(
                            chain_id = chain,
                            endpoint = %address,
                            attempt = attempt + 1,
                            "fallback candidate succeeded"
                        );
                    }
                    self.registry.record_success(chain, &address);
                    return Ok(result);
                }
                Err(e) => {
                    warn!(
                        chain_id = chain,
                        endpoint = %address,
                        attempt = attempt + 1,
                        of = attempts,
                        error = %e,
                        "endpoint failed, trying next candidate"
                    );
                    self.registry.record_failure(chain, &address);
                    last_error = Some(e);
                }
            }
        }

        self.registry.reset(chain);

        match last_error {
            Some(last) => {
                warn!(chain_id = chain, attempts = attempts, "all endpoints failed");
                Err(FallbackError::Exhausted { chain, attempts, last })
            }
            None => Err(FallbackError::NoCandidates { chain }),
        }
    }
}
