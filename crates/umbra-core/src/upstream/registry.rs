//! Per-chain endpoint health bookkeeping.
//!
//! The registry remembers, for each chain, which endpoints recently failed and which one
//! last succeeded. It performs no I/O. The fallback executor and quorum provider consult it
//! to decide which endpoint to try first and report every outcome back to it.
//!
//! # Invariants
//!
//! - The last successful endpoint, when not currently marked failed, is always preferred.
//! - When every candidate of a chain is marked failed, the failed set is cleared on the next
//!   lookup, so a chain with at least one configured endpoint always yields an address.
//! - State is partitioned by chain; outcomes on one chain never influence another.

use crate::types::ChainId;
use dashmap::DashMap;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use thiserror::Error;
use tracing::{debug, info};

/// Errors returned by the endpoint registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The chain has no configured endpoints. This is a deployment mistake, not a transient
    /// condition.
    #[error("no endpoints configured for chain {0}")]
    NoCandidates(ChainId),
}

/// Health record of one chain.
#[derive(Debug, Default)]
struct HealthRecord {
    failed: HashSet<Arc<str>>,
    last_success: Option<Arc<str>>,
}

impl HealthRecord {
    /// Last success if it is not marked failed, else the first candidate not marked failed.
    fn select<S: AsRef<str>>(&self, candidates: &[S]) -> Option<usize> {
        let sticky = self
            .last_success
            .as_ref()
            .filter(|last| !self.failed.contains(*last))
            .and_then(|last| candidates.iter().position(|c| c.as_ref() == last.as_ref()));

        sticky.or_else(|| candidates.iter().position(|c| !self.failed.contains(c.as_ref())))
    }
}

/// Read-only copy of a chain's health record.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct HealthSnapshot {
    pub failed: Vec<String>,
    pub last_success: Option<String>,
}

/// Tracks failed and last-successful endpoints per chain.
///
/// Records are created lazily on first use and live for the lifetime of the registry.
/// Each operation touches exactly one chain's record under that record's shard lock.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    candidates: HashMap<ChainId, Vec<Arc<str>>>,
    records: DashMap<ChainId, HealthRecord>,
}

impl EndpointRegistry {
    /// Creates a registry over the configured candidate lists.
    #[must_use]
    pub fn new(candidates: HashMap<ChainId, Vec<String>>) -> Self {
        let candidates = candidates
            .into_iter()
            .map(|(chain, urls)| (chain, urls.into_iter().map(Arc::from).collect()))
            .collect();
        Self { candidates, records: DashMap::new() }
    }

    /// Returns the configured candidates of `chain`, in configuration order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoCandidates`] if the chain is unknown or has no endpoints.
    pub fn candidates(&self, chain: ChainId) -> Result<&[Arc<str>], RegistryError> {
        match self.candidates.get(&chain) {
            Some(list) if !list.is_empty() => Ok(list),
            _ => Err(RegistryError::NoCandidates(chain)),
        }
    }

    /// Chains with at least one configured endpoint, sorted ascending.
    #[must_use]
    pub fn chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> =
            self.candidates.iter().filter(|(_, c)| !c.is_empty()).map(|(id, _)| *id).collect();
        chains.sort_unstable();
        chains
    }

    /// Returns the endpoint that should be tried first for `chain`.
    ///
    /// The last successful endpoint wins if it is not marked failed. Otherwise the first
    /// configured candidate not marked failed is returned. If every candidate is marked
    /// failed, the chain's failed set is cleared and the first candidate is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoCandidates`] if the chain has no configured endpoints.
    pub fn preferred_endpoint(&self, chain: ChainId) -> Result<Arc<str>, RegistryError> {
        let candidates = self.candidates(chain)?;
        let index = self.preferred_index(chain, candidates)?;
        Ok(Arc::clone(&candidates[index]))
    }

    /// Same selection rule as [`preferred_endpoint`](Self::preferred_endpoint), applied to
    /// an explicit candidate list. Returns the index into `candidates`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoCandidates`] if `candidates` is empty.
    pub fn preferred_index<S: AsRef<str>>(
        &self,
        chain: ChainId,
        candidates: &[S],
    ) -> Result<usize, RegistryError> {
        if candidates.is_empty() {
            return Err(RegistryError::NoCandidates(chain));
        }

        let mut record = self.records.entry(chain).or_default();
        if let Some(index) = record.select(candidates) {
            return Ok(index);
        }

        info!(chain_id = chain, endpoints = candidates.len(), "all endpoints failed, resetting");
        record.failed.clear();
        Ok(0)
    }

    /// Read-only variant of [`preferred_endpoint`](Self::preferred_endpoint) for status
    /// reporting. Returns `None` when every candidate is marked failed, without resetting.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoCandidates`] if the chain has no configured endpoints.
    pub fn peek_preferred(&self, chain: ChainId) -> Result<Option<Arc<str>>, RegistryError> {
        let candidates = self.candidates(chain)?;
        let index = match self.records.get(&chain) {
            Some(record) => record.select(candidates),
            None => Some(0),
        };
        Ok(index.map(|i| Arc::clone(&candidates[i])))
    }

    /// Marks `address` as failed for `chain`. Idempotent.
    pub fn record_failure(&self, chain: ChainId, address: &str) {
        let mut record = self.records.entry(chain).or_default();
        if record.failed.insert(Arc::from(address)) {
            debug!(chain_id = chain, endpoint = %address, "endpoint marked failed");
        }
    }

    /// Marks `address` as the last successful endpoint for `chain` and clears its failed
    /// mark. Idempotent.
    pub fn record_success(&self, chain: ChainId, address: &str) {
        let mut record = self.records.entry(chain).or_default();
        record.failed.remove(address);
        if record.last_success.as_deref() != Some(address) {
            debug!(chain_id = chain, endpoint = %address, "endpoint recorded as last success");
            record.last_success = Some(Arc::from(address));
        }
    }

    /// Clears the failed set of `chain` unconditionally. The last success is kept.
    pub fn reset(&self, chain: ChainId) {
        if let Some(mut record) = self.records.get_mut(&chain) {
            record.failed.clear();
        }
    }

    /// Returns a copy of the health record of `chain`. Failed endpoints are sorted.
    #[must_use]
    pub fn snapshot(&self, chain: ChainId) -> HealthSnapshot {
        self.records
            .get(&chain)
            .map(|record| {
                let mut failed: Vec<String> =
                    record.failed.iter().map(|a| a.to_string()).collect();
                failed.sort();
                HealthSnapshot {
                    failed,
                    last_success: record.last_success.as_ref().map(|a| a.to_string()),
                }
            })
            .unwrap_or_default()
    }
}
