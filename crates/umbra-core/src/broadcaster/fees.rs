//! Relay fee schedules and their time-bounded snapshots.

use crate::{
    broadcaster::errors::DiscoveryError,
    types::{parse_quantity, BroadcasterSelection, ChainId, TokenAddress},
};
use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};
use tokio::time::Instant;
use tracing::warn;

/// Body of `GET <relay>/fees`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayFeesResponse {
    pub railgun_address: String,
    #[serde(default)]
    pub fees: HashMap<String, RelayFeeEntry>,
}

/// One token entry of a relay fee schedule as sent on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayFeeEntry {
    /// Hex or decimal string.
    pub fee_per_unit_gas: String,
    #[serde(rename = "feesID")]
    pub fees_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeEntry {
    pub fee_per_unit_gas: U256,
    pub fees_id: String,
}

/// A relay's fee schedule as fetched at `fetched_at`.
///
/// Owned by the discovery service. Callers only ever receive [`BroadcasterSelection`] values
/// copied out of it.
#[derive(Debug, Clone)]
pub struct FeeSnapshot {
    pub chain_id: ChainId,
    pub relay_address: String,
    pub fees: HashMap<TokenAddress, FeeEntry>,
    pub fetched_at: Instant,
}

impl FeeSnapshot {
    /// Builds a snapshot from a relay response, canonicalizing token keys.
    ///
    /// Entries whose token or fee does not parse are skipped. A partially valid schedule is
    /// still useful for the tokens that did parse.
    #[must_use]
    pub fn from_response(chain_id: ChainId, response: RelayFeesResponse, now: Instant) -> Self {
        let mut fees = HashMap::with_capacity(response.fees.len());

        for (key, entry) in response.fees {
            let token = match TokenAddress::try_from(key.as_str()) {
                Ok(token) => token,
                Err(e) => {
                    warn!(chain_id = chain_id, token = %key, error = %e, "skipping fee entry");
                    continue;
                }
            };
            let fee_per_unit_gas = match parse_quantity(&entry.fee_per_unit_gas) {
                Ok(fee) => fee,
                Err(e) => {
                    warn!(chain_id = chain_id, token = %token, error = %e, "skipping fee entry");
                    continue;
                }
            };
            fees.insert(token, FeeEntry { fee_per_unit_gas, fees_id: entry.fees_id });
        }

        Self { chain_id, relay_address: response.railgun_address, fees, fetched_at: now }
    }

    /// Whether the snapshot is older than `ttl` at `now`.
    #[must_use]
    pub fn is_stale(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) >= ttl
    }

    /// Looks up `token`. Absent tokens yield `None`; no default fee is ever substituted.
    #[must_use]
    pub fn lookup(&self, token: &TokenAddress) -> Option<BroadcasterSelection> {
        self.fees.get(token).map(|entry| BroadcasterSelection {
            relay_address: self.relay_address.clone(),
            token: *token,
            fee_per_unit_gas: entry.fee_per_unit_gas,
            fees_id: entry.fees_id.clone(),
        })
    }
}

/// Source of relay fee schedules.
#[async_trait]
pub trait FeeSource: Send + Sync {
    /// Fetches the current schedule for `chain`. The caller applies its own timeout.
    async fn fetch_fees(&self, chain: ChainId) -> Result<RelayFeesResponse, DiscoveryError>;
}
