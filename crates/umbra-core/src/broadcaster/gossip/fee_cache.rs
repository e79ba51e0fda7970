//! Fee messages gossiped by relays and the selection over them.
//!
//! Every relay periodically publishes its fee schedule on the chain's fee topic. The cache
//! keeps the latest message per relay and answers "cheapest relay for this token" queries.

use crate::types::{parse_quantity, ChainId, TokenAddress};
use alloy_primitives::U256;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Fee schedule message as published on the gossip topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeMessage {
    pub chain_id: ChainId,
    pub railgun_address: String,
    #[serde(rename = "feesID")]
    pub fees_id: String,
    /// Token address to fee per unit gas, hex or decimal.
    pub fees: HashMap<String, String>,
    /// Unix milliseconds after which the schedule is void.
    pub fee_expiration: u64,
    pub available_wallets: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_adapt: Option<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

/// Relay picked by [`BroadcasterFeeCache::best_broadcaster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedBroadcaster {
    pub railgun_address: String,
    pub token: TokenAddress,
    pub fee_per_unit_gas: U256,
    pub fees_id: String,
    pub relay_adapt: Option<String>,
    pub expires_at_ms: u64,
}

#[derive(Debug, Clone)]
struct CachedFees {
    fees: HashMap<TokenAddress, U256>,
    fees_id: String,
    expires_at_ms: u64,
    available_wallets: u32,
    relay_adapt: Option<String>,
}

/// Latest fee message per relay, partitioned by chain.
#[derive(Debug, Default)]
pub struct BroadcasterFeeCache {
    chains: DashMap<ChainId, HashMap<String, CachedFees>>,
}

impl BroadcasterFeeCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `message` unless a message with a later expiration is already cached for the
    /// same relay. Returns whether the message was stored.
    pub fn insert(&self, message: FeeMessage) -> bool {
        let fees: HashMap<TokenAddress, U256> = message
            .fees
            .iter()
            .filter_map(|(token, fee)| {
                let token = TokenAddress::try_from(token.as_str()).ok()?;
                let fee = parse_quantity(fee).ok()?;
                Some((token, fee))
            })
            .collect();

        if fees.is_empty() {
            trace!(relay = %message.railgun_address, "fee message without usable fees");
            return false;
        }

        let mut relays = self.chains.entry(message.chain_id).or_default();
        if relays
            .get(&message.railgun_address)
            .is_some_and(|cached| cached.expires_at_ms > message.fee_expiration)
        {
            return false;
        }

        debug!(
            chain_id = message.chain_id,
            relay = %message.railgun_address,
            tokens = fees.len(),
            wallets = message.available_wallets,
            "relay fees updated"
        );
        relays.insert(
            message.railgun_address,
            CachedFees {
                fees,
                fees_id: message.fees_id,
                expires_at_ms: message.fee_expiration,
                available_wallets: message.available_wallets,
                relay_adapt: message.relay_adapt,
            },
        );
        true
    }

    /// Picks the relay with the lowest fee for `token` on `chain`.
    ///
    /// Expired messages and relays without available wallets are ignored. When
    /// `wants_relay_adapt` is set, relays that do not advertise a relay-adapt contract are
    /// ignored too. Equal fees are broken by the later expiration.
    #[must_use]
    pub fn best_broadcaster(
        &self,
        chain: ChainId,
        token: &TokenAddress,
        wants_relay_adapt: bool,
        now_ms: u64,
    ) -> Option<SelectedBroadcaster> {
        let relays = self.chains.get(&chain)?;

        relays
            .iter()
            .filter(|(_, cached)| cached.expires_at_ms > now_ms)
            .filter(|(_, cached)| cached.available_wallets > 0)
            .filter(|(_, cached)| !wants_relay_adapt || cached.relay_adapt.is_some())
            .filter_map(|(address, cached)| {
                cached.fees.get(token).map(|fee| (address, cached, *fee))
            })
            .min_by(|(a_addr, a, a_fee), (b_addr, b, b_fee)| {
                a_fee
                    .cmp(b_fee)
                    .then_with(|| b.expires_at_ms.cmp(&a.expires_at_ms))
                    .then_with(|| a_addr.cmp(b_addr))
            })
            .map(|(address, cached, fee)| SelectedBroadcaster {
                railgun_address: address.clone(),
                token: *token,
                fee_per_unit_gas: fee,
                fees_id: cached.fees_id.clone(),
                relay_adapt: cached.relay_adapt.clone(),
                expires_at_ms: cached.expires_at_ms,
            })
    }

    /// Drops every expired message. Returns how many were dropped.
    pub fn prune_expired(&self, now_ms: u64) -> usize {
        let mut pruned = 0;
        for mut relays in self.chains.iter_mut() {
            let before = relays.len();
            relays.retain(|_, cached| cached.expires_at_ms > now_ms);
            pruned += before - relays.len();
        }
        pruned
    }

    /// Number of relays cached for `chain`, expired or not.
    #[must_use]
    pub fn relay_count(&self, chain: ChainId) -> usize {
        self.chains.get(&chain).map_or(0, |relays| relays.len())
    }

    pub fn clear_chain(&self, chain: ChainId) {
        self.chains.remove(&chain);
    }
}
