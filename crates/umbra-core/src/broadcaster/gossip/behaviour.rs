//! libp2p network behaviour for relay fee gossip.
//!
//! Bundles the protocols the fee listener needs:
//! - GossipSub for the per-chain fee topic
//! - Identify so relays can see what we speak
//! - Ping to keep idle connections alive

use crate::types::ChainId;
use libp2p::{gossipsub, identify, identity::Keypair, ping, swarm::NetworkBehaviour};
use std::time::Duration;

/// Protocol version announced through identify.
pub const PROTOCOL_VERSION: &str = "/umbra/fees/1.0.0";

/// Largest fee message accepted. Fee schedules are a few KiB at most.
const MAX_TRANSMIT_SIZE: usize = 64 * 1024;

#[derive(NetworkBehaviour)]
pub struct RelayBehaviour {
    pub gossipsub: gossipsub::Behaviour,
    pub identify: identify::Behaviour,
    pub ping: ping::Behaviour,
}

impl RelayBehaviour {
    /// Builds the behaviour for `keypair`.
    ///
    /// # Errors
    ///
    /// Returns a description of the invalid gossipsub setting.
    pub fn new(keypair: &Keypair) -> Result<Self, String> {
        let gossipsub_config = gossipsub::ConfigBuilder::default()
            .heartbeat_interval(Duration::from_secs(1))
            .validation_mode(gossipsub::ValidationMode::Permissive)
            .max_transmit_size(MAX_TRANSMIT_SIZE)
            .build()
            .map_err(|e| format!("invalid gossipsub config: {e}"))?;

        let gossipsub = gossipsub::Behaviour::new(
            gossipsub::MessageAuthenticity::Signed(keypair.clone()),
            gossipsub_config,
        )
        .map_err(|e| format!("gossipsub init failed: {e}"))?;

        let identify = identify::Behaviour::new(identify::Config::new(
            PROTOCOL_VERSION.to_string(),
            keypair.public(),
        ));

        Ok(Self { gossipsub, identify, ping: ping::Behaviour::new(ping::Config::new()) })
    }
}

/// Fee topic of `chain`.
#[must_use]
pub fn fee_topic(chain: ChainId) -> gossipsub::IdentTopic {
    gossipsub::IdentTopic::new(format!("/railgun/v2/0-{chain}-fees/json"))
}
