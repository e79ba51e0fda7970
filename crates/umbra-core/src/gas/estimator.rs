use super::{GasError, GasEstimate, GasEstimateKind, RelayedGasEstimate, TransactionRequest};
use crate::{
    broadcaster::BroadcasterService,
    config::GasConfig,
    types::{parse_quantity, ChainId, JsonRpcRequest, TokenAddress},
    upstream::UpstreamManager,
};
use alloy_primitives::U256;
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{debug, warn};

/// Relay fee rates are scaled by 10^18.
const FEE_SCALE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

pub struct GasEstimator {
    upstreams: Arc<UpstreamManager>,
    broadcasters: Arc<BroadcasterService>,
    relay_adapt_address: Option<String>,
    relay_adapt_overhead_gas: u64,
    next_id: AtomicU64,
}

impl GasEstimator {
    #[must_use]
    pub fn new(
        upstreams: Arc<UpstreamManager>,
        broadcasters: Arc<BroadcasterService>,
        config: &GasConfig,
    ) -> Self {
        Self {
            upstreams,
            broadcasters,
            relay_adapt_address: config.relay_adapt_address.clone(),
            relay_adapt_overhead_gas: config.relay_adapt_overhead_gas,
            next_id: AtomicU64::new(1),
        }
    }

    /// `eth_estimateGas` for `tx` through sequential fallback.
    ///
    /// # Errors
    ///
    /// [`GasError::Rejected`] when the node refuses the call (a revert), [`GasError::Network`]
    /// when no endpoint answered.
    pub async fn estimate_gas(
        &self,
        chain: ChainId,
        tx: &TransactionRequest,
    ) -> Result<GasEstimate, GasError> {
        let params = json!([tx]);
        let gas = self.query(chain, "eth_estimateGas", Some(params)).await?;
        let gas_limit = u64::try_from(gas).map_err(|_| GasError::Overflow)?;
        Ok(GasEstimate { gas_limit, kind: GasEstimateKind::Exact })
    }

    /// Current `eth_gasPrice` of `chain`.
    ///
    /// # Errors
    ///
    /// Same as [`estimate_gas`](Self::estimate_gas).
    pub async fn gas_price(&self, chain: ChainId) -> Result<U256, GasError> {
        self.query(chain, "eth_gasPrice", None).await
    }

    /// Estimates a transaction submitted through a broadcaster paid in `token`.
    ///
    /// With `wants_relay_adapt`, gas is estimated against the configured relay-adapt contract.
    /// When that estimate is unavailable the direct estimate plus the configured overhead is
    /// used instead and marked [`GasEstimateKind::LowerBound`].
    ///
    /// # Errors
    ///
    /// Discovery failures, [`GasError::NoBroadcaster`] when no relay takes `token`, and any
    /// failure of the direct estimate or the gas price query.
    pub async fn estimate_relayed(
        &self,
        chain: ChainId,
        tx: &TransactionRequest,
        token: &TokenAddress,
        wants_relay_adapt: bool,
    ) -> Result<RelayedGasEstimate, GasError> {
        let broadcaster = self
            .broadcasters
            .find_broadcaster(chain, token, wants_relay_adapt)
            .await?
            .ok_or_else(|| GasError::NoBroadcaster { chain, token: *token })?;

        let gas = if wants_relay_adapt {
            self.estimate_through_relay_adapt(chain, tx).await?
        } else {
            self.estimate_gas(chain, tx).await?
        };

        let gas_price = self.gas_price(chain).await?;
        let broadcaster_fee =
            broadcaster_fee(gas.gas_limit, gas_price, broadcaster.fee_per_unit_gas)?;

        debug!(
            chain_id = chain,
            relay = %broadcaster.relay_address,
            gas_limit = gas.gas_limit,
            kind = ?gas.kind,
            fee = %broadcaster_fee,
            "relayed estimate computed"
        );

        Ok(RelayedGasEstimate { broadcaster, gas, gas_price, broadcaster_fee })
    }

    async fn estimate_through_relay_adapt(
        &self,
        chain: ChainId,
        tx: &TransactionRequest,
    ) -> Result<GasEstimate, GasError> {
        if let Some(adapter) = &self.relay_adapt_address {
            let routed = TransactionRequest { to: adapter.clone(), ..tx.clone() };
            match self.estimate_gas(chain, &routed).await {
                Ok(estimate) => return Ok(estimate),
                Err(e) => {
                    warn!(
                        chain_id = chain,
                        error = %e,
                        "relay-adapt estimate failed, using component estimate"
                    );
                }
            }
        }

        let direct = self.estimate_gas(chain, tx).await?;
        let gas_limit = direct
            .gas_limit
            .checked_add(self.relay_adapt_overhead_gas)
            .ok_or(GasError::Overflow)?;
        Ok(GasEstimate { gas_limit, kind: GasEstimateKind::LowerBound })
    }

    async fn query(
        &self,
        chain: ChainId,
        method: &str,
        params: Option<Value>,
    ) -> Result<U256, GasError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(method, params, json!(id));
        let response = self.upstreams.send_request(chain, &request).await?;

        if let Some(error) = response.error {
            return Err(GasError::Rejected { code: error.code, message: error.message });
        }

        let raw = response
            .result
            .as_ref()
            .and_then(Value::as_str)
            .ok_or_else(|| GasError::InvalidResponse(format!("{method} returned no quantity")))?;
        parse_quantity(raw).map_err(|e| GasError::InvalidResponse(e.to_string()))
    }
}

/// Relay fee in token units: `gas_limit * gas_price * fee_per_unit_gas / 10^18`.
fn broadcaster_fee(
    gas_limit: u64,
    gas_price: U256,
    fee_per_unit_gas: U256,
) -> Result<U256, GasError> {
    U256::from(gas_limit)
        .checked_mul(gas_price)
        .and_then(|cost| cost.checked_mul(fee_per_unit_gas))
        .map(|scaled| scaled / FEE_SCALE)
        .ok_or(GasError::Overflow)
}
