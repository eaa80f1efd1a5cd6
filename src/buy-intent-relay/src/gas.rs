//! Gas price resolution with a fixed fallback.

use std::{sync::Arc, time::Duration};

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{errors::RpcFailure, rpc::BundlerRpc};

/// How long the relay gets to quote a price before the fallback is used.
pub const DEFAULT_GAS_PRICE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPrice {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// 100 gwei for both fields.
pub const FALLBACK_GAS_PRICE: GasPrice = GasPrice {
    max_fee_per_gas: U256::from_limbs([100_000_000_000, 0, 0, 0]),
    max_priority_fee_per_gas: U256::from_limbs([100_000_000_000, 0, 0, 0]),
};

pub struct GasPriceOracle {
    bundler: Arc<dyn BundlerRpc>,
    fallback: GasPrice,
    timeout: Duration,
}

impl GasPriceOracle {
    pub fn new(bundler: Arc<dyn BundlerRpc>) -> Self {
        Self {
            bundler,
            fallback: FALLBACK_GAS_PRICE,
            timeout: DEFAULT_GAS_PRICE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fallback(mut self, fallback: GasPrice) -> Self {
        self.fallback = fallback;
        self
    }

    /// Relay "fast" tier, or the fallback when the relay cannot answer in time. Never fails;
    /// the relay is asked exactly once.
    pub async fn get_price(&self) -> GasPrice {
        let answer = tokio::time::timeout(self.timeout, self.bundler.gas_price())
            .await
            .unwrap_or_else(|_| {
                Err(RpcFailure::Transport(format!(
                    "no gas price within {}ms",
                    self.timeout.as_millis()
                )))
            });
        match answer {
            Ok(tiers) => {
                debug!(
                    max_fee_per_gas = %tiers.fast.max_fee_per_gas,
                    max_priority_fee_per_gas = %tiers.fast.max_priority_fee_per_gas,
                    "relay gas price"
                );
                tiers.fast
            }
            Err(err) => {
                warn!(%err, "relay gas price unavailable, using fallback");
                self.fallback
            }
        }
    }
}
