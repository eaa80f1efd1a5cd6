//! Static description of the target network.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockExplorer {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub id: u64,
    pub name: String,
    pub native_currency: NativeCurrency,
    pub http_rpc_urls: Vec<String>,
    pub ws_rpc_urls: Vec<String>,
    /// First entry is the default explorer.
    pub explorers: Vec<BlockExplorer>,
}

impl ChainConfig {
    pub fn monad_testnet() -> Self {
        Self {
            id: 10143,
            name: "Monad Testnet".to_string(),
            native_currency: NativeCurrency {
                name: "Monad".to_string(),
                symbol: "MON".to_string(),
                decimals: 18,
            },
            http_rpc_urls: vec!["https://testnet-rpc.monad.xyz".to_string()],
            ws_rpc_urls: vec!["wss://testnet-rpc.monad.xyz".to_string()],
            explorers: vec![
                BlockExplorer {
                    name: "Monad Explorer".to_string(),
                    url: "https://testnet.monadexplorer.com".to_string(),
                },
                BlockExplorer {
                    name: "MonadScan".to_string(),
                    url: "https://testnet.monadscan.com".to_string(),
                },
            ],
        }
    }

    pub fn default_rpc_url(&self) -> Option<&str> {
        self.http_rpc_urls.first().map(String::as_str)
    }

    pub fn tx_url(&self, tx_hash: B256) -> Option<String> {
        self.explorers
            .first()
            .map(|e| format!("{}/tx/{tx_hash:#x}", e.url))
    }

    pub fn address_url(&self, address: Address) -> Option<String> {
        self.explorers
            .first()
            .map(|e| format!("{}/address/{address}", e.url))
    }

    /// Render a base-unit amount in whole native units, rounded to 4 decimals.
    pub fn format_native(&self, amount: U256) -> String {
        let one = U256::from(10u64).pow(U256::from(self.native_currency.decimals));
        let scale = U256::from(10_000u64);
        let half = one / U256::from(2u64);
        let scaled = amount.saturating_mul(scale).saturating_add(half) / one;
        let whole = scaled / scale;
        let frac = (scaled % scale).to::<u64>();
        format!("{whole}.{frac:04}")
    }
}
