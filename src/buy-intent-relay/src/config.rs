//! Runtime configuration, built once at process start and passed into each component.

use std::{fmt, str::FromStr, time::Duration};

use alloy_primitives::{Address, B256, U256};
use buy_intent_types::{
    constants::{
        ACCOUNT_SALT_NONCE, DEFAULT_HELPER_SELECTOR, DEFAULT_INTENT_NONCE, DEFAULT_TARGET_TOKEN,
        ENTRY_POINT_V07, INTENT_GATEWAY, SAFE_4337_MODULE, SAFE_MODULE_SETUP, SAFE_MULTI_SEND,
        SAFE_PROXY_FACTORY, SAFE_SINGLETON,
    },
    IntentParams,
};

use crate::{chain::ChainConfig, errors::IntentError, gas::DEFAULT_GAS_PRICE_TIMEOUT};

pub const DEFAULT_WAIT_BUDGET: Duration = Duration::from_secs(10);
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_RECEIPT_POLL_LIMIT: u32 = 120;
/// Upper bound on any single HTTP JSON-RPC round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const RELAY_BASE_URL: &str = "https://api.pimlico.io/v2/monad-testnet/rpc";

/// Contract addresses the pipeline talks to. Configuration, never derived.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub intent_gateway: Address,
    pub entry_point: Address,
    pub proxy_factory: Address,
    pub safe_singleton: Address,
    pub safe_4337_module: Address,
    pub safe_module_setup: Address,
    pub multi_send: Address,
    pub salt_nonce: U256,
}

impl Default for Deployment {
    fn default() -> Self {
        Self {
            intent_gateway: INTENT_GATEWAY,
            entry_point: ENTRY_POINT_V07,
            proxy_factory: SAFE_PROXY_FACTORY,
            safe_singleton: SAFE_SINGLETON,
            safe_4337_module: SAFE_4337_MODULE,
            safe_module_setup: SAFE_MODULE_SETUP,
            multi_send: SAFE_MULTI_SEND,
            salt_nonce: ACCOUNT_SALT_NONCE,
        }
    }
}

/// Who pays for gas.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Sponsorship {
    /// The smart account pays from its own balance.
    #[default]
    SelfFunded,
    /// The relay paymaster sponsors the operation.
    Paymaster { policy_id: Option<String> },
}

/// Relay (bundler) and base RPC settings.
#[derive(Clone)]
pub struct RelayConfig {
    pub relay_url: String,
    pub rpc_url: String,
    pub wait_budget: Duration,
    pub gas_price_timeout: Duration,
    pub request_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub receipt_poll_limit: u32,
    pub sponsorship: Sponsorship,
}

// The relay URL embeds the API key.
impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = match self.relay_url.split_once("apikey=") {
            Some((base, _)) => format!("{base}apikey=<redacted>"),
            None => self.relay_url.clone(),
        };
        f.debug_struct("RelayConfig")
            .field("relay_url", &redacted)
            .field("rpc_url", &self.rpc_url)
            .field("wait_budget", &self.wait_budget)
            .field("gas_price_timeout", &self.gas_price_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("receipt_poll_interval", &self.receipt_poll_interval)
            .field("receipt_poll_limit", &self.receipt_poll_limit)
            .field("sponsorship", &self.sponsorship)
            .finish()
    }
}

impl RelayConfig {
    pub fn new(api_key: &str, chain: &ChainConfig) -> Result<Self, IntentError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(IntentError::Configuration("Missing PIMLICO_API_KEY".to_string()));
        }
        let rpc_url = chain
            .default_rpc_url()
            .ok_or_else(|| {
                IntentError::Configuration(format!("chain {} has no http rpc url", chain.name))
            })?
            .to_string();

        Ok(Self {
            relay_url: format!("{RELAY_BASE_URL}?apikey={api_key}"),
            rpc_url,
            wait_budget: DEFAULT_WAIT_BUDGET,
            gas_price_timeout: DEFAULT_GAS_PRICE_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            receipt_poll_limit: DEFAULT_RECEIPT_POLL_LIMIT,
            sponsorship: Sponsorship::SelfFunded,
        })
    }

    /// Read `PIMLICO_API_KEY` (or `NEXT_PUBLIC_PIMLICO_API_KEY`) and an optional `RPC_URL`.
    pub fn from_env(chain: &ChainConfig) -> Result<Self, IntentError> {
        Self::from_lookup(chain, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(chain: &ChainConfig, lookup: F) -> Result<Self, IntentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("NEXT_PUBLIC_PIMLICO_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .or_else(|| lookup("PIMLICO_API_KEY"))
            .unwrap_or_default();
        let mut config = Self::new(&api_key, chain)?;
        if let Some(rpc_url) = lookup("RPC_URL").filter(|v| !v.trim().is_empty()) {
            config.rpc_url = rpc_url;
        }
        Ok(config)
    }

    pub fn with_wait_budget(mut self, wait_budget: Duration) -> Self {
        self.wait_budget = wait_budget;
        self
    }

    pub fn with_sponsorship(mut self, sponsorship: Sponsorship) -> Self {
        self.sponsorship = sponsorship;
        self
    }
}

/// Intent defaults that deployments override through the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentDefaults {
    pub target_token: Address,
    pub helper_selector: u64,
    pub nonce: B256,
}

impl Default for IntentDefaults {
    fn default() -> Self {
        Self {
            target_token: DEFAULT_TARGET_TOKEN,
            helper_selector: DEFAULT_HELPER_SELECTOR,
            nonce: DEFAULT_INTENT_NONCE,
        }
    }
}

impl IntentDefaults {
    /// Read `MEME_TOKEN_ADDRESS`, `HELPER_SELECTOR` and `INTENT_NONCE`.
    pub fn from_env() -> Result<Self, IntentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, IntentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            target_token: parse_var(&lookup, "MEME_TOKEN_ADDRESS")?.unwrap_or(defaults.target_token),
            helper_selector: parse_var(&lookup, "HELPER_SELECTOR")?
                .unwrap_or(defaults.helper_selector),
            nonce: parse_var(&lookup, "INTENT_NONCE")?.unwrap_or(defaults.nonce),
        })
    }

    /// Intent parameters seeded with these defaults.
    pub fn params(&self) -> IntentParams {
        IntentParams {
            target_token: self.target_token,
            helper_selector: self.helper_selector,
            nonce: self.nonce,
            ..IntentParams::default()
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, IntentError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| IntentError::Configuration(format!("invalid {key} {raw:?}: {e}"))),
        None => Ok(None),
    }
}
