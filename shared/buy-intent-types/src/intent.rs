use alloy_primitives::{
    utils::{parse_ether, UnitsError},
    Address, B256, U256,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    abi::BuyIntent,
    constants::{
        DEFAULT_AMOUNT_OUT_WEI, DEFAULT_DEADLINE_WINDOW_SECS, DEFAULT_HELPER_SELECTOR,
        DEFAULT_INTENT_NONCE, DEFAULT_MAX_ETH_IN_WEI, DEFAULT_MAX_SLIPPAGE_BPS,
        DEFAULT_TARGET_TOKEN, MAX_SLIPPAGE_BPS, SOURCE_CHAIN_SELECTOR,
    },
};

/// Reasons an intent is refused before it reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentValidationError {
    #[error("amountOut must be greater than zero")]
    ZeroAmountOut,
    #[error("maxEthIn must be greater than zero")]
    ZeroMaxEthIn,
    #[error("maxSlippageBps {0} exceeds {MAX_SLIPPAGE_BPS}")]
    SlippageOutOfRange(u32),
    #[error("deadline {deadline} is not after current time {now}")]
    DeadlineElapsed { deadline: u64, now: u64 },
    #[error("malformed amount {input:?}: {reason}")]
    MalformedAmount { input: String, reason: String },
}

/// Parse a decimal native-currency amount ("0.1") into 18-decimal base units.
pub fn parse_amount(input: &str) -> Result<U256, IntentValidationError> {
    parse_ether(input.trim()).map_err(|e: UnitsError| IntentValidationError::MalformedAmount {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Caller-facing intent parameters; every field has a literal default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentParams {
    pub target_token: Address,
    pub amount_out: U256,
    pub max_eth_in: U256,
    pub max_slippage_bps: u32,
    pub helper_selector: u64,
    /// Absolute expiry; `None` means `now + 600s`.
    pub deadline: Option<u64>,
    pub nonce: B256,
}

impl Default for IntentParams {
    fn default() -> Self {
        Self {
            target_token: DEFAULT_TARGET_TOKEN,
            amount_out: DEFAULT_AMOUNT_OUT_WEI,
            max_eth_in: DEFAULT_MAX_ETH_IN_WEI,
            max_slippage_bps: DEFAULT_MAX_SLIPPAGE_BPS,
            helper_selector: DEFAULT_HELPER_SELECTOR,
            deadline: None,
            nonce: DEFAULT_INTENT_NONCE,
        }
    }
}

/// Validated buy intent. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    source_chain_selector: u64,
    target_token: Address,
    amount_out: U256,
    max_eth_in: U256,
    max_slippage_bps: u32,
    helper_selector: u64,
    deadline: u64,
    nonce: B256,
}

impl Intent {
    /// Validate `params` against the wall clock `now` (unix seconds).
    pub fn new(params: IntentParams, now: u64) -> Result<Self, IntentValidationError> {
        if params.amount_out.is_zero() {
            return Err(IntentValidationError::ZeroAmountOut);
        }
        if params.max_eth_in.is_zero() {
            return Err(IntentValidationError::ZeroMaxEthIn);
        }
        if params.max_slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(IntentValidationError::SlippageOutOfRange(params.max_slippage_bps));
        }
        let deadline = params
            .deadline
            .unwrap_or_else(|| now.saturating_add(DEFAULT_DEADLINE_WINDOW_SECS));
        if deadline <= now {
            return Err(IntentValidationError::DeadlineElapsed { deadline, now });
        }

        Ok(Self {
            source_chain_selector: SOURCE_CHAIN_SELECTOR,
            target_token: params.target_token,
            amount_out: params.amount_out,
            max_eth_in: params.max_eth_in,
            max_slippage_bps: params.max_slippage_bps,
            helper_selector: params.helper_selector,
            deadline,
            nonce: params.nonce,
        })
    }

    pub fn source_chain_selector(&self) -> u64 {
        self.source_chain_selector
    }

    pub fn target_token(&self) -> Address {
        self.target_token
    }

    pub fn amount_out(&self) -> U256 {
        self.amount_out
    }

    /// Also the value attached to the gateway call.
    pub fn max_eth_in(&self) -> U256 {
        self.max_eth_in
    }

    pub fn max_slippage_bps(&self) -> u32 {
        self.max_slippage_bps
    }

    pub fn helper_selector(&self) -> u64 {
        self.helper_selector
    }

    pub fn deadline(&self) -> u64 {
        self.deadline
    }

    pub fn nonce(&self) -> B256 {
        self.nonce
    }
}

impl From<&Intent> for BuyIntent {
    fn from(intent: &Intent) -> Self {
        BuyIntent {
            sourceChainSelector: intent.source_chain_selector,
            memeToken: intent.target_token,
            amountOut: intent.amount_out,
            maxEthIn: intent.max_eth_in,
            maxSlippageBps: U256::from(intent.max_slippage_bps),
            helperSelector: intent.helper_selector,
            deadline: U256::from(intent.deadline),
            nonce: intent.nonce,
        }
    }
}
