//! Gateway call encoding.

use alloy_primitives::Bytes;
use alloy_sol_types::SolCall;
use buy_intent_types::{
    abi::{BuyIntent, IIntentGateway},
    Intent,
};

use crate::errors::IntentError;

/// `submitIntent(BuyIntent)` calldata for `intent`. Pure and deterministic.
pub fn encode_intent(intent: &Intent) -> Bytes {
    IIntentGateway::submitIntentCall {
        intent: BuyIntent::from(intent),
    }
    .abi_encode()
    .into()
}

/// Inverse of [`encode_intent`].
pub fn decode_intent(data: &[u8]) -> Result<BuyIntent, IntentError> {
    IIntentGateway::submitIntentCall::abi_decode(data, true)
        .map(|call| call.intent)
        .map_err(|e| IntentError::Encoding(format!("submitIntent calldata: {e}")))
}
