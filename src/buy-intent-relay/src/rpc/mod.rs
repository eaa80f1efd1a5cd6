//! Network seams: the base chain reader and the relay (bundler) client.
//!
//! Components only see these traits; `JsonRpcEndpoint` implements both over HTTP, tests plug in
//! in-process fakes.

pub mod json_rpc;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{errors::RpcFailure, gas::GasPrice, user_op::UserOperation};

pub use json_rpc::JsonRpcEndpoint;

/// Read-only access to the base network.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn chain_id(&self) -> Result<u64, RpcFailure>;

    async fn balance(&self, address: Address) -> Result<U256, RpcFailure>;

    async fn code(&self, address: Address) -> Result<Bytes, RpcFailure>;

    /// `eth_call` against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcFailure>;
}

/// Relay / bundler network.
#[async_trait]
pub trait BundlerRpc: Send + Sync {
    async fn gas_price(&self) -> Result<GasPriceTiers, RpcFailure>;

    async fn estimate_user_operation_gas(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<UserOperationGasEstimate, RpcFailure>;

    async fn sponsor_user_operation(
        &self,
        _op: &UserOperation,
        _entry_point: Address,
        _policy_id: Option<&str>,
    ) -> Result<SponsorshipData, RpcFailure> {
        Err(RpcFailure::Unsupported("pm_sponsorUserOperation"))
    }

    /// Returns the user operation hash.
    async fn send_user_operation(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<B256, RpcFailure>;

    async fn user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>, RpcFailure>;
}

/// `pimlico_getUserOperationGasPrice` result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPriceTiers {
    pub slow: GasPrice,
    pub standard: GasPrice,
    pub fast: GasPrice,
}

/// `eth_estimateUserOperationGas` result (entry point v0.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationGasEstimate {
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
    #[serde(default)]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(default)]
    pub paymaster_post_op_gas_limit: Option<U256>,
}

/// `pm_sponsorUserOperation` result (entry point v0.7).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipData {
    pub paymaster: Address,
    pub paymaster_data: Bytes,
    pub paymaster_verification_gas_limit: U256,
    pub paymaster_post_op_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludedTransaction {
    pub transaction_hash: B256,
}

/// `eth_getUserOperationReceipt` result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: B256,
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
    pub receipt: IncludedTransaction,
}

pub(crate) fn decode_value<T: serde::de::DeserializeOwned>(
    method: &str,
    value: Value,
) -> Result<T, RpcFailure> {
    serde_json::from_value(value).map_err(|e| RpcFailure::Malformed(format!("{method}: {e}")))
}

/// Decode a gas price response; anything short of three well-formed tiers is malformed.
pub fn parse_gas_price_tiers(value: Value) -> Result<GasPriceTiers, RpcFailure> {
    decode_value("pimlico_getUserOperationGasPrice", value)
}

/// `null` means "not included yet".
pub fn parse_user_operation_receipt(
    value: Value,
) -> Result<Option<UserOperationReceipt>, RpcFailure> {
    if value.is_null() {
        return Ok(None);
    }
    decode_value("eth_getUserOperationReceipt", value).map(Some)
}
