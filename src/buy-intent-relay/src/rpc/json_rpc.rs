//! HTTP JSON-RPC endpoint backed by an ethers provider.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use ethers::providers::{Http, Provider, ProviderError, RpcError};
use reqwest::Url;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    decode_value, parse_gas_price_tiers, parse_user_operation_receipt, BundlerRpc, ChainReader,
    GasPriceTiers, SponsorshipData, UserOperationGasEstimate, UserOperationReceipt,
};
use crate::{
    config::DEFAULT_REQUEST_TIMEOUT,
    errors::{IntentError, RpcFailure},
    user_op::UserOperation,
};

/// A stateless JSON-RPC connection, safe to share between concurrent attempts.
#[derive(Clone, Debug)]
pub struct JsonRpcEndpoint {
    provider: Provider<Http>,
}

impl JsonRpcEndpoint {
    pub fn connect(url: &str) -> Result<Self, IntentError> {
        Self::connect_with_timeout(url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Every request fails with a transport error once `timeout` elapses.
    pub fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, IntentError> {
        let url = Url::parse(url)
            .map_err(|e| IntentError::Configuration(format!("invalid rpc url: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntentError::Configuration(format!("http client: {e}")))?;
        let provider = Provider::new(Http::new_with_client(url, client));
        Ok(Self { provider })
    }

    /// Raw request; the result is decoded by the caller.
    pub async fn request_value(&self, method: &str, params: Value) -> Result<Value, RpcFailure> {
        debug!(method, "json-rpc request");
        self.provider
            .request::<Value, Value>(method, params)
            .await
            .map_err(rpc_failure)
    }
}

fn rpc_failure(err: ProviderError) -> RpcFailure {
    if let Some(resp) = err.as_error_response() {
        return RpcFailure::Rejected {
            code: resp.code,
            message: resp.message.clone(),
            details: resp.data.as_ref().map(|d| match d {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        };
    }
    if let Some(serde_err) = err.as_serde_error() {
        return RpcFailure::Malformed(serde_err.to_string());
    }
    RpcFailure::Transport(err.to_string())
}

#[async_trait]
impl ChainReader for JsonRpcEndpoint {
    async fn chain_id(&self) -> Result<u64, RpcFailure> {
        let value = self.request_value("eth_chainId", json!([])).await?;
        let id: U64 = decode_value("eth_chainId", value)?;
        Ok(id.to::<u64>())
    }

    async fn balance(&self, address: Address) -> Result<U256, RpcFailure> {
        let value = self
            .request_value("eth_getBalance", json!([address, "latest"]))
            .await?;
        decode_value("eth_getBalance", value)
    }

    async fn code(&self, address: Address) -> Result<Bytes, RpcFailure> {
        let value = self
            .request_value("eth_getCode", json!([address, "latest"]))
            .await?;
        decode_value("eth_getCode", value)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcFailure> {
        let value = self
            .request_value("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        decode_value("eth_call", value)
    }
}

#[async_trait]
impl BundlerRpc for JsonRpcEndpoint {
    async fn gas_price(&self) -> Result<GasPriceTiers, RpcFailure> {
        let value = self
            .request_value("pimlico_getUserOperationGasPrice", json!([]))
            .await?;
        parse_gas_price_tiers(value)
    }

    async fn estimate_user_operation_gas(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<UserOperationGasEstimate, RpcFailure> {
        let value = self
            .request_value("eth_estimateUserOperationGas", json!([op, entry_point]))
            .await?;
        decode_value("eth_estimateUserOperationGas", value)
    }

    async fn sponsor_user_operation(
        &self,
        op: &UserOperation,
        entry_point: Address,
        policy_id: Option<&str>,
    ) -> Result<SponsorshipData, RpcFailure> {
        let params = match policy_id {
            Some(id) => json!([op, entry_point, { "sponsorshipPolicyId": id }]),
            None => json!([op, entry_point]),
        };
        let value = self.request_value("pm_sponsorUserOperation", params).await?;
        decode_value("pm_sponsorUserOperation", value)
    }

    async fn send_user_operation(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<B256, RpcFailure> {
        let value = self
            .request_value("eth_sendUserOperation", json!([op, entry_point]))
            .await?;
        decode_value("eth_sendUserOperation", value)
    }

    async fn user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>, RpcFailure> {
        let value = self
            .request_value("eth_getUserOperationReceipt", json!([user_op_hash]))
            .await?;
        parse_user_operation_receipt(value)
    }
}
