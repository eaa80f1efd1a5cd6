//! User operation construction and bounded-wait delivery.
//!
//! The whole attempt (nonce, gas estimation or sponsorship, signing, send and receipt polling)
//! runs on its own task. The caller only waits up to the configured budget; when the budget
//! elapses the task is left running and the attempt reports [`RawOutcome::TimedOut`].

use std::{sync::Arc, time::Duration};

use alloy_primitives::{aliases::U192, Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use buy_intent_types::abi::{IEntryPoint, ISafe4337Module};
use tracing::{debug, info, warn};

use crate::{
    account::{factory_data, ResolvedAccount},
    config::{Deployment, RelayConfig, Sponsorship},
    errors::{FailureReason, SubmitError},
    gas::GasPrice,
    outcome::AttemptPhase,
    rpc::{BundlerRpc, ChainReader},
    signer::SigningCapability,
    user_op::{encode_safe_signature, safe_op_digest, UserOperation},
};

/// `Safe4337Module.executeUserOp` operation type for a plain call.
const OPERATION_CALL: u8 = 0;

/// What the submitter observed before it stopped waiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawOutcome {
    /// Included on chain under this transaction hash.
    Included(B256),
    /// The wait budget elapsed; delivery continues in the background.
    TimedOut,
}

#[derive(Clone)]
pub struct TransactionSubmitter {
    reader: Arc<dyn ChainReader>,
    bundler: Arc<dyn BundlerRpc>,
    deployment: Deployment,
    chain_id: u64,
    wait_budget: Duration,
    poll_interval: Duration,
    poll_limit: u32,
    sponsorship: Sponsorship,
}

impl TransactionSubmitter {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        bundler: Arc<dyn BundlerRpc>,
        deployment: Deployment,
        chain_id: u64,
        relay: &RelayConfig,
    ) -> Self {
        Self {
            reader,
            bundler,
            deployment,
            chain_id,
            wait_budget: relay.wait_budget,
            poll_interval: relay.receipt_poll_interval,
            poll_limit: relay.receipt_poll_limit,
            sponsorship: relay.sponsorship.clone(),
        }
    }

    /// Build, authorise and deliver one user operation calling the intent gateway with
    /// `value` and `payload`. The wait budget starts before the first relay call.
    pub async fn submit(
        &self,
        signer: Arc<dyn SigningCapability>,
        account: &ResolvedAccount,
        payload: Bytes,
        value: U256,
        gas: GasPrice,
    ) -> Result<RawOutcome, SubmitError> {
        info!(phase = %AttemptPhase::Building, account = %account.address, "submission attempt");
        let sender = account.address;
        let worker = self.clone();
        let account = account.clone();
        let mut handle = tokio::spawn(async move {
            let result = worker
                .build_and_deliver(&*signer, &account, payload, value, gas)
                .await;
            if let Err(err) = &result {
                warn!(account = %sender, %err, "user operation delivery failed");
            }
            result
        });

        match tokio::time::timeout(self.wait_budget, &mut handle).await {
            Ok(Ok(result)) => result.map(RawOutcome::Included),
            Ok(Err(join_err)) => Err(SubmitError::Aborted(join_err.to_string())),
            Err(_) => {
                info!(
                    account = %sender,
                    wait_budget_ms = self.wait_budget.as_millis() as u64,
                    "stopped waiting for relay; submission continues in background"
                );
                // Dropping a JoinHandle detaches the task.
                drop(handle);
                Ok(RawOutcome::TimedOut)
            }
        }
    }

    async fn build_and_deliver(
        &self,
        signer: &dyn SigningCapability,
        account: &ResolvedAccount,
        payload: Bytes,
        value: U256,
        gas: GasPrice,
    ) -> Result<B256, SubmitError> {
        let op = self.build(signer, account, payload, value, gas).await?;
        info!(
            phase = %AttemptPhase::Submitted,
            account = %account.address,
            nonce = %op.nonce,
            deploys_account = op.factory.is_some(),
            "submission attempt"
        );
        self.deliver(&op).await
    }

    async fn account_nonce(&self, sender: Address) -> Result<U256, SubmitError> {
        let data = IEntryPoint::getNonceCall {
            sender,
            key: U192::ZERO,
        }
        .abi_encode();
        let raw = self
            .reader
            .call(self.deployment.entry_point, data.into())
            .await
            .map_err(|e| SubmitError::Network(format!("getNonce: {e}")))?;
        IEntryPoint::getNonceCall::abi_decode_returns(&raw, true)
            .map(|ret| ret.nonce)
            .map_err(|e| SubmitError::Network(format!("getNonce return: {e}")))
    }

    /// Signed user operation ready for `eth_sendUserOperation`.
    pub async fn build(
        &self,
        signer: &dyn SigningCapability,
        account: &ResolvedAccount,
        payload: Bytes,
        value: U256,
        gas: GasPrice,
    ) -> Result<UserOperation, SubmitError> {
        let nonce = self.account_nonce(account.address).await?;
        let call_data = ISafe4337Module::executeUserOpCall {
            to: self.deployment.intent_gateway,
            value,
            data: payload,
            operation: OPERATION_CALL,
        }
        .abi_encode();

        let mut op = UserOperation::new(account.address, nonce, call_data.into(), gas);
        if !account.deployed {
            op = op.with_factory(
                self.deployment.proxy_factory,
                factory_data(account.owner, &self.deployment),
            );
        }

        let entry_point = self.deployment.entry_point;
        match &self.sponsorship {
            Sponsorship::SelfFunded => {
                let estimate = self
                    .bundler
                    .estimate_user_operation_gas(&op, entry_point)
                    .await?;
                op.apply_gas_estimate(&estimate);
            }
            Sponsorship::Paymaster { policy_id } => {
                let sponsorship = self
                    .bundler
                    .sponsor_user_operation(&op, entry_point, policy_id.as_deref())
                    .await?;
                debug!(paymaster = %sponsorship.paymaster, "operation sponsored");
                op.apply_sponsorship(&sponsorship);
            }
        }

        let digest = safe_op_digest(
            &op,
            self.chain_id,
            self.deployment.safe_4337_module,
            entry_point,
            0,
            0,
        );
        let signature = signer.authorize(digest).await?;
        op.signature = encode_safe_signature(0, 0, &signature);
        Ok(op)
    }

    /// Send the operation and poll for its receipt. Returns the including transaction hash.
    async fn deliver(&self, op: &UserOperation) -> Result<B256, SubmitError> {
        let user_op_hash = self
            .bundler
            .send_user_operation(op, self.deployment.entry_point)
            .await?;
        debug!(%user_op_hash, "user operation accepted by relay");

        for _ in 0..self.poll_limit {
            match self.bundler.user_operation_receipt(user_op_hash).await {
                Ok(Some(receipt)) if receipt.success => {
                    let tx_hash = receipt.receipt.transaction_hash;
                    info!(%user_op_hash, %tx_hash, "user operation included");
                    return Ok(tx_hash);
                }
                Ok(Some(receipt)) => {
                    return Err(SubmitError::Rejected(FailureReason {
                        short_message: "user operation reverted".to_string(),
                        details: receipt.reason.or_else(|| {
                            Some(format!("transaction {:#x}", receipt.receipt.transaction_hash))
                        }),
                    }));
                }
                Ok(None) => {}
                Err(err) => warn!(%user_op_hash, %err, "receipt poll failed"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(SubmitError::ReceiptUnavailable {
            user_op_hash,
            polls: self.poll_limit,
        })
    }
}
