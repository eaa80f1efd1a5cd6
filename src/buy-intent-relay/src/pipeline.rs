//! End-to-end submission flow.
//!
//! 1. check the base network answers with the configured chain id
//! 2. resolve the owner's smart account
//! 3. encode the gateway call
//! 4. price gas (never fails)
//! 5. submit with a bounded wait and classify the result

use std::sync::Arc;

use buy_intent_types::Intent;
use tracing::{info, warn};

use crate::{
    account::{ResolvedAccount, SmartAccountResolver},
    chain::ChainConfig,
    codec::encode_intent,
    config::{Deployment, RelayConfig, Sponsorship},
    errors::IntentError,
    gas::GasPriceOracle,
    outcome::{classify, SubmissionAttempt, SubmissionReport},
    rpc::{BundlerRpc, ChainReader, JsonRpcEndpoint},
    signer::SigningCapability,
    submitter::TransactionSubmitter,
};

pub struct IntentPipeline {
    chain: ChainConfig,
    deployment: Deployment,
    reader: Arc<dyn ChainReader>,
    resolver: SmartAccountResolver,
    oracle: GasPriceOracle,
    submitter: TransactionSubmitter,
    self_funded: bool,
}

impl IntentPipeline {
    pub fn new(
        chain: ChainConfig,
        deployment: Deployment,
        relay: &RelayConfig,
        reader: Arc<dyn ChainReader>,
        bundler: Arc<dyn BundlerRpc>,
    ) -> Self {
        Self {
            resolver: SmartAccountResolver::new(reader.clone(), deployment.clone()),
            oracle: GasPriceOracle::new(bundler.clone()).with_timeout(relay.gas_price_timeout),
            submitter: TransactionSubmitter::new(
                reader.clone(),
                bundler,
                deployment.clone(),
                chain.id,
                relay,
            ),
            self_funded: relay.sponsorship == Sponsorship::SelfFunded,
            chain,
            deployment,
            reader,
        }
    }

    /// Pipeline over HTTP endpoints taken from `relay`.
    pub fn connect(
        chain: ChainConfig,
        deployment: Deployment,
        relay: &RelayConfig,
    ) -> Result<Self, IntentError> {
        let reader = Arc::new(JsonRpcEndpoint::connect_with_timeout(
            &relay.rpc_url,
            relay.request_timeout,
        )?);
        let bundler = Arc::new(JsonRpcEndpoint::connect_with_timeout(
            &relay.relay_url,
            relay.request_timeout,
        )?);
        Ok(Self::new(chain, deployment, relay, reader, bundler))
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    async fn ensure_chain(&self) -> Result<(), IntentError> {
        let id = self
            .reader
            .chain_id()
            .await
            .map_err(|e| IntentError::NetworkUnavailable(format!("eth_chainId: {e}")))?;
        if id != self.chain.id {
            return Err(IntentError::Configuration(format!(
                "rpc reports chain id {id}, expected {} ({})",
                self.chain.id, self.chain.name
            )));
        }
        Ok(())
    }

    /// Smart account of `signer`'s owner on the configured chain.
    pub async fn resolve_account(
        &self,
        signer: &dyn SigningCapability,
    ) -> Result<ResolvedAccount, IntentError> {
        self.ensure_chain().await?;
        self.resolver.resolve(signer, &self.chain).await
    }

    /// Run one submission attempt. Only configuration and resolution problems are errors;
    /// relay outcomes come back as a classified attempt.
    ///
    /// The signer is shared with the submission task, which may outlive this call.
    pub async fn submit(
        &self,
        signer: Arc<dyn SigningCapability>,
        intent: &Intent,
    ) -> Result<SubmissionAttempt, IntentError> {
        let account = self.resolve_account(&*signer).await?;

        let payload = encode_intent(intent);
        info!(
            gateway = %self.deployment.intent_gateway,
            token = %intent.target_token(),
            amount_out = %intent.amount_out(),
            max_eth_in = %intent.max_eth_in(),
            max_slippage_bps = intent.max_slippage_bps(),
            deadline = intent.deadline(),
            calldata_prefix = %hex::encode(&payload[..payload.len().min(10)]),
            "encoded buy intent"
        );

        if self.self_funded && account.balance < intent.max_eth_in() {
            warn!(
                account = %account.address,
                balance = %self.chain.format_native(account.balance),
                required = %self.chain.format_native(intent.max_eth_in()),
                symbol = %self.chain.native_currency.symbol,
                "smart account balance below intent value"
            );
        }

        let gas = self.oracle.get_price().await;
        let raw = self
            .submitter
            .submit(signer, &account, payload, intent.max_eth_in(), gas)
            .await;

        Ok(SubmissionAttempt {
            account_address: account.address,
            outcome: classify(raw, account.address),
        })
    }

    /// [`IntentPipeline::submit`] folded into the caller report; `Failed` becomes
    /// [`IntentError::SubmissionRejected`].
    pub async fn submit_report(
        &self,
        signer: Arc<dyn SigningCapability>,
        intent: &Intent,
    ) -> Result<SubmissionReport, IntentError> {
        self.submit(signer, intent).await?.into_report()
    }
}
