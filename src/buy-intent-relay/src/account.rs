//! Safe smart account resolution.
//!
//! The account is a Safe v1.4.1 proxy with the 4337 module enabled. Its address is the CREATE2
//! address the proxy factory would deploy for `(owner, salt nonce)`, so it is known before the
//! account exists on chain.

use std::sync::Arc;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use buy_intent_types::{
    abi::{IMultiSend, ISafe, ISafeModuleSetup, ISafeProxyFactory},
    constants::SAFE_VERSION,
};
use serde::Serialize;
use tracing::info;

use crate::{
    chain::ChainConfig,
    config::Deployment,
    errors::IntentError,
    rpc::ChainReader,
    signer::SigningCapability,
};

/// MultiSend operation type for a delegate call.
const OPERATION_DELEGATECALL: u8 = 1;

/// One packed MultiSend entry: `operation(1) || to(20) || value(32) || dataLength(32) || data`.
pub fn multi_send_entry(operation: u8, to: Address, value: U256, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 20 + 32 + 32 + data.len());
    out.push(operation);
    out.extend_from_slice(to.as_slice());
    out.extend_from_slice(&value.to_be_bytes::<32>());
    out.extend_from_slice(&U256::from(data.len()).to_be_bytes::<32>());
    out.extend_from_slice(data);
    out
}

/// `Safe.setup` initializer: single owner, threshold 1, 4337 module installed as fallback
/// handler and enabled by delegate-calling the module setup through MultiSend.
pub fn safe_initializer(owner: Address, deployment: &Deployment) -> Bytes {
    let enable_modules = ISafeModuleSetup::enableModulesCall {
        modules: vec![deployment.safe_4337_module],
    }
    .abi_encode();
    let setup_batch = IMultiSend::multiSendCall {
        transactions: multi_send_entry(
            OPERATION_DELEGATECALL,
            deployment.safe_module_setup,
            U256::ZERO,
            &enable_modules,
        )
        .into(),
    }
    .abi_encode();

    ISafe::setupCall {
        _owners: vec![owner],
        _threshold: U256::from(1u64),
        to: deployment.multi_send,
        data: setup_batch.into(),
        fallbackHandler: deployment.safe_4337_module,
        paymentToken: Address::ZERO,
        payment: U256::ZERO,
        paymentReceiver: Address::ZERO,
    }
    .abi_encode()
    .into()
}

/// `createProxyWithNonce` calldata, used as `factoryData` while the account is undeployed.
pub fn factory_data(owner: Address, deployment: &Deployment) -> Bytes {
    ISafeProxyFactory::createProxyWithNonceCall {
        _singleton: deployment.safe_singleton,
        initializer: safe_initializer(owner, deployment),
        saltNonce: deployment.salt_nonce,
    }
    .abi_encode()
    .into()
}

/// CREATE2 address of the owner's Safe proxy.
///
/// `salt = keccak256(keccak256(initializer) || saltNonce)`,
/// `initCodeHash = keccak256(proxyCreationCode || uint256(singleton))`.
pub fn derive_account_address(
    owner: Address,
    proxy_creation_code: &[u8],
    deployment: &Deployment,
) -> Address {
    let initializer = safe_initializer(owner, deployment);

    let mut salt_buf = Vec::with_capacity(64);
    salt_buf.extend_from_slice(keccak256(&initializer).as_slice());
    salt_buf.extend_from_slice(&deployment.salt_nonce.to_be_bytes::<32>());
    let salt = keccak256(salt_buf);

    let mut init_code = Vec::with_capacity(proxy_creation_code.len() + 32);
    init_code.extend_from_slice(proxy_creation_code);
    let mut singleton_padded = [0u8; 32];
    singleton_padded[12..32].copy_from_slice(deployment.safe_singleton.as_slice());
    init_code.extend_from_slice(&singleton_padded);
    let init_code_hash: B256 = keccak256(init_code);

    deployment.proxy_factory.create2(salt.0, init_code_hash.0)
}

/// Smart account bound to an owner, observed at resolution time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAccount {
    pub owner: Address,
    pub address: Address,
    pub balance: U256,
    pub deployed: bool,
}

pub struct SmartAccountResolver {
    reader: Arc<dyn ChainReader>,
    deployment: Deployment,
}

impl SmartAccountResolver {
    pub fn new(reader: Arc<dyn ChainReader>, deployment: Deployment) -> Self {
        Self { reader, deployment }
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    async fn proxy_creation_code(&self) -> Result<Bytes, IntentError> {
        let data = ISafeProxyFactory::proxyCreationCodeCall {}.abi_encode();
        let raw = self
            .reader
            .call(self.deployment.proxy_factory, data.into())
            .await
            .map_err(|e| IntentError::NetworkUnavailable(format!("proxyCreationCode: {e}")))?;
        let decoded = ISafeProxyFactory::proxyCreationCodeCall::abi_decode_returns(&raw, true)
            .map_err(|e| IntentError::Encoding(format!("proxyCreationCode return: {e}")))?;
        if decoded._0.is_empty() {
            return Err(IntentError::Configuration(format!(
                "no Safe proxy factory at {}",
                self.deployment.proxy_factory
            )));
        }
        Ok(decoded._0)
    }

    /// Deterministic for a given owner and deployment; balance and deployment status are read
    /// fresh on every call.
    pub async fn resolve(
        &self,
        signer: &dyn SigningCapability,
        chain: &ChainConfig,
    ) -> Result<ResolvedAccount, IntentError> {
        let owner = signer.address();
        let creation_code = self.proxy_creation_code().await?;
        let address = derive_account_address(owner, &creation_code, &self.deployment);

        let (balance, code) = tokio::try_join!(
            async {
                self.reader
                    .balance(address)
                    .await
                    .map_err(|e| IntentError::NetworkUnavailable(format!("balance of {address}: {e}")))
            },
            async {
                self.reader
                    .code(address)
                    .await
                    .map_err(|e| IntentError::NetworkUnavailable(format!("code at {address}: {e}")))
            },
        )?;

        let account = ResolvedAccount {
            owner,
            address,
            balance,
            deployed: !code.is_empty(),
        };
        let explorer = chain.address_url(address).unwrap_or_default();
        info!(
            %owner,
            account = %address,
            balance = %chain.format_native(balance),
            deployed = account.deployed,
            safe_version = SAFE_VERSION,
            %explorer,
            "resolved smart account"
        );
        Ok(account)
    }
}
