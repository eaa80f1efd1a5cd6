#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use buy_intent_relay::{
    errors::RpcFailure,
    gas::GasPrice,
    rpc::{
        BundlerRpc, ChainReader, GasPriceTiers, IncludedTransaction, SponsorshipData,
        UserOperationGasEstimate, UserOperationReceipt,
    },
    user_op::UserOperation,
    ChainConfig, Deployment, IntentPipeline, LocalKeySigner, RelayConfig, SigningCapability,
    Sponsorship,
};
use buy_intent_types::{
    abi::{IEntryPoint, ISafeProxyFactory},
    Intent, IntentParams,
};

pub const NOW: u64 = 1_700_000_000;
pub const OWNER_KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";

/// Stand-in for the Safe proxy creation code returned by the factory.
pub const PROXY_CREATION_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52];

pub fn relay_tx_hash() -> B256 {
    B256::repeat_byte(0x71)
}

pub fn gas_tiers() -> GasPriceTiers {
    let tier = |fee: u64| GasPrice {
        max_fee_per_gas: U256::from(fee),
        max_priority_fee_per_gas: U256::from(fee / 2),
    };
    GasPriceTiers {
        slow: tier(1_000_000_000),
        standard: tier(2_000_000_000),
        fast: tier(3_000_000_000),
    }
}

pub fn gas_estimate() -> UserOperationGasEstimate {
    UserOperationGasEstimate {
        pre_verification_gas: U256::from(60_000u64),
        verification_gas_limit: U256::from(500_000u64),
        call_gas_limit: U256::from(150_000u64),
        paymaster_verification_gas_limit: None,
        paymaster_post_op_gas_limit: None,
    }
}

pub struct MockChain {
    pub chain_id: Result<u64, RpcFailure>,
    pub balance: Result<U256, RpcFailure>,
    pub code: Bytes,
    pub nonce: U256,
    pub calls: AtomicUsize,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            chain_id: Ok(ChainConfig::monad_testnet().id),
            balance: Ok(U256::from(500_000_000_000_000_000u128)),
            code: Bytes::new(),
            nonce: U256::ZERO,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn chain_id(&self) -> Result<u64, RpcFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.chain_id.clone()
    }

    async fn balance(&self, _address: Address) -> Result<U256, RpcFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.balance.clone()
    }

    async fn code(&self, _address: Address) -> Result<Bytes, RpcFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.code.clone())
    }

    async fn call(&self, _to: Address, data: Bytes) -> Result<Bytes, RpcFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let selector = data.get(..4).unwrap_or_default();
        if selector == ISafeProxyFactory::proxyCreationCodeCall::SELECTOR.as_slice() {
            let code = Bytes::from_static(PROXY_CREATION_CODE);
            return Ok(ISafeProxyFactory::proxyCreationCodeCall::abi_encode_returns(&(code,)).into());
        }
        if selector == IEntryPoint::getNonceCall::SELECTOR.as_slice() {
            return Ok(IEntryPoint::getNonceCall::abi_encode_returns(&(self.nonce,)).into());
        }
        Err(RpcFailure::Rejected {
            code: 3,
            message: "execution reverted".to_string(),
            details: None,
        })
    }
}

pub struct MockBundler {
    pub gas_price: Result<GasPriceTiers, RpcFailure>,
    pub gas_price_delay: Duration,
    pub estimate: Result<UserOperationGasEstimate, RpcFailure>,
    pub estimate_delay: Duration,
    pub send_delay: Duration,
    pub send: Result<B256, RpcFailure>,
    pub gas_price_calls: AtomicUsize,
    pub estimate_calls: AtomicUsize,
    pub sponsor_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub delivered: AtomicBool,
    pub sent_ops: Mutex<Vec<UserOperation>>,
}

impl Default for MockBundler {
    fn default() -> Self {
        Self {
            gas_price: Ok(gas_tiers()),
            gas_price_delay: Duration::ZERO,
            estimate: Ok(gas_estimate()),
            estimate_delay: Duration::ZERO,
            send_delay: Duration::from_secs(2),
            send: Ok(B256::repeat_byte(0x0b)),
            gas_price_calls: AtomicUsize::new(0),
            estimate_calls: AtomicUsize::new(0),
            sponsor_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            delivered: AtomicBool::new(false),
            sent_ops: Mutex::new(Vec::new()),
        }
    }
}

impl MockBundler {
    pub fn total_calls(&self) -> usize {
        self.gas_price_calls.load(Ordering::SeqCst)
            + self.estimate_calls.load(Ordering::SeqCst)
            + self.sponsor_calls.load(Ordering::SeqCst)
            + self.send_calls.load(Ordering::SeqCst)
    }

    pub fn last_op(&self) -> UserOperation {
        self.sent_ops
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no user operation was sent")
    }
}

#[async_trait]
impl BundlerRpc for MockBundler {
    async fn gas_price(&self) -> Result<GasPriceTiers, RpcFailure> {
        self.gas_price_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.gas_price_delay).await;
        self.gas_price.clone()
    }

    async fn estimate_user_operation_gas(
        &self,
        _op: &UserOperation,
        _entry_point: Address,
    ) -> Result<UserOperationGasEstimate, RpcFailure> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.estimate_delay).await;
        self.estimate.clone()
    }

    async fn sponsor_user_operation(
        &self,
        _op: &UserOperation,
        _entry_point: Address,
        _policy_id: Option<&str>,
    ) -> Result<SponsorshipData, RpcFailure> {
        self.sponsor_calls.fetch_add(1, Ordering::SeqCst);
        let estimate = gas_estimate();
        Ok(SponsorshipData {
            paymaster: Address::repeat_byte(0x99),
            paymaster_data: Bytes::from(vec![0xaa; 8]),
            paymaster_verification_gas_limit: U256::from(40_000u64),
            paymaster_post_op_gas_limit: U256::from(1u64),
            pre_verification_gas: estimate.pre_verification_gas,
            verification_gas_limit: estimate.verification_gas_limit,
            call_gas_limit: estimate.call_gas_limit,
        })
    }

    async fn send_user_operation(
        &self,
        op: &UserOperation,
        _entry_point: Address,
    ) -> Result<B256, RpcFailure> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        self.sent_ops.lock().unwrap().push(op.clone());
        tokio::time::sleep(self.send_delay).await;
        let result = self.send.clone();
        self.delivered.store(true, Ordering::SeqCst);
        result
    }

    async fn user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>, RpcFailure> {
        Ok(Some(UserOperationReceipt {
            user_op_hash,
            success: true,
            reason: None,
            receipt: IncludedTransaction {
                transaction_hash: relay_tx_hash(),
            },
        }))
    }
}

pub fn relay_config(sponsorship: Sponsorship) -> RelayConfig {
    RelayConfig::new("test-key", &ChainConfig::monad_testnet())
        .expect("relay config")
        .with_sponsorship(sponsorship)
}

pub fn pipeline(chain: Arc<MockChain>, bundler: Arc<MockBundler>) -> IntentPipeline {
    pipeline_with(chain, bundler, Sponsorship::SelfFunded)
}

pub fn pipeline_with(
    chain: Arc<MockChain>,
    bundler: Arc<MockBundler>,
    sponsorship: Sponsorship,
) -> IntentPipeline {
    IntentPipeline::new(
        ChainConfig::monad_testnet(),
        Deployment::default(),
        &relay_config(sponsorship),
        chain,
        bundler,
    )
}

pub fn owner() -> Arc<dyn SigningCapability> {
    Arc::new(LocalKeySigner::from_hex(OWNER_KEY).expect("test key"))
}

pub fn default_intent() -> Intent {
    Intent::new(IntentParams::default(), NOW).expect("default intent")
}
