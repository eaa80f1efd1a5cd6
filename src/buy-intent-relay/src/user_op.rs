//! ERC-4337 v0.7 user operation and the Safe4337Module `SafeOp` EIP-712 digest.
//!
//! The Safe4337Module validates a user operation by checking an owner signature over the
//! `SafeOp` typed-data hash. The signature field it expects is
//! `uint48 validAfter || uint48 validUntil || r || s || v`.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::Serialize;

use crate::{
    gas::GasPrice,
    rpc::{SponsorshipData, UserOperationGasEstimate},
};

/// Unpacked user operation, serialised the way bundlers expect for entry point v0.7.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    pub signature: Bytes,
}

impl UserOperation {
    /// Unsigned operation with zero gas limits; limits come from estimation or sponsorship.
    pub fn new(sender: Address, nonce: U256, call_data: Bytes, gas: GasPrice) -> Self {
        Self {
            sender,
            nonce,
            factory: None,
            factory_data: None,
            call_data,
            call_gas_limit: U256::ZERO,
            verification_gas_limit: U256::ZERO,
            pre_verification_gas: U256::ZERO,
            max_fee_per_gas: gas.max_fee_per_gas,
            max_priority_fee_per_gas: gas.max_priority_fee_per_gas,
            paymaster: None,
            paymaster_verification_gas_limit: None,
            paymaster_post_op_gas_limit: None,
            paymaster_data: None,
            signature: dummy_signature(),
        }
    }

    pub fn with_factory(mut self, factory: Address, factory_data: Bytes) -> Self {
        self.factory = Some(factory);
        self.factory_data = Some(factory_data);
        self
    }

    /// Packed `initCode`: `factory || factoryData`, empty for deployed accounts.
    pub fn init_code(&self) -> Vec<u8> {
        match (&self.factory, &self.factory_data) {
            (Some(factory), data) => {
                let data: &[u8] = data.as_ref().map(|d| &d[..]).unwrap_or_default();
                let mut out = Vec::with_capacity(20 + data.len());
                out.extend_from_slice(factory.as_slice());
                out.extend_from_slice(data);
                out
            }
            (None, _) => Vec::new(),
        }
    }

    /// Packed `paymasterAndData`:
    /// `paymaster || uint128 verificationGas || uint128 postOpGas || paymasterData`.
    pub fn paymaster_and_data(&self) -> Vec<u8> {
        let Some(paymaster) = self.paymaster else {
            return Vec::new();
        };
        let data: &[u8] = self
            .paymaster_data
            .as_ref()
            .map(|d| &d[..])
            .unwrap_or_default();
        let mut out = Vec::with_capacity(20 + 16 + 16 + data.len());
        out.extend_from_slice(paymaster.as_slice());
        out.extend_from_slice(&u128_word(self.paymaster_verification_gas_limit.unwrap_or_default()));
        out.extend_from_slice(&u128_word(self.paymaster_post_op_gas_limit.unwrap_or_default()));
        out.extend_from_slice(data);
        out
    }

    pub fn apply_gas_estimate(&mut self, estimate: &UserOperationGasEstimate) {
        self.pre_verification_gas = estimate.pre_verification_gas;
        self.verification_gas_limit = estimate.verification_gas_limit;
        self.call_gas_limit = estimate.call_gas_limit;
        if self.paymaster.is_some() {
            self.paymaster_verification_gas_limit = estimate.paymaster_verification_gas_limit;
            self.paymaster_post_op_gas_limit = estimate.paymaster_post_op_gas_limit;
        }
    }

    pub fn apply_sponsorship(&mut self, sponsorship: &SponsorshipData) {
        self.paymaster = Some(sponsorship.paymaster);
        self.paymaster_data = Some(sponsorship.paymaster_data.clone());
        self.paymaster_verification_gas_limit = Some(sponsorship.paymaster_verification_gas_limit);
        self.paymaster_post_op_gas_limit = Some(sponsorship.paymaster_post_op_gas_limit);
        self.pre_verification_gas = sponsorship.pre_verification_gas;
        self.verification_gas_limit = sponsorship.verification_gas_limit;
        self.call_gas_limit = sponsorship.call_gas_limit;
    }
}

/// Low 16 bytes of a 256-bit value (uint128 packing).
fn u128_word(value: U256) -> [u8; 16] {
    let be = value.to_be_bytes::<32>();
    let mut out = [0u8; 16];
    out.copy_from_slice(&be[16..32]);
    out
}

fn address_word(address: Address) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(address.as_slice());
    padded
}

fn u64_word(value: u64) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[24..32].copy_from_slice(&value.to_be_bytes());
    padded
}

/// Compute the `SafeOp` EIP-712 digest the owner must sign.
///
/// `validAfter`/`validUntil` are uint48 timestamps; zero means unbounded.
pub fn safe_op_digest(
    op: &UserOperation,
    chain_id: u64,
    safe_4337_module: Address,
    entry_point: Address,
    valid_after: u64,
    valid_until: u64,
) -> B256 {
    // Domain: keccak256("EIP712Domain(uint256 chainId,address verifyingContract)")
    let domain_type_hash = keccak256(b"EIP712Domain(uint256 chainId,address verifyingContract)");

    let mut domain_buf = Vec::with_capacity(32 * 3);
    domain_buf.extend_from_slice(domain_type_hash.as_slice());
    domain_buf.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    domain_buf.extend_from_slice(&address_word(safe_4337_module));
    let domain_separator = keccak256(domain_buf);

    let msg_type_hash = keccak256(
        b"SafeOp(address safe,uint256 nonce,bytes initCode,bytes callData,uint128 verificationGasLimit,uint128 callGasLimit,uint256 preVerificationGas,uint128 maxPriorityFeePerGas,uint128 maxFeePerGas,bytes paymasterAndData,uint48 validAfter,uint48 validUntil,address entryPoint)",
    );

    // Dynamic `bytes` members are hashed in place.
    let mut struct_buf = Vec::with_capacity(32 * 14);
    struct_buf.extend_from_slice(msg_type_hash.as_slice());
    struct_buf.extend_from_slice(&address_word(op.sender));
    struct_buf.extend_from_slice(&op.nonce.to_be_bytes::<32>());
    struct_buf.extend_from_slice(keccak256(op.init_code()).as_slice());
    struct_buf.extend_from_slice(keccak256(&op.call_data).as_slice());
    struct_buf.extend_from_slice(&op.verification_gas_limit.to_be_bytes::<32>());
    struct_buf.extend_from_slice(&op.call_gas_limit.to_be_bytes::<32>());
    struct_buf.extend_from_slice(&op.pre_verification_gas.to_be_bytes::<32>());
    struct_buf.extend_from_slice(&op.max_priority_fee_per_gas.to_be_bytes::<32>());
    struct_buf.extend_from_slice(&op.max_fee_per_gas.to_be_bytes::<32>());
    struct_buf.extend_from_slice(keccak256(op.paymaster_and_data()).as_slice());
    struct_buf.extend_from_slice(&u64_word(valid_after));
    struct_buf.extend_from_slice(&u64_word(valid_until));
    struct_buf.extend_from_slice(&address_word(entry_point));
    let struct_hash = keccak256(struct_buf);

    // Final digest: keccak256("\x19\x01" || domainSeparator || structHash)
    let mut final_buf = Vec::with_capacity(2 + 32 + 32);
    final_buf.extend_from_slice(b"\x19\x01");
    final_buf.extend_from_slice(domain_separator.as_slice());
    final_buf.extend_from_slice(struct_hash.as_slice());
    keccak256(final_buf)
}

/// `uint48 validAfter || uint48 validUntil || r || s || v`.
pub fn encode_safe_signature(valid_after: u64, valid_until: u64, signature: &[u8; 65]) -> Bytes {
    let mut out = Vec::with_capacity(6 + 6 + 65);
    out.extend_from_slice(&valid_after.to_be_bytes()[2..8]);
    out.extend_from_slice(&valid_until.to_be_bytes()[2..8]);
    out.extend_from_slice(signature);
    out.into()
}

/// Placeholder signature of the right shape for gas estimation.
pub fn dummy_signature() -> Bytes {
    let mut sig = [0xffu8; 65];
    sig[64] = 0x1c;
    encode_safe_signature(0, 0, &sig)
}
