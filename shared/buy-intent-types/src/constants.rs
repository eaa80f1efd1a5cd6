//! Deployment constants mirrored from the Monad testnet intent gateway and the Safe v1.4.1 /
//! ERC-4337 v0.7 contracts it is reached through.

use alloy_primitives::{address, b256, Address, B256, U256};

/// Chain selector of the originating network (Monad testnet).
pub const SOURCE_CHAIN_SELECTOR: u64 = 2_183_018_362_218_727_504;

/// Intent gateway receiving `submitIntent`.
pub const INTENT_GATEWAY: Address = address!("E7fa3Ef3674a5097240641C9968976E9985c9dDf");

pub const DEFAULT_TARGET_TOKEN: Address = address!("d00ae08403B9bbb9124bB305C09058E32C39A48c");
pub const DEFAULT_HELPER_SELECTOR: u64 = 16_015_286_601_757_825_753;
pub const DEFAULT_INTENT_NONCE: B256 =
    b256!("000000000000000000000000000000000000000000000000000000000000abcd");

pub const DEFAULT_AMOUNT_OUT: &str = "1";
pub const DEFAULT_MAX_ETH_IN: &str = "0.1";
/// [`DEFAULT_AMOUNT_OUT`] in 18-decimal base units.
pub const DEFAULT_AMOUNT_OUT_WEI: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);
/// [`DEFAULT_MAX_ETH_IN`] in 18-decimal base units.
pub const DEFAULT_MAX_ETH_IN_WEI: U256 = U256::from_limbs([100_000_000_000_000_000, 0, 0, 0]);
pub const DEFAULT_MAX_SLIPPAGE_BPS: u32 = 200;
pub const DEFAULT_DEADLINE_WINDOW_SECS: u64 = 600;

/// 100% in basis points.
pub const MAX_SLIPPAGE_BPS: u32 = 10_000;

// ERC-4337 entry point v0.7.
pub const ENTRY_POINT_V07: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");

// Safe v1.4.1 deployment used for smart accounts.
pub const SAFE_VERSION: &str = "1.4.1";
pub const SAFE_PROXY_FACTORY: Address = address!("4e1DCf7AD4e460CfD30791CCC4F9c8a4f820ec67");
pub const SAFE_SINGLETON: Address = address!("41675C099F32341bf84BFc5382aF534df5C7461a");
/// MultiSend used to delegate-call the module setup from `Safe.setup`.
pub const SAFE_MULTI_SEND: Address = address!("38869bf66a61cF6bDB996A6aE40D5853Fd43B526");

// Safe4337Module v0.3.0 (entry point v0.7) and its module-enabling setup helper.
pub const SAFE_4337_MODULE: Address = address!("75cf11467937ce3F2f357CE24ffc3DBF8fD5c226");
pub const SAFE_MODULE_SETUP: Address = address!("2dd68b007B46fBe91B9A7c3EDa5A7a1063cB5b47");

/// Fixed salt nonce: the same owner always maps to the same account.
pub const ACCOUNT_SALT_NONCE: U256 = U256::ZERO;
