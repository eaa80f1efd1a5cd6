//! Buy-intent submission through a Safe smart account and an ERC-4337 relay.
//!
//! The owner signs; a deterministic Safe account pays and calls the intent gateway; the relay
//! bundles the operation. Each submission ends as confirmed, pending or failed.

pub mod account;
pub mod chain;
pub mod codec;
pub mod config;
pub mod errors;
pub mod gas;
pub mod outcome;
pub mod pipeline;
pub mod rpc;
pub mod signer;
pub mod submitter;
pub mod user_op;

pub use account::{ResolvedAccount, SmartAccountResolver};
pub use chain::ChainConfig;
pub use codec::{decode_intent, encode_intent};
pub use config::{Deployment, IntentDefaults, RelayConfig, Sponsorship};
pub use errors::{FailureReason, IntentError, RpcFailure, SignerError, SubmitError};
pub use gas::{GasPrice, GasPriceOracle, FALLBACK_GAS_PRICE};
pub use outcome::{classify, SubmissionAttempt, SubmissionOutcome, SubmissionReport};
pub use pipeline::IntentPipeline;
pub use signer::{LocalKeySigner, SigningCapability, WalletSessionSigner};
pub use submitter::{RawOutcome, TransactionSubmitter};
