//! Shared types for buy-intent submission (off-chain tooling + gateway ABI).
//!
//! The intent record and the `sol!` bindings live here so the relay library and the CLI agree on
//! the exact wire layout expected by the intent gateway.

pub mod abi;
pub mod constants;
pub mod intent;

pub use intent::{parse_amount, Intent, IntentParams, IntentValidationError};
