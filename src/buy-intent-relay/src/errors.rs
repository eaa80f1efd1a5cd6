use std::fmt;

use alloy_primitives::B256;
use buy_intent_types::IntentValidationError;
use serde::Serialize;
use thiserror::Error;

/// Failure of a single JSON-RPC round trip (base chain or relay).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcFailure {
    #[error("transport error: {0}")]
    Transport(String),
    /// Structured JSON-RPC error returned by the endpoint.
    #[error("{message}")]
    Rejected {
        code: i64,
        message: String,
        details: Option<String>,
    },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("method not supported: {0}")]
    Unsupported(&'static str),
}

/// Errors raised by a signing capability.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("wallet session error: {0}")]
    Session(String),
}

/// Human-readable reason carried by a failed submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReason {
    pub short_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{} Details: {}", self.short_message, details),
            None => f.write_str(&self.short_message),
        }
    }
}

impl From<RpcFailure> for FailureReason {
    fn from(err: RpcFailure) -> Self {
        match err {
            RpcFailure::Rejected { message, details, .. } => FailureReason {
                short_message: message,
                details,
            },
            RpcFailure::Transport(details) => FailureReason {
                short_message: "relay unreachable".to_string(),
                details: Some(details),
            },
            RpcFailure::Malformed(details) => FailureReason {
                short_message: "malformed relay response".to_string(),
                details: Some(details),
            },
            RpcFailure::Unsupported(method) => FailureReason {
                short_message: format!("relay does not support {method}"),
                details: None,
            },
        }
    }
}

/// Errors surfaced to the caller of the pipeline.
#[derive(Debug, Error)]
pub enum IntentError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("invalid intent: {0}")]
    InvalidIntent(#[from] IntentValidationError),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("{0}")]
    SubmissionRejected(FailureReason),
}

/// Errors raised while building or delivering a user operation.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Rejected(FailureReason),

    #[error("network error: {0}")]
    Network(String),

    #[error("signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("no receipt for user operation {user_op_hash} after {polls} polls")]
    ReceiptUnavailable { user_op_hash: B256, polls: u32 },

    #[error("submission task aborted: {0}")]
    Aborted(String),
}

impl From<RpcFailure> for SubmitError {
    fn from(err: RpcFailure) -> Self {
        match err {
            RpcFailure::Rejected { .. } | RpcFailure::Unsupported(_) => {
                SubmitError::Rejected(err.into())
            }
            other => SubmitError::Network(other.to_string()),
        }
    }
}

impl SubmitError {
    pub fn into_reason(self) -> FailureReason {
        match self {
            SubmitError::Rejected(reason) => reason,
            SubmitError::Network(details) => FailureReason {
                short_message: "network error".to_string(),
                details: Some(details),
            },
            SubmitError::Signer(err) => FailureReason {
                short_message: "owner did not authorize the user operation".to_string(),
                details: Some(err.to_string()),
            },
            other => FailureReason {
                short_message: other.to_string(),
                details: None,
            },
        }
    }
}
