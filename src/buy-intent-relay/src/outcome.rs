//! Submission outcome classification and the caller-facing report.

use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{Address, B256};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    errors::{FailureReason, IntentError, SubmitError},
    submitter::RawOutcome,
};

/// Prefix of the placeholder handle reported for pending submissions.
pub const PENDING_HANDLE_PREFIX: &str = "pending_";

/// Lifecycle of one submission attempt. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptPhase {
    Building,
    Submitted,
    Confirmed,
    Pending,
    Failed,
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttemptPhase::Building => "building",
            AttemptPhase::Submitted => "submitted",
            AttemptPhase::Confirmed => "confirmed",
            AttemptPhase::Pending => "pending",
            AttemptPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Terminal state of a submission attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Confirmed {
        tx_hash: B256,
    },
    /// Indeterminate: the relay did not answer within the wait budget. `pseudo_handle` is a
    /// local placeholder, not a chain identifier.
    Pending {
        account_address: Address,
        pseudo_handle: String,
    },
    Failed {
        reason: FailureReason,
    },
}

impl SubmissionOutcome {
    pub fn phase(&self) -> AttemptPhase {
        match self {
            SubmissionOutcome::Confirmed { .. } => AttemptPhase::Confirmed,
            SubmissionOutcome::Pending { .. } => AttemptPhase::Pending,
            SubmissionOutcome::Failed { .. } => AttemptPhase::Failed,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SubmissionOutcome::Pending { .. })
    }
}

fn pseudo_handle() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{PENDING_HANDLE_PREFIX}{millis:x}")
}

/// Map what the submitter observed onto a terminal outcome.
pub fn classify(raw: Result<RawOutcome, SubmitError>, account_address: Address) -> SubmissionOutcome {
    let outcome = match raw {
        Ok(RawOutcome::Included(tx_hash)) => SubmissionOutcome::Confirmed { tx_hash },
        Ok(RawOutcome::TimedOut) => SubmissionOutcome::Pending {
            account_address,
            pseudo_handle: pseudo_handle(),
        },
        Err(err) => SubmissionOutcome::Failed {
            reason: err.into_reason(),
        },
    };

    match &outcome {
        SubmissionOutcome::Failed { reason } => {
            warn!(phase = %outcome.phase(), account = %account_address, %reason, "submission attempt")
        }
        _ => info!(phase = %outcome.phase(), account = %account_address, "submission attempt"),
    }
    outcome
}

/// Outcome paired with the smart account it was submitted from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionAttempt {
    pub account_address: Address,
    pub outcome: SubmissionOutcome,
}

/// Caller-facing record. `Failed` never becomes a report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub account_address: Address,
    pub is_pending: bool,
}

impl SubmissionAttempt {
    pub fn into_report(self) -> Result<SubmissionReport, IntentError> {
        match self.outcome {
            SubmissionOutcome::Confirmed { tx_hash } => Ok(SubmissionReport {
                success: true,
                tx_hash: Some(format!("{tx_hash:#x}")),
                account_address: self.account_address,
                is_pending: false,
            }),
            SubmissionOutcome::Pending { pseudo_handle, .. } => Ok(SubmissionReport {
                success: true,
                tx_hash: Some(pseudo_handle),
                account_address: self.account_address,
                is_pending: true,
            }),
            SubmissionOutcome::Failed { reason } => Err(IntentError::SubmissionRejected(reason)),
        }
    }
}
