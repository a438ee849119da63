use scholar_types::{SettleError, SubmitError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::ActionState;

/// Message shown when the remote outcome of an action cannot be known.
pub const UNKNOWN_OUTCOME: &str = "unknown outcome, verify manually";

/// Why an action ended in `Failed`. Stored on the record, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionError {
    #[error("{message}")]
    SubmissionRejected { message: String },

    #[error("cancelled before the ledger accepted the action")]
    Cancelled,

    /// Cancelled after the submission was handed to the ledger but before it
    /// answered. The ledger may still apply the action.
    #[error("cancelled while the ledger was processing the submission")]
    CancelledInFlight,

    #[error("{message}")]
    SettlementFailed { message: String },

    #[error("no settlement after {after_ms}ms")]
    SettlementTimeout { after_ms: u64 },

    #[error("tracking stopped before settlement")]
    TrackingStopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionErrorKind {
    SubmissionRejected,
    Cancelled,
    SettlementFailed,
    SettlementTimeout,
    TrackingStopped,
}

impl ActionError {
    pub fn kind(&self) -> ActionErrorKind {
        match self {
            ActionError::SubmissionRejected { .. } => ActionErrorKind::SubmissionRejected,
            ActionError::Cancelled | ActionError::CancelledInFlight => ActionErrorKind::Cancelled,
            ActionError::SettlementFailed { .. } => ActionErrorKind::SettlementFailed,
            ActionError::SettlementTimeout { .. } => ActionErrorKind::SettlementTimeout,
            ActionError::TrackingStopped => ActionErrorKind::TrackingStopped,
        }
    }

    /// False when the remote action may or may not have taken effect.
    pub fn outcome_known(&self) -> bool {
        !matches!(
            self,
            ActionError::SettlementTimeout { .. }
                | ActionError::TrackingStopped
                | ActionError::CancelledInFlight
        )
    }

    /// Text for the presentation layer.
    pub fn user_message(&self) -> String {
        if self.outcome_known() {
            self.to_string()
        } else {
            UNKNOWN_OUTCOME.to_string()
        }
    }
}

impl From<SubmitError> for ActionError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Cancelled => ActionError::Cancelled,
            SubmitError::Rejected(message) => ActionError::SubmissionRejected { message },
            other => ActionError::SubmissionRejected {
                message: other.to_string(),
            },
        }
    }
}

impl From<SettleError> for ActionError {
    fn from(err: SettleError) -> Self {
        ActionError::SettlementFailed {
            message: err.to_string(),
        }
    }
}

/// A submission the lifecycle refused without starting an attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitRefusal {
    #[error("not authorized: {reason}")]
    Denied { reason: String },

    #[error("an action is already {state}")]
    InProgress { state: ActionState },
}
