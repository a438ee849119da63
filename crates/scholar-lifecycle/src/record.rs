use chrono::{DateTime, Utc};
use scholar_types::{ActionId, ActionRequest, SubmissionRef};
use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::state::{ActionState, StateTransition};

/// State of one submission attempt.
///
/// Only the owning lifecycle mutates a record, and only through allowed
/// transitions; `transitions` is append-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: ActionId,
    pub action: ActionRequest,
    pub state: ActionState,
    pub submission_ref: Option<SubmissionRef>,
    /// When the submission was handed to the ledger.
    pub dispatched_at: Option<DateTime<Utc>>,
    pub error: Option<ActionError>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub transitions: Vec<StateTransition>,
}

impl ActionRecord {
    pub fn new(action: ActionRequest) -> Self {
        Self {
            id: ActionId::new(),
            action,
            state: ActionState::Idle,
            submission_ref: None,
            dispatched_at: None,
            error: None,
            started_at: None,
            ended_at: None,
            transitions: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `to` if the record is currently in `from`.
    ///
    /// Returns the committed transition, or `None` when the record has moved
    /// on (or the edge is not allowed) and nothing changed.
    pub(crate) fn advance(
        &mut self,
        from: ActionState,
        to: ActionState,
        at: DateTime<Utc>,
    ) -> Option<StateTransition> {
        if self.state != from || !from.can_transition_to(to) {
            return None;
        }

        self.state = to;
        if to == ActionState::Submitting {
            self.started_at = Some(at);
        }
        if to.is_terminal() {
            self.ended_at = Some(at);
        }

        let transition = StateTransition {
            action_id: self.id,
            from,
            to,
            at,
        };
        self.transitions.push(transition.clone());
        Some(transition)
    }

    /// User-facing text for a failed record.
    pub fn user_message(&self) -> Option<String> {
        self.error.as_ref().map(ActionError::user_message)
    }
}
