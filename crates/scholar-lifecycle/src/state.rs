use chrono::{DateTime, Utc};
use scholar_types::ActionId;
use serde::{Deserialize, Serialize};

/// Position of an action in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionState {
    Idle,
    Submitting,
    AwaitingConfirmation,
    Confirmed,
    Failed,
}

impl ActionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionState::Confirmed | ActionState::Failed)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: ActionState) -> bool {
        use ActionState::*;
        matches!(
            (self, next),
            (Idle, Submitting)
                | (Submitting, AwaitingConfirmation)
                | (Submitting, Failed)
                | (AwaitingConfirmation, Confirmed)
                | (AwaitingConfirmation, Failed)
        )
    }
}

impl std::fmt::Display for ActionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionState::Idle => "idle",
            ActionState::Submitting => "submitting",
            ActionState::AwaitingConfirmation => "awaiting confirmation",
            ActionState::Confirmed => "confirmed",
            ActionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One committed state change of an action record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub action_id: ActionId,
    pub from: ActionState,
    pub to: ActionState,
    pub at: DateTime<Utc>,
}
