use serde::{Deserialize, Serialize};

/// Value of one field read from the ledger.
///
/// The core does not interpret field contents; predicates and screens do.
pub type FieldValue = serde_json::Value;

/// A mutating call to hand to the remote ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Name of the remote call, e.g. `awardPoints`.
    pub action_name: String,
    /// Call arguments, passed through untouched.
    pub args: serde_json::Value,
    /// Entities whose cached reads are stale once this action settles.
    #[serde(default)]
    pub touches: Vec<String>,
}

impl ActionRequest {
    pub fn new(action_name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            action_name: action_name.into(),
            args,
            touches: Vec::new(),
        }
    }

    /// Declare an entity whose state this action changes.
    pub fn touching(mut self, entity: impl Into<String>) -> Self {
        self.touches.push(entity.into());
        self
    }
}

/// Final outcome reported by the remote ledger for an accepted submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementResult {
    /// The action took effect.
    Settled { detail: Option<String> },
    /// The ledger accepted the submission but the action did not take effect.
    Reverted { reason: String },
}

impl SettlementResult {
    pub fn settled() -> Self {
        Self::Settled { detail: None }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. })
    }
}
