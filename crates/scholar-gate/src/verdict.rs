use serde::{Deserialize, Serialize};

use crate::predicate::{Predicate, PredicateValue};

/// Reason reported while any predicate is still unresolved.
pub const CHECKS_INCOMPLETE: &str = "checks incomplete";

/// Why a verdict came out the way it did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictOutcome {
    /// Every predicate held.
    Allowed,
    /// At least one predicate was unresolved; `awaiting` is the first one.
    Incomplete { awaiting: String },
    /// `predicate` is the first (in declaration order) that was false.
    Denied { predicate: String },
}

/// Allow/deny verdict of an authorization gate.
///
/// A reason is present exactly when the verdict does not allow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationVerdict {
    allowed: bool,
    reason: Option<String>,
    outcome: VerdictOutcome,
}

impl AuthorizationVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            outcome: VerdictOutcome::Allowed,
        }
    }

    pub fn incomplete(awaiting: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(CHECKS_INCOMPLETE.to_string()),
            outcome: VerdictOutcome::Incomplete {
                awaiting: awaiting.into(),
            },
        }
    }

    pub fn deny(predicate: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            outcome: VerdictOutcome::Denied {
                predicate: predicate.into(),
            },
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn outcome(&self) -> &VerdictOutcome {
        &self.outcome
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self.outcome, VerdictOutcome::Incomplete { .. })
    }

    /// Text for the presentation layer; `None` when allowed.
    pub fn user_message(&self) -> Option<String> {
        match &self.outcome {
            VerdictOutcome::Allowed => None,
            VerdictOutcome::Incomplete { .. } => Some(format!("{CHECKS_INCOMPLETE}, please wait")),
            VerdictOutcome::Denied { .. } => self.reason.clone(),
        }
    }
}

/// Evaluate predicates in declaration order.
///
/// Pure function of its input. Unknown values take priority over an
/// unsatisfied predicate anywhere in the list; among unsatisfied predicates
/// the first one wins. An empty list is vacuously allowed.
pub fn evaluate(predicates: &[Predicate]) -> AuthorizationVerdict {
    if let Some(pending) = predicates
        .iter()
        .find(|p| p.value == PredicateValue::Unknown)
    {
        return AuthorizationVerdict::incomplete(&pending.name);
    }

    match predicates.iter().find(|p| p.is_satisfied() == Some(false)) {
        Some(blocking) => AuthorizationVerdict::deny(&blocking.name, blocking.denial_reason()),
        None => AuthorizationVerdict::allow(),
    }
}
