use serde::{Deserialize, Serialize};

/// Resolved value of a predicate.
///
/// `Unknown` means "not resolved yet" (read in flight, failed, or never
/// requested) and is never treated as `False`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateValue {
    True,
    False,
    Unknown,
}

impl PredicateValue {
    pub fn is_known(self) -> bool {
        !matches!(self, PredicateValue::Unknown)
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            PredicateValue::True => Some(true),
            PredicateValue::False => Some(false),
            PredicateValue::Unknown => None,
        }
    }
}

impl From<bool> for PredicateValue {
    fn from(value: bool) -> Self {
        if value {
            PredicateValue::True
        } else {
            PredicateValue::False
        }
    }
}

impl From<Option<bool>> for PredicateValue {
    fn from(value: Option<bool>) -> Self {
        value.map(Into::into).unwrap_or(PredicateValue::Unknown)
    }
}

impl std::fmt::Display for PredicateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredicateValue::True => write!(f, "true"),
            PredicateValue::False => write!(f, "false"),
            PredicateValue::Unknown => write!(f, "unknown"),
        }
    }
}

/// A named boolean fact gating a mutating action.
///
/// The predicate holds when the fact equals `expected` (normally `true`).
/// Blocking facts such as "contract paused" are declared with
/// `expected = false` so they can be listed under their natural name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub name: String,
    pub value: PredicateValue,
    #[serde(default = "expect_true")]
    pub expected: bool,
    /// Reason shown when this predicate blocks. Defaults to the name.
    pub denial_message: Option<String>,
}

fn expect_true() -> bool {
    true
}

impl Predicate {
    pub fn new(name: impl Into<String>, value: impl Into<PredicateValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expected: true,
            denial_message: None,
        }
    }

    /// A fact that must be false for the action to proceed.
    pub fn must_be_false(name: impl Into<String>, value: impl Into<PredicateValue>) -> Self {
        Self::new(name, value).expecting(false)
    }

    pub fn expecting(mut self, expected: bool) -> Self {
        self.expected = expected;
        self
    }

    pub fn unknown(name: impl Into<String>) -> Self {
        Self::new(name, PredicateValue::Unknown)
    }

    pub fn with_denial_message(mut self, message: impl Into<String>) -> Self {
        self.denial_message = Some(message.into());
        self
    }

    /// `None` while unresolved, otherwise whether the fact matches.
    pub fn is_satisfied(&self) -> Option<bool> {
        self.value.as_bool().map(|fact| fact == self.expected)
    }

    /// Name-derived reason reported when this predicate blocks.
    pub fn denial_reason(&self) -> &str {
        self.denial_message.as_deref().unwrap_or(&self.name)
    }
}
