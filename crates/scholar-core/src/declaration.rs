//! Serializable predicate declarations, so gates can be described in
//! configuration rather than code.

use scholar_cache::CachedReader;
use scholar_gate::FieldPredicate;
use serde::{Deserialize, Serialize};

/// How a field value becomes a predicate value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldTest {
    /// Boolean field that must be `true`.
    #[default]
    IsTrue,
    /// Boolean field that must be `false`.
    IsFalse,
    Equals(serde_json::Value),
    AtLeast(f64),
}

/// One `(name, entity, field, test)` check of a gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredicateDecl {
    pub name: String,
    pub entity: String,
    pub field: String,
    #[serde(default)]
    pub test: FieldTest,
    #[serde(default)]
    pub denial_message: Option<String>,
}

impl PredicateDecl {
    pub fn new(
        name: impl Into<String>,
        entity: impl Into<String>,
        field: impl Into<String>,
        test: FieldTest,
    ) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            field: field.into(),
            test,
            denial_message: None,
        }
    }

    pub fn flag(name: impl Into<String>, entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(name, entity, field, FieldTest::IsTrue)
    }

    pub fn cleared_flag(
        name: impl Into<String>,
        entity: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::new(name, entity, field, FieldTest::IsFalse)
    }

    pub fn with_denial_message(mut self, message: impl Into<String>) -> Self {
        self.denial_message = Some(message.into());
        self
    }

    pub(crate) fn to_source(&self, reader: CachedReader) -> FieldPredicate {
        let (name, entity, field) = (self.name.as_str(), self.entity.as_str(), self.field.as_str());
        let predicate = match &self.test {
            FieldTest::IsTrue => FieldPredicate::flag(name, reader, entity, field),
            FieldTest::IsFalse => FieldPredicate::cleared_flag(name, reader, entity, field),
            FieldTest::Equals(expected) => {
                FieldPredicate::equals(name, reader, entity, field, expected.clone())
            }
            FieldTest::AtLeast(min) => FieldPredicate::at_least(name, reader, entity, field, *min),
        };
        match &self.denial_message {
            Some(message) => predicate.with_denial_message(message.as_str()),
            None => predicate,
        }
    }
}
