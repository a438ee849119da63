//! Predicate sources: where predicate values come from.

use async_trait::async_trait;
use scholar_cache::CachedReader;
use scholar_types::FieldValue;
use tracing::{debug, warn};

use crate::predicate::PredicateValue;
use crate::traits::PredicateSource;

type FieldTest = Box<dyn Fn(&FieldValue) -> PredicateValue + Send + Sync>;

/// Predicate backed by one ledger field read through the result cache.
///
/// The same cached value can be shown on screen, so the gate and the view
/// agree on what they saw. A failed read or a value the test cannot
/// interpret resolves to `Unknown`.
pub struct FieldPredicate {
    name: String,
    entity: String,
    field: String,
    reader: CachedReader,
    test: FieldTest,
    expected: bool,
    denial_message: Option<String>,
}

impl FieldPredicate {
    /// General form: `test` maps the field value to a predicate value.
    pub fn new<F>(
        name: impl Into<String>,
        reader: CachedReader,
        entity: impl Into<String>,
        field: impl Into<String>,
        test: F,
    ) -> Self
    where
        F: Fn(&FieldValue) -> PredicateValue + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            entity: entity.into(),
            field: field.into(),
            reader,
            test: Box::new(test),
            expected: true,
            denial_message: None,
        }
    }

    /// The field is a boolean flag that must be `true`.
    pub fn flag(
        name: impl Into<String>,
        reader: CachedReader,
        entity: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::new(name, reader, entity, field, |value| value.as_bool().into())
    }

    /// The field is a boolean flag that must be `false` (e.g. `paused`).
    pub fn cleared_flag(
        name: impl Into<String>,
        reader: CachedReader,
        entity: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::flag(name, reader, entity, field).expecting(false)
    }

    /// The field must equal `expected`.
    pub fn equals(
        name: impl Into<String>,
        reader: CachedReader,
        entity: impl Into<String>,
        field: impl Into<String>,
        expected: FieldValue,
    ) -> Self {
        Self::new(name, reader, entity, field, move |value| {
            (value == &expected).into()
        })
    }

    /// The field is a number that must be at least `min`.
    pub fn at_least(
        name: impl Into<String>,
        reader: CachedReader,
        entity: impl Into<String>,
        field: impl Into<String>,
        min: f64,
    ) -> Self {
        Self::new(name, reader, entity, field, move |value| {
            value.as_f64().map(|n| n >= min).into()
        })
    }

    pub fn expecting(mut self, expected: bool) -> Self {
        self.expected = expected;
        self
    }

    pub fn with_denial_message(mut self, message: impl Into<String>) -> Self {
        self.denial_message = Some(message.into());
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

#[async_trait]
impl PredicateSource for FieldPredicate {
    fn name(&self) -> &str {
        &self.name
    }

    fn expected(&self) -> bool {
        self.expected
    }

    fn denial_message(&self) -> Option<&str> {
        self.denial_message.as_deref()
    }

    async fn resolve(&self) -> PredicateValue {
        match self.reader.read(&self.entity, &self.field).await {
            Ok(value) => {
                let resolved = (self.test)(&value);
                debug!(
                    predicate = %self.name,
                    entity = %self.entity,
                    field = %self.field,
                    value = %resolved,
                    "predicate resolved"
                );
                resolved
            }
            Err(err) => {
                warn!(
                    predicate = %self.name,
                    error = %err,
                    "predicate input unavailable; treating as unknown"
                );
                PredicateValue::Unknown
            }
        }
    }
}

/// Predicate with a value known locally (e.g. "form is valid").
pub struct StaticPredicate {
    name: String,
    value: PredicateValue,
    expected: bool,
}

impl StaticPredicate {
    pub fn new(name: impl Into<String>, value: impl Into<PredicateValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expected: true,
        }
    }

    pub fn expecting(mut self, expected: bool) -> Self {
        self.expected = expected;
        self
    }
}

#[async_trait]
impl PredicateSource for StaticPredicate {
    fn name(&self) -> &str {
        &self.name
    }

    fn expected(&self) -> bool {
        self.expected
    }

    async fn resolve(&self) -> PredicateValue {
        self.value
    }
}
