use async_trait::async_trait;

use crate::predicate::{Predicate, PredicateValue};

/// One named check of an [`AuthorizationGate`](crate::AuthorizationGate).
///
/// Sources are resolved concurrently but reported in the order they were
/// added to the gate. A source that cannot obtain its input resolves to
/// [`PredicateValue::Unknown`], never to `False`.
#[async_trait]
pub trait PredicateSource: Send + Sync {
    /// Name of the predicate; the default denial reason.
    fn name(&self) -> &str;

    /// The fact value for which the predicate holds.
    fn expected(&self) -> bool {
        true
    }

    /// Reason reported instead of the name when this predicate blocks.
    fn denial_message(&self) -> Option<&str> {
        None
    }

    /// Obtain the current fact value.
    async fn resolve(&self) -> PredicateValue;

    /// Resolve into a full [`Predicate`].
    async fn predicate(&self) -> Predicate {
        let mut predicate = Predicate::new(self.name(), self.resolve().await).expecting(self.expected());
        predicate.denial_message = self.denial_message().map(str::to_string);
        predicate
    }
}
