use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::predicate::Predicate;
use crate::traits::PredicateSource;
use crate::verdict::{evaluate, AuthorizationVerdict};

/// Reason reported by a gate with no predicates under [`EmptyGatePolicy::Deny`].
pub const NO_CHECKS_CONFIGURED: &str = "no checks configured";

/// What a gate with zero predicates answers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyGatePolicy {
    #[default]
    Allow,
    Deny,
}

/// Configuration for an [`AuthorizationGate`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub empty_policy: EmptyGatePolicy,
}

/// Ordered list of predicate sources guarding one action.
///
/// Sources resolve concurrently on every [`check`](Self::check); the verdict
/// is never cached. Order of addition is the order of evaluation.
pub struct AuthorizationGate {
    name: String,
    sources: Vec<Arc<dyn PredicateSource>>,
    config: GateConfig,
}

impl AuthorizationGate {
    pub fn new(name: impl Into<String>, config: GateConfig) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            config,
        }
    }

    /// Append a predicate; it is evaluated after every one added before it.
    pub fn add_predicate(&mut self, source: Arc<dyn PredicateSource>) {
        self.sources.push(source);
    }

    pub fn with_predicate(mut self, source: impl PredicateSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Predicate names in evaluation order.
    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolve every predicate, preserving declaration order.
    pub async fn snapshot(&self) -> Vec<Predicate> {
        join_all(self.sources.iter().map(|s| s.predicate())).await
    }

    /// Resolve all predicates and compute a fresh verdict.
    #[instrument(skip(self), fields(gate = %self.name))]
    pub async fn check(&self) -> AuthorizationVerdict {
        let predicates = self.snapshot().await;
        let verdict = self.evaluate_snapshot(&predicates);

        if verdict.is_allowed() {
            debug!(predicates = predicates.len(), "gate allows");
        } else {
            info!(
                reason = verdict.reason().unwrap_or_default(),
                "gate does not allow"
            );
        }
        verdict
    }

    /// Apply this gate's policy to an already-resolved snapshot.
    pub fn evaluate_snapshot(&self, predicates: &[Predicate]) -> AuthorizationVerdict {
        if predicates.is_empty() && self.config.empty_policy == EmptyGatePolicy::Deny {
            return AuthorizationVerdict::deny(NO_CHECKS_CONFIGURED, NO_CHECKS_CONFIGURED);
        }
        evaluate(predicates)
    }
}

impl std::fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGate")
            .field("name", &self.name)
            .field("predicates", &self.names())
            .field("config", &self.config)
            .finish()
    }
}
