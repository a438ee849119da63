use std::sync::Arc;

use scholar_cache::{CachedReader, ResultCache};
use scholar_gate::{AuthorizationGate, AuthorizationVerdict};
use scholar_ledger::{ActionSubmitter, LedgerReader};
use scholar_lifecycle::{ActionHandle, ActionLifecycle, ActionRecord, ActionState};
use scholar_types::{ActionRequest, Clock, FieldValue, SystemClock};
use tracing::{debug, info, instrument};

use crate::config::CoreConfig;
use crate::declaration::PredicateDecl;
use crate::error::Result;

/// Read, authorize, submit and track, over one shared result cache.
///
/// Gates built by the pipeline read through the same cache as
/// [`read`](Self::read), so what the caller displays is what the gate
/// decided on. Confirmed actions invalidate the cached fields of the
/// entities they touched.
pub struct ActionPipeline {
    reader: CachedReader,
    lifecycle: ActionLifecycle,
    config: CoreConfig,
}

impl ActionPipeline {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        submitter: Arc<dyn ActionSubmitter>,
        config: CoreConfig,
    ) -> Result<Self> {
        Self::with_clock(ledger, submitter, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        ledger: Arc<dyn LedgerReader>,
        submitter: Arc<dyn ActionSubmitter>,
        config: CoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let cache = Arc::new(ResultCache::with_clock(config.cache.clone(), clock));
        let reader = CachedReader::new(ledger, cache);
        let invalidator = reader.clone();
        let lifecycle = ActionLifecycle::new(submitter, config.lifecycle.clone())
            .on_confirmed(move |record| invalidate_touched(&invalidator, record));
        info!(
            ttl_secs = config.cache.ttl.as_secs(),
            settlement_timeout = ?config.lifecycle.settlement_timeout,
            "action pipeline ready"
        );

        Ok(Self {
            reader,
            lifecycle,
            config,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn reader(&self) -> &CachedReader {
        &self.reader
    }

    pub fn lifecycle(&self) -> &ActionLifecycle {
        &self.lifecycle
    }

    /// Cached field read.
    pub async fn read(&self, entity: &str, field: &str) -> Result<FieldValue> {
        Ok(self.reader.read(entity, field).await?)
    }

    /// Build a gate whose predicates read through the pipeline cache.
    pub fn gate(&self, name: &str, checks: &[PredicateDecl]) -> AuthorizationGate {
        let mut gate = AuthorizationGate::new(name, self.config.gate.clone());
        for check in checks {
            gate.add_predicate(Arc::new(check.to_source(self.reader.clone())));
        }
        gate
    }

    /// Fresh verdict for `gate`.
    pub async fn authorize(&self, gate: &AuthorizationGate) -> AuthorizationVerdict {
        gate.check().await
    }

    /// Check `gate` and, if it allows, submit `action`.
    ///
    /// When the action is confirmed, the cached fields of every entity in
    /// `action.touches` are dropped before any observer sees `Confirmed`, so
    /// the next read reflects the write.
    #[instrument(skip(self, gate, action), fields(gate = gate.name(), action = %action.action_name))]
    pub async fn authorize_and_submit(
        &self,
        gate: &AuthorizationGate,
        action: ActionRequest,
    ) -> Result<ActionHandle> {
        let verdict = gate.check().await;
        Ok(self.lifecycle.submit(&verdict, action)?)
    }

    /// Wait for `handle` to finish.
    pub async fn wait(&self, handle: &ActionHandle) -> ActionRecord {
        handle.wait_terminal().await
    }
}

fn invalidate_touched(reader: &CachedReader, record: &ActionRecord) {
    if record.state != ActionState::Confirmed {
        return;
    }
    for entity in &record.action.touches {
        reader.invalidate_entity(entity);
    }
    debug!(
        action_id = %record.id,
        entities = record.action.touches.len(),
        "touched entities invalidated"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_ledger::{InMemoryLedger, ScriptedSubmitter};
    use serde_json::json;

    fn pipeline() -> (ActionPipeline, Arc<InMemoryLedger>, Arc<ScriptedSubmitter>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let submitter = Arc::new(ScriptedSubmitter::new());
        let pipeline =
            ActionPipeline::new(ledger.clone(), submitter.clone(), CoreConfig::default()).unwrap();
        (pipeline, ledger, submitter)
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let mut config = CoreConfig::default();
        config.lifecycle.transition_buffer = 0;
        let result = ActionPipeline::new(
            Arc::new(InMemoryLedger::new()),
            Arc::new(ScriptedSubmitter::new()),
            config,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn gates_share_the_read_cache() {
        let (pipeline, ledger, _) = pipeline();
        ledger.set_field("0xabc", "enrolled", json!(true));

        assert_eq!(pipeline.read("0xABC", "enrolled").await.unwrap(), json!(true));
        let gate = pipeline.gate(
            "awardPoints",
            &[PredicateDecl::flag("enrolled", "0xabc", "enrolled")],
        );
        assert!(pipeline.authorize(&gate).await.is_allowed());
        assert_eq!(ledger.read_count(), 1);
    }

    #[tokio::test]
    async fn confirmed_action_invalidates_touched_entities() {
        let (pipeline, ledger, _) = pipeline();
        ledger.set_field("0xabc", "points", json!(10));
        pipeline.read("0xabc", "points").await.unwrap();

        let gate = pipeline.gate("awardPoints", &[]);
        let handle = pipeline
            .authorize_and_submit(
                &gate,
                ActionRequest::new("awardPoints", json!({"points": 5})).touching("0xABC"),
            )
            .await
            .unwrap();
        ledger.set_field("0xabc", "points", json!(15));

        assert_eq!(pipeline.wait(&handle).await.state, ActionState::Confirmed);
        assert_eq!(pipeline.read("0xabc", "points").await.unwrap(), json!(15));
    }

    #[tokio::test]
    async fn invalidation_lands_before_confirmation_is_visible() {
        let (pipeline, ledger, _) = pipeline();
        ledger.set_field("0xabc", "points", json!(10));
        pipeline.read("0xabc", "points").await.unwrap();

        let handle = pipeline
            .authorize_and_submit(
                &pipeline.gate("awardPoints", &[]),
                ActionRequest::new("awardPoints", json!({"points": 5})).touching("0xabc"),
            )
            .await
            .unwrap();
        ledger.set_field("0xabc", "points", json!(15));

        // Observe through the handle directly rather than the pipeline.
        let mut rx = handle.subscribe();
        let _ = rx.wait_for(|record| record.state == ActionState::Confirmed).await;
        assert!(pipeline.reader().cache().is_empty());
        assert_eq!(pipeline.read("0xabc", "points").await.unwrap(), json!(15));
    }

    #[tokio::test]
    async fn failed_action_keeps_cache() {
        let (pipeline, ledger, submitter) = pipeline();
        submitter.push_submit(Err(scholar_types::SubmitError::Rejected("nope".into())));
        ledger.set_field("0xabc", "points", json!(10));
        pipeline.read("0xabc", "points").await.unwrap();

        let handle = pipeline
            .authorize_and_submit(
                &pipeline.gate("awardPoints", &[]),
                ActionRequest::new("awardPoints", json!({})).touching("0xabc"),
            )
            .await
            .unwrap();
        ledger.set_field("0xabc", "points", json!(15));

        assert_eq!(pipeline.wait(&handle).await.state, ActionState::Failed);
        assert_eq!(pipeline.read("0xabc", "points").await.unwrap(), json!(10));
    }
}
