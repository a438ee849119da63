use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use scholar_types::{
    ActionRequest, EntityKey, FieldValue, ReadError, SettleError, SettlementResult,
    SubmissionRef, SubmitError,
};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::traits::{ActionSubmitter, LedgerReader};

/// In-memory ledger for tests and demos.
///
/// Stores a map of entity → field → value. Entity identifiers are
/// case-insensitive like on the real ledger; field names are exact.
#[derive(Default)]
pub struct InMemoryLedger {
    fields: Mutex<HashMap<EntityKey, HashMap<String, FieldValue>>>,
    failing: Mutex<HashSet<(EntityKey, String)>>,
    reads: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) one field of an entity.
    pub fn set_field(&self, entity: &str, field: &str, value: FieldValue) {
        self.fields
            .lock()
            .entry(EntityKey::new(entity))
            .or_default()
            .insert(field.to_string(), value);
    }

    /// Make reads of one field fail with `ReadError::Unavailable` until healed.
    pub fn fail_field(&self, entity: &str, field: &str) {
        self.failing
            .lock()
            .insert((EntityKey::new(entity), field.to_string()));
    }

    pub fn heal_field(&self, entity: &str, field: &str) {
        self.failing
            .lock()
            .remove(&(EntityKey::new(entity), field.to_string()));
    }

    /// Number of `read_field` calls served so far (including failed ones).
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn read_field(&self, entity: &str, field: &str) -> Result<FieldValue, ReadError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let key = EntityKey::new(entity);

        if self.failing.lock().contains(&(key.clone(), field.to_string())) {
            return Err(ReadError::Unavailable {
                entity: entity.to_string(),
                field: field.to_string(),
                message: "mock ledger: field marked failing".into(),
            });
        }

        self.fields
            .lock()
            .get(&key)
            .and_then(|fields| fields.get(field))
            .cloned()
            .ok_or_else(|| ReadError::NotFound {
                entity: entity.to_string(),
                field: field.to_string(),
            })
    }
}

/// Scripted action submitter for tests.
///
/// Submit and settle outcomes are popped from per-call scripts; an empty
/// script accepts every submission and settles it successfully. Either phase
/// can be held open so tests can observe the in-between states.
#[derive(Default)]
pub struct ScriptedSubmitter {
    submit_script: Mutex<VecDeque<Result<SubmissionRef, SubmitError>>>,
    settle_script: Mutex<VecDeque<Result<SettlementResult, SettleError>>>,
    submit_hold: Mutex<Option<Arc<Semaphore>>>,
    settle_hold: Mutex<Option<Arc<Semaphore>>>,
    submitted: Mutex<Vec<ActionRequest>>,
    submit_calls: AtomicUsize,
    settle_calls: AtomicUsize,
}

impl ScriptedSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next unscripted `submit_action` call.
    pub fn push_submit(&self, outcome: Result<SubmissionRef, SubmitError>) {
        self.submit_script.lock().push_back(outcome);
    }

    /// Queue the outcome of the next unscripted `await_settlement` call.
    pub fn push_settle(&self, outcome: Result<SettlementResult, SettleError>) {
        self.settle_script.lock().push_back(outcome);
    }

    /// Block every following `submit_action` call until released.
    pub fn hold_submissions(&self) {
        *self.submit_hold.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held `submit_action` calls proceed.
    pub fn release_submissions(&self, n: usize) {
        if let Some(sem) = self.submit_hold.lock().as_ref() {
            sem.add_permits(n);
        }
    }

    /// Block every following `await_settlement` call until released.
    pub fn hold_settlements(&self) {
        *self.settle_hold.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held `await_settlement` calls proceed.
    pub fn release_settlements(&self, n: usize) {
        if let Some(sem) = self.settle_hold.lock().as_ref() {
            sem.add_permits(n);
        }
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn settle_calls(&self) -> usize {
        self.settle_calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in call order.
    pub fn submitted(&self) -> Vec<ActionRequest> {
        self.submitted.lock().clone()
    }

    async fn pass(hold: &Mutex<Option<Arc<Semaphore>>>) {
        let sem = hold.lock().clone();
        if let Some(sem) = sem {
            if let Ok(permit) = sem.acquire().await {
                permit.forget();
            }
        }
    }
}

#[async_trait]
impl ActionSubmitter for ScriptedSubmitter {
    async fn submit_action(&self, request: &ActionRequest) -> Result<SubmissionRef, SubmitError> {
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.submitted.lock().push(request.clone());
        debug!(action = %request.action_name, call, "mock submit received");

        Self::pass(&self.submit_hold).await;

        let scripted = self.submit_script.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(SubmissionRef::new(format!("mock-{call}"))))
    }

    async fn await_settlement(
        &self,
        submission: &SubmissionRef,
    ) -> Result<SettlementResult, SettleError> {
        self.settle_calls.fetch_add(1, Ordering::SeqCst);
        debug!(submission = %submission, "mock settlement awaited");

        Self::pass(&self.settle_hold).await;

        let scripted = self.settle_script.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(SettlementResult::settled()))
    }
}
