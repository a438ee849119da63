use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use scholar_gate::AuthorizationVerdict;
use scholar_ledger::ActionSubmitter;
use scholar_types::{ActionId, ActionRequest, SettlementResult};
use tokio::sync::{broadcast, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::LifecycleConfig;
use crate::error::{ActionError, SubmitRefusal};
use crate::record::ActionRecord;
use crate::state::{ActionState, StateTransition};

/// Callback run when an attempt is confirmed.
///
/// It runs while the record is locked, before any observer is woken, so it
/// must not call back into the lifecycle or the attempt's handle.
pub type ConfirmationHook = Arc<dyn Fn(&ActionRecord) + Send + Sync>;

/// Shared state of one submission attempt.
struct Tracker {
    record: watch::Sender<ActionRecord>,
    /// Dropped on the terminal transition so per-attempt receivers end.
    transitions: Mutex<Option<broadcast::Sender<StateTransition>>>,
    lifecycle_events: broadcast::Sender<StateTransition>,
    on_confirmed: Option<ConfirmationHook>,
    driver: Mutex<Option<AbortHandle>>,
}

impl Tracker {
    fn state(&self) -> ActionState {
        self.record.borrow().state
    }

    /// Compare-and-set transition. Broadcasts happen while the record is
    /// locked, so every observer sees transitions in commit order.
    fn advance(
        &self,
        from: ActionState,
        to: ActionState,
        update: impl FnOnce(&mut ActionRecord),
    ) -> bool {
        self.record.send_if_modified(|record| {
            let Some(transition) = record.advance(from, to, Utc::now()) else {
                return false;
            };
            update(record);

            match &record.error {
                Some(error) => warn!(
                    action_id = %record.id,
                    action = %record.action.action_name,
                    %from,
                    %to,
                    kind = ?error.kind(),
                    %error,
                    "action failed"
                ),
                None => info!(
                    action_id = %record.id,
                    action = %record.action.action_name,
                    %from,
                    %to,
                    "action state changed"
                ),
            }

            if to == ActionState::Confirmed {
                if let Some(hook) = &self.on_confirmed {
                    hook(&*record);
                }
            }

            // No receivers is fine: the record keeps the full history.
            let mut transitions = self.transitions.lock();
            if let Some(sender) = transitions.as_ref() {
                let _ = sender.send(transition.clone());
            }
            if to.is_terminal() {
                transitions.take();
            }
            drop(transitions);
            let _ = self.lifecycle_events.send(transition);
            true
        })
    }

    /// Record that the submission is about to be handed to the ledger.
    /// Returns `false` if the attempt already left `Submitting`.
    fn mark_dispatched(&self) -> bool {
        self.record.send_if_modified(|record| {
            if record.state != ActionState::Submitting {
                return false;
            }
            record.dispatched_at = Some(Utc::now());
            true
        })
    }

    fn fail(&self, from: ActionState, error: ActionError) -> bool {
        self.advance(from, ActionState::Failed, move |record| {
            record.error = Some(error);
        })
    }

    fn stop_driver(&self) {
        if let Some(driver) = self.driver.lock().take() {
            driver.abort();
        }
    }
}

/// Runs the external calls of one attempt. Every state change is a
/// compare-and-set, so a concurrent cancel always wins cleanly.
async fn drive(
    tracker: Arc<Tracker>,
    submitter: Arc<dyn ActionSubmitter>,
    request: ActionRequest,
    settlement_timeout: Option<Duration>,
) {
    if !tracker.mark_dispatched() {
        return;
    }

    let submission = match submitter.submit_action(&request).await {
        Ok(submission) => submission,
        Err(err) => {
            tracker.fail(ActionState::Submitting, err.into());
            return;
        }
    };

    let recorded = submission.clone();
    if !tracker.advance(
        ActionState::Submitting,
        ActionState::AwaitingConfirmation,
        move |record| record.submission_ref = Some(recorded),
    ) {
        return;
    }

    let settlement = submitter.await_settlement(&submission);
    let outcome = match settlement_timeout {
        None => settlement.await,
        Some(limit) => match tokio::time::timeout(limit, settlement).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let after_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                tracker.fail(
                    ActionState::AwaitingConfirmation,
                    ActionError::SettlementTimeout { after_ms },
                );
                return;
            }
        },
    };

    match outcome {
        Ok(SettlementResult::Settled { detail }) => {
            debug!(submission = %submission, ?detail, "settlement reported");
            tracker.advance(
                ActionState::AwaitingConfirmation,
                ActionState::Confirmed,
                |_| {},
            );
        }
        Ok(SettlementResult::Reverted { reason }) => {
            tracker.fail(
                ActionState::AwaitingConfirmation,
                ActionError::SettlementFailed { message: reason },
            );
        }
        Err(err) => {
            tracker.fail(ActionState::AwaitingConfirmation, err.into());
        }
    }
}

/// Caller's view of one submission attempt.
///
/// Supports both pull (`state`, `record`) and push (`subscribe`,
/// `transitions`) observation.
#[derive(Clone)]
pub struct ActionHandle {
    tracker: Arc<Tracker>,
}

impl ActionHandle {
    pub fn id(&self) -> ActionId {
        self.tracker.record.borrow().id
    }

    pub fn state(&self) -> ActionState {
        self.tracker.state()
    }

    /// Snapshot of the record.
    pub fn record(&self) -> ActionRecord {
        self.tracker.record.borrow().clone()
    }

    /// Latest-value subscription. Late subscribers still see the terminal
    /// record.
    pub fn subscribe(&self) -> watch::Receiver<ActionRecord> {
        self.tracker.record.subscribe()
    }

    /// Every transition committed after this call, in order. Earlier ones are
    /// in `record().transitions`. The channel closes after the terminal
    /// transition; subscribing to a finished attempt yields a closed channel.
    pub fn transitions(&self) -> broadcast::Receiver<StateTransition> {
        match self.tracker.transitions.lock().as_ref() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Wait until the attempt is `Confirmed` or `Failed`.
    pub async fn wait_terminal(&self) -> ActionRecord {
        let mut rx = self.subscribe();
        let terminal = rx
            .wait_for(ActionRecord::is_terminal)
            .await
            .map(|record| record.clone());
        terminal.unwrap_or_else(|_| self.record())
    }

    /// Stop the attempt.
    ///
    /// While `Submitting` the record fails as `Cancelled` if the ledger was
    /// never called, or as `CancelledInFlight` (outcome unknown) if the call
    /// had already started. While `AwaitingConfirmation` only local tracking
    /// stops: the remote action is untouched and the record fails as
    /// `TrackingStopped`. Returns `false` if the attempt had already ended.
    pub fn cancel(&self) -> bool {
        let stopped = self
            .tracker
            .advance(ActionState::Submitting, ActionState::Failed, |record| {
                record.error = Some(if record.dispatched_at.is_some() {
                    ActionError::CancelledInFlight
                } else {
                    ActionError::Cancelled
                });
            })
            || self.tracker.fail(
                ActionState::AwaitingConfirmation,
                ActionError::TrackingStopped,
            );
        if stopped {
            self.tracker.stop_driver();
        }
        stopped
    }
}

impl std::fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let record = self.tracker.record.borrow();
        f.debug_struct("ActionHandle")
            .field("id", &record.id)
            .field("state", &record.state)
            .finish()
    }
}

/// Drives one logical action at a time through submission and settlement.
pub struct ActionLifecycle {
    submitter: Arc<dyn ActionSubmitter>,
    config: LifecycleConfig,
    current: Mutex<Option<Arc<Tracker>>>,
    events: broadcast::Sender<StateTransition>,
    on_confirmed: Option<ConfirmationHook>,
}

impl ActionLifecycle {
    pub fn new(submitter: Arc<dyn ActionSubmitter>, config: LifecycleConfig) -> Self {
        let (events, _) = broadcast::channel(config.transition_buffer.max(1));
        Self {
            submitter,
            config,
            current: Mutex::new(None),
            events,
            on_confirmed: None,
        }
    }

    /// Run `hook` on every confirmed attempt, before observers of that
    /// attempt see `Confirmed`.
    pub fn on_confirmed(mut self, hook: impl Fn(&ActionRecord) + Send + Sync + 'static) -> Self {
        self.on_confirmed = Some(Arc::new(hook));
        self
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Start a new attempt if `verdict` allows it and nothing is in flight.
    ///
    /// Never waits on the remote ledger: the external calls run on a spawned
    /// task, so this must be called from within a tokio runtime. A refused
    /// submission changes nothing.
    #[instrument(skip(self, verdict, action), fields(action = %action.action_name))]
    pub fn submit(
        &self,
        verdict: &AuthorizationVerdict,
        action: ActionRequest,
    ) -> Result<ActionHandle, SubmitRefusal> {
        if !verdict.is_allowed() {
            let reason = verdict.reason().unwrap_or_default().to_string();
            warn!(%reason, "submission refused by authorization verdict");
            return Err(SubmitRefusal::Denied { reason });
        }

        let mut current = self.current.lock();
        if let Some(previous) = current.as_ref() {
            let state = previous.state();
            if !state.is_terminal() {
                warn!(%state, "submission refused while previous action in flight");
                return Err(SubmitRefusal::InProgress { state });
            }
        }

        let (record, _) = watch::channel(ActionRecord::new(action.clone()));
        let (transitions, _) = broadcast::channel(self.config.transition_buffer.max(1));
        let tracker = Arc::new(Tracker {
            record,
            transitions: Mutex::new(Some(transitions)),
            lifecycle_events: self.events.clone(),
            on_confirmed: self.on_confirmed.clone(),
            driver: Mutex::new(None),
        });
        tracker.advance(ActionState::Idle, ActionState::Submitting, |_| {});

        let task = tokio::spawn(drive(
            tracker.clone(),
            self.submitter.clone(),
            action,
            self.config.settlement_timeout,
        ));
        *tracker.driver.lock() = Some(task.abort_handle());
        *current = Some(tracker.clone());

        Ok(ActionHandle { tracker })
    }

    /// State of the latest attempt; `Idle` before the first one.
    pub fn current_state(&self) -> ActionState {
        self.current
            .lock()
            .as_ref()
            .map_or(ActionState::Idle, |tracker| tracker.state())
    }

    pub fn current_record(&self) -> Option<ActionRecord> {
        self.current
            .lock()
            .as_ref()
            .map(|tracker| tracker.record.borrow().clone())
    }

    pub fn current_handle(&self) -> Option<ActionHandle> {
        self.current.lock().as_ref().map(|tracker| ActionHandle {
            tracker: tracker.clone(),
        })
    }

    /// Transitions of every attempt made by this lifecycle.
    pub fn subscribe(&self) -> broadcast::Receiver<StateTransition> {
        self.events.subscribe()
    }

    /// Cancel the attempt in flight, if any.
    pub fn cancel(&self) -> bool {
        self.current_handle().is_some_and(|handle| handle.cancel())
    }
}
