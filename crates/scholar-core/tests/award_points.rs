//! End-to-end: a teacher awards points to a student.

use std::sync::Arc;
use std::time::Duration;

use scholar_core::{
    ActionError, ActionPipeline, ActionState, CacheConfig, CoreConfig, CoreError, PredicateDecl,
    SubmitRefusal,
};
use scholar_ledger::{InMemoryLedger, ScriptedSubmitter};
use scholar_types::{ActionRequest, ManualClock, SettlementResult};
use serde_json::json;

struct School {
    ledger: Arc<InMemoryLedger>,
    submitter: Arc<ScriptedSubmitter>,
    clock: ManualClock,
    pipeline: ActionPipeline,
}

fn school(config: CoreConfig) -> School {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.set_field("contract", "paused", json!(false));
    ledger.set_field("0xTeacher", "teacher", json!(true));
    ledger.set_field("school-1", "active", json!(true));
    ledger.set_field("0xABC", "enrolled", json!(true));
    ledger.set_field("0xABC", "points", json!(10));

    let submitter = Arc::new(ScriptedSubmitter::new());
    let clock = ManualClock::at_epoch();
    let pipeline = ActionPipeline::with_clock(
        ledger.clone(),
        submitter.clone(),
        config,
        Arc::new(clock.clone()),
    )
    .unwrap();

    School {
        ledger,
        submitter,
        clock,
        pipeline,
    }
}

fn award_checks() -> Vec<PredicateDecl> {
    vec![
        PredicateDecl::cleared_flag("paused", "contract", "paused"),
        PredicateDecl::flag("hasRole", "0xteacher", "teacher"),
        PredicateDecl::flag("schoolActive", "school-1", "active"),
        PredicateDecl::flag("enrolled", "0xabc", "enrolled"),
    ]
}

fn award() -> ActionRequest {
    ActionRequest::new("awardPoints", json!({"student": "0xabc", "points": 5})).touching("0xabc")
}

#[tokio::test]
async fn award_is_confirmed_and_next_read_sees_the_write() {
    let s = school(CoreConfig::default());
    assert_eq!(s.pipeline.read("0xabc", "points").await.unwrap(), json!(10));

    let gate = s.pipeline.gate("awardPoints", &award_checks());
    let handle = s.pipeline.authorize_and_submit(&gate, award()).await.unwrap();
    s.ledger.set_field("0xabc", "points", json!(15));

    let record = s.pipeline.wait(&handle).await;
    assert_eq!(record.state, ActionState::Confirmed);
    assert_eq!(s.submitter.submit_calls(), 1);
    assert_eq!(s.pipeline.read("0xabc", "points").await.unwrap(), json!(15));
}

#[tokio::test]
async fn student_not_enrolled_is_denied_by_name() {
    let s = school(CoreConfig::default());
    s.ledger.set_field("0xabc", "enrolled", json!(false));

    let gate = s.pipeline.gate("awardPoints", &award_checks());
    let verdict = s.pipeline.authorize(&gate).await;
    assert_eq!(verdict.reason(), Some("enrolled"));

    let err = s.pipeline.authorize_and_submit(&gate, award()).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Refused(SubmitRefusal::Denied { ref reason }) if reason == "enrolled"
    ));
    assert_eq!(s.pipeline.lifecycle().current_state(), ActionState::Idle);
    assert_eq!(s.submitter.submit_calls(), 0);
}

#[tokio::test]
async fn unreadable_check_is_incomplete_until_the_ledger_recovers() {
    let s = school(CoreConfig::default());
    s.ledger.set_field("0xabc", "enrolled", json!(false));
    s.ledger.fail_field("school-1", "active");

    let gate = s.pipeline.gate("awardPoints", &award_checks());
    let verdict = s.pipeline.authorize(&gate).await;
    assert!(verdict.is_incomplete());
    assert_eq!(
        verdict.user_message().as_deref(),
        Some("checks incomplete, please wait")
    );

    s.ledger.heal_field("school-1", "active");
    s.ledger.set_field("0xabc", "enrolled", json!(true));
    s.pipeline.reader().invalidate_entity("0xabc");
    assert!(s.pipeline.authorize(&gate).await.is_allowed());
}

#[tokio::test]
async fn paused_contract_blocks_award() {
    let s = school(CoreConfig::default());
    s.ledger.set_field("contract", "paused", json!(true));

    let gate = s.pipeline.gate("awardPoints", &award_checks());
    assert_eq!(s.pipeline.authorize(&gate).await.reason(), Some("paused"));
}

#[tokio::test]
async fn cached_reads_expire_after_ttl() {
    let s = school(CoreConfig {
        cache: CacheConfig::with_ttl(Duration::from_secs(300)),
        ..CoreConfig::default()
    });

    s.pipeline.read("0xabc", "points").await.unwrap();
    s.clock.advance_secs(299);
    s.pipeline.read("0xabc", "points").await.unwrap();
    assert_eq!(s.ledger.read_count(), 1);

    s.clock.advance_secs(2);
    s.pipeline.read("0xabc", "points").await.unwrap();
    assert_eq!(s.ledger.read_count(), 2);
}

#[tokio::test]
async fn retry_after_failure_gets_a_new_record() {
    let s = school(CoreConfig::default());
    s.submitter.push_settle(Ok(SettlementResult::Reverted {
        reason: "out of gas".into(),
    }));
    let gate = s.pipeline.gate("awardPoints", &award_checks());

    let first = s.pipeline.authorize_and_submit(&gate, award()).await.unwrap();
    let failed = s.pipeline.wait(&first).await;
    assert_eq!(
        failed.error,
        Some(ActionError::SettlementFailed {
            message: "out of gas".into()
        })
    );

    let second = s.pipeline.authorize_and_submit(&gate, award()).await.unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(s.pipeline.wait(&second).await.state, ActionState::Confirmed);
    assert_eq!(first.record(), failed);
}

#[tokio::test]
async fn double_click_submits_once() {
    let s = school(CoreConfig::default());
    s.submitter.hold_submissions();
    let gate = s.pipeline.gate("awardPoints", &award_checks());

    let handle = s.pipeline.authorize_and_submit(&gate, award()).await.unwrap();
    let err = s.pipeline.authorize_and_submit(&gate, award()).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Refused(SubmitRefusal::InProgress { .. })
    ));

    s.submitter.release_submissions(1);
    assert_eq!(s.pipeline.wait(&handle).await.state, ActionState::Confirmed);
    assert_eq!(s.submitter.submit_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn settlement_timeout_from_config() {
    let config = CoreConfig::from_json_str(
        r#"{"lifecycle":{"settlement_timeout":{"secs":60,"nanos":0}}}"#,
    )
    .unwrap();
    let s = school(config);
    s.submitter.hold_settlements();

    let gate = s.pipeline.gate("awardPoints", &award_checks());
    let handle = s.pipeline.authorize_and_submit(&gate, award()).await.unwrap();
    let record = s.pipeline.wait(&handle).await;

    assert_eq!(
        record.error,
        Some(ActionError::SettlementTimeout { after_ms: 60_000 })
    );
    assert_eq!(
        record.user_message().as_deref(),
        Some("unknown outcome, verify manually")
    );
}
