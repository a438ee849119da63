//! Walks through the read -> authorize -> submit -> track flow against an
//! in-memory ledger.
//!
//! Usage: `points-award [config.json]`. Set `RUST_LOG=debug` to see cache
//! hits and predicate resolution.

use std::sync::Arc;

use anyhow::Context;
use scholar_core::{init_tracing, ActionPipeline, CoreConfig, CoreError, PredicateDecl};
use scholar_ledger::{InMemoryLedger, ScriptedSubmitter};
use scholar_types::{ActionRequest, SubmitError};
use serde_json::json;
use tracing::info;

const STUDENT: &str = "0xABC";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info")?;

    let config = match std::env::args().nth(1) {
        Some(path) => CoreConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => CoreConfig::default(),
    };

    let ledger = Arc::new(InMemoryLedger::new());
    ledger.set_field("contract", "paused", json!(false));
    ledger.set_field("0xteacher", "teacher", json!(true));
    ledger.set_field("school-1", "active", json!(true));
    ledger.set_field(STUDENT, "enrolled", json!(false));
    ledger.set_field(STUDENT, "points", json!(10));

    let submitter = Arc::new(ScriptedSubmitter::new());
    let pipeline = ActionPipeline::new(ledger.clone(), submitter.clone(), config)?;

    let gate = pipeline.gate(
        "awardPoints",
        &[
            PredicateDecl::cleared_flag("paused", "contract", "paused"),
            PredicateDecl::flag("hasRole", "0xteacher", "teacher"),
            PredicateDecl::flag("schoolActive", "school-1", "active"),
            PredicateDecl::flag("enrolled", STUDENT, "enrolled")
                .with_denial_message("student is not enrolled"),
        ],
    );
    let award = || {
        ActionRequest::new("awardPoints", json!({ "student": STUDENT, "points": 5 }))
            .touching(STUDENT)
    };

    let points = pipeline.read(STUDENT, "points").await?;
    info!(student = STUDENT, %points, "current points");

    // 1. Denied: the student is not enrolled yet.
    match pipeline.authorize_and_submit(&gate, award()).await {
        Err(CoreError::Refused(refusal)) => info!(%refusal, "award refused"),
        Err(err) => return Err(err.into()),
        Ok(_) => anyhow::bail!("award should have been refused"),
    }

    // 2. Enrol the student; the next check must see the new value.
    ledger.set_field(STUDENT, "enrolled", json!(true));
    pipeline.reader().invalidate_entity(STUDENT);

    let handle = pipeline.authorize_and_submit(&gate, award()).await?;
    ledger.set_field(STUDENT, "points", json!(15));
    let record = pipeline.wait(&handle).await;
    info!(action_id = %record.id, state = %record.state, "award finished");

    let points = pipeline.read(STUDENT, "points").await?;
    info!(student = STUDENT, %points, "points after award");

    // 3. The ledger rejects the next submission; the record fails and a
    //    retry would start a fresh record.
    submitter.push_submit(Err(SubmitError::Rejected("daily award limit reached".into())));
    let handle = pipeline.authorize_and_submit(&gate, award()).await?;
    let record = pipeline.wait(&handle).await;
    info!(
        action_id = %record.id,
        state = %record.state,
        reason = %record.user_message().unwrap_or_default(),
        "award finished"
    );

    Ok(())
}
