use async_trait::async_trait;
use scholar_types::{
    ActionRequest, FieldValue, ReadError, SettleError, SettlementResult, SubmissionRef,
    SubmitError,
};

/// Read access to the remote ledger.
///
/// Implementations may take unbounded time; callers that need a bound impose
/// it themselves.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Read one field of one entity.
    async fn read_field(&self, entity: &str, field: &str) -> Result<FieldValue, ReadError>;
}

/// Write access to the remote ledger.
///
/// Consumed exclusively by the action lifecycle.
#[async_trait]
pub trait ActionSubmitter: Send + Sync {
    /// Hand a mutating call to the ledger.
    ///
    /// Returns once the ledger accepted (or rejected) the request, not once
    /// the action took effect.
    async fn submit_action(&self, request: &ActionRequest) -> Result<SubmissionRef, SubmitError>;

    /// Wait until an accepted submission settles.
    async fn await_settlement(
        &self,
        submission: &SubmissionRef,
    ) -> Result<SettlementResult, SettleError>;
}
