use thiserror::Error;

/// Failure reading a field from the remote ledger.
///
/// Read failures are transient from the core's point of view: they are never
/// cached, so the next lookup retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("ledger unavailable while reading {field} of {entity}: {message}")]
    Unavailable {
        entity: String,
        field: String,
        message: String,
    },

    #[error("no field {field} on entity {entity}")]
    NotFound { entity: String, field: String },

    #[error("malformed value for {field} of {entity}: {message}")]
    Malformed {
        entity: String,
        field: String,
        message: String,
    },
}

/// Synchronous rejection of a submission by the remote ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("submission rejected: {0}")]
    Rejected(String),

    #[error("submission cancelled by user")]
    Cancelled,

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Failure while waiting for an accepted submission to settle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettleError {
    #[error("ledger unavailable while awaiting settlement: {0}")]
    Unavailable(String),

    #[error("submission {0} is unknown to the ledger")]
    Lost(String),
}
