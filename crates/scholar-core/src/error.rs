use std::path::PathBuf;

use scholar_lifecycle::SubmitRefusal;
use scholar_types::ReadError;
use thiserror::Error;

/// Errors loading or validating a [`CoreConfig`](crate::CoreConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors surfaced by the pipeline facade.
///
/// Authorization denial is not an error of the gate; it only becomes one here
/// when the caller asks the pipeline to submit anyway.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Refused(#[from] SubmitRefusal),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("tracing setup failed: {0}")]
    Tracing(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
