//! Error types for larder-etl

use thiserror::Error;
use uuid::Uuid;

use crate::models::RunStatus;
use crate::services::SourceError;

/// ETL result type
pub type EtlResult<T> = std::result::Result<T, EtlError>;

/// Errors raised by the pipeline and its run tracking
#[derive(Debug, Error)]
pub enum EtlError {
    /// Upstream API failure or extract time budget exceeded
    #[error("Extraction failed: {0}")]
    Extraction(#[from] SourceError),

    /// Enforced quality gate rejected a batch
    #[error("Quality gate failed at {stage}: {details}")]
    QualityGate { stage: String, details: String },

    /// Schema violation during normalization
    #[error("Transform failed: {0}")]
    Transform(String),

    /// Destination unreachable or merge rejected
    #[error("Load failed: {0}")]
    Load(String),

    /// Run id not present in `etl_runs`
    #[error("Unknown run: {0}")]
    UnknownRun(Uuid),

    /// Attempted to move a run out of a terminal state
    #[error("Invalid transition: run {run_id} is already {status}")]
    InvalidTransition { run_id: Uuid, status: RunStatus },

    /// larder-common error (database, I/O, configuration, serialization)
    #[error("Common error: {0}")]
    Common(#[from] larder_common::Error),
}

impl From<sqlx::Error> for EtlError {
    fn from(err: sqlx::Error) -> Self {
        EtlError::Common(larder_common::Error::Database(err))
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        EtlError::Common(larder_common::Error::Serialization(err))
    }
}

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        EtlError::Common(larder_common::Error::Io(err))
    }
}
