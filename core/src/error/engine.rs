use thiserror::Error;

use super::task::TaskError;

/// Errors that stop a run before any item is scheduled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("run aborted before scheduling: {0}")]
    AbortedBeforeStart(String),

    #[error("unknown retry strategy: {0}")]
    UnknownRetryStrategy(String),
}

impl From<EngineError> for TaskError {
    fn from(err: EngineError) -> Self {
        TaskError::Setup(err.to_string())
    }
}
