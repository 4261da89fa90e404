use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced by a single task attempt.
///
/// Returning one of these from a task is the only way to request a retry; whether the
/// engine actually retries is decided by the run's retry classifier.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TaskError {
    /// Timeout-class failure. The default classifier retries only these.
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("http status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Failed(String),

    /// The task gave up because the run's cancellation token fired.
    #[error("aborted: {0}")]
    Aborted(String),

    /// Run-level failure raised before any item was scheduled.
    #[error("setup error: {0}")]
    Setup(String),
}

impl TaskError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Http { .. } => "http",
            Self::Transport(_) => "transport",
            Self::Failed(_) => "failed",
            Self::Aborted(_) => "aborted",
            Self::Setup(_) => "setup",
        }
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(format!("{err:#}"))
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            Self::Timeout(err.to_string())
        } else {
            Self::Failed(err.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for TaskError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::Timeout(err.to_string())
    }
}
