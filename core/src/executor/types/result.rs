use serde::Serialize;

use crate::error::TaskError;
use crate::executor::log::{LogEntry, LogLevel};
use crate::executor::stats::RunStats;

/// Final outcome of the retry loop for one item.
#[derive(Debug)]
pub enum ItemOutcome<T> {
    Succeeded { outputs: Vec<T>, attempts: u32 },
    Failed { error: TaskError, attempts: u32 },
    Cancelled { phase: CancelPhase, attempts: u32 },
}

impl<T> ItemOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Where the retry loop noticed cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelPhase {
    BeforeAttempt,
    DuringDelay,
    /// The task itself returned [`TaskError::Aborted`] after the token fired.
    InFlight,
}

/// An item whose final outcome was an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedItem<I> {
    /// `None` only for the synthetic run-level failure of a run that never started.
    pub item: Option<I>,
    pub error: TaskError,
    pub attempts: u32,
}

/// Everything a run produced. Immutable once returned.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult<I, T> {
    pub run_id: String,

    /// Flattened task outputs in completion order.
    pub successful_results: Vec<T>,

    pub failed_items: Vec<FailedItem<I>>,

    pub log_history: Vec<LogEntry>,

    pub stats: RunStats,

    /// True when cancellation cut the run short.
    pub cancelled: bool,
}

impl<I, T> RunResult<I, T> {
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failed_items.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.failed_items.len()
    }

    pub fn logs_at(&self, level: LogLevel) -> impl Iterator<Item = &LogEntry> {
        self.log_history.iter().filter(move |e| e.level == level)
    }

    /// Failed work items, skipping the synthetic run-level entry.
    pub fn failed_work_items(&self) -> impl Iterator<Item = &I> {
        self.failed_items.iter().filter_map(|f| f.item.as_ref())
    }
}
