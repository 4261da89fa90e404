//! Shared accumulation state for one run.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::error::TaskError;

use super::log::{LogEntry, LogHistory, LogLevel, LogSink};
use super::stats::RunStats;
use super::types::{FailedItem, ItemOutcome, RunResult, WorkItem};

struct RunState<I, T> {
    log: LogHistory,
    stats: RunStats,
    successes: Vec<T>,
    failures: Vec<FailedItem<I>>,
    completed: usize,
    total: usize,
    cancellation_observed: bool,
}

/// What the caller should report after an item completed.
pub(crate) struct Completion<I> {
    /// `(completed, total, snapshot)` unless the outcome was a cancellation.
    pub progress: Option<(usize, usize, RunStats)>,
    /// `(error, item, attempts)` for failed outcomes.
    pub failure: Option<(TaskError, I, u32)>,
}

pub(crate) struct RunAccumulator<I, T> {
    state: Mutex<RunState<I, T>>,
    sink: LogSink,
}

impl<I: WorkItem, T> RunAccumulator<I, T> {
    pub fn new(total_provided: usize, sink: LogSink) -> Self {
        Self {
            state: Mutex::new(RunState {
                log: LogHistory::new(),
                stats: RunStats::begin(total_provided),
                successes: Vec::new(),
                failures: Vec::new(),
                completed: 0,
                total: 0,
                cancellation_observed: false,
            }),
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState<I, T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn run_id(&self) -> &str {
        self.sink.run_id()
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    /// Fix the number of items that will actually be scheduled.
    pub fn begin(&self, total: usize) {
        let mut state = self.lock();
        state.total = total;
        state.stats.set_attempted(total);
    }

    pub async fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        item: Option<&I>,
        attempt: Option<u32>,
    ) {
        let mut entry = LogEntry::new(level, message);
        if let Some(item) = item {
            entry = entry.with_item(item);
        }
        if let Some(attempt) = attempt {
            entry = entry.with_attempt(attempt);
        }
        self.lock().log.push(entry.clone());
        self.sink.emit(&entry).await;
    }

    pub fn record_retry(&self) {
        self.lock().stats.record_retry();
    }

    pub fn mark_cancelled(&self) {
        self.lock().cancellation_observed = true;
    }

    pub fn cancellation_observed(&self) -> bool {
        self.lock().cancellation_observed
    }

    pub fn snapshot(&self) -> RunStats {
        self.lock().stats.snapshot()
    }

    /// Fold one item's final outcome into the run. A single critical section.
    pub fn record_completion(&self, item: &I, outcome: ItemOutcome<T>) -> Completion<I> {
        let mut state = self.lock();
        match outcome {
            ItemOutcome::Succeeded { outputs, .. } => {
                state.successes.extend(outputs);
                state.stats.record_success();
                state.completed += 1;
                Completion {
                    progress: Some((state.completed, state.total, state.stats.snapshot())),
                    failure: None,
                }
            }
            ItemOutcome::Failed { error, attempts } => {
                state.failures.push(FailedItem {
                    item: Some(item.clone()),
                    error: error.clone(),
                    attempts,
                });
                state.stats.record_failure();
                state.completed += 1;
                Completion {
                    progress: Some((state.completed, state.total, state.stats.snapshot())),
                    failure: Some((error, item.clone(), attempts)),
                }
            }
            ItemOutcome::Cancelled { .. } => {
                state.cancellation_observed = true;
                Completion {
                    progress: None,
                    failure: None,
                }
            }
        }
    }

    /// Seal the run. `cancelled` is or-ed with any cancellation observed along the way.
    pub fn finish(self, cancelled: bool) -> RunResult<I, T> {
        let run_id = self.sink.run_id().to_string();
        let mut state = self.state.into_inner().unwrap_or_else(|e| e.into_inner());
        state.stats.finalize(Utc::now());
        RunResult {
            run_id,
            successful_results: state.successes,
            failed_items: state.failures,
            log_history: state.log.into_entries(),
            stats: state.stats,
            cancelled: cancelled || state.cancellation_observed,
        }
    }

    /// Result of a run that never scheduled anything: one synthetic run-level failure.
    pub async fn abort(self, error: TaskError, cancelled: bool) -> RunResult<I, T> {
        self.log(LogLevel::Error, format!("run aborted: {error}"), None, None)
            .await;
        {
            let mut state = self.lock();
            state.failures.push(FailedItem {
                item: None,
                error,
                attempts: 0,
            });
        }
        self.finish(cancelled)
    }
}
