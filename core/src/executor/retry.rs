//! Per-item retry loop.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;

use crate::error::TaskError;

use super::aggregate::RunAccumulator;
use super::hooks::panic_message;
use super::log::LogLevel;
use super::types::{CancelPhase, ItemOutcome, RunOptions, TaskOptions, WorkItem, WorkTask};

pub(crate) struct RetryController<'a, I: WorkItem, W: WorkTask<I>> {
    pub task: &'a W,
    pub task_options: &'a TaskOptions,
    pub options: &'a RunOptions<I>,
    pub acc: &'a RunAccumulator<I, W::Output>,
}

impl<'a, I: WorkItem, W: WorkTask<I>> RetryController<'a, I, W> {
    /// Run the task for `item` until it succeeds, fails for good, or the run is cancelled.
    pub async fn execute_with_retries(&self, item: &I) -> ItemOutcome<W::Output> {
        let token = &self.options.cancellation;
        let mut attempts: u32 = 0;

        self.acc
            .log(LogLevel::Debug, "processing item", Some(item), None)
            .await;

        loop {
            if token.is_cancelled() {
                self.acc
                    .log(
                        LogLevel::Warn,
                        "cancelled before attempt",
                        Some(item),
                        Some(attempts + 1),
                    )
                    .await;
                return ItemOutcome::Cancelled {
                    phase: CancelPhase::BeforeAttempt,
                    attempts,
                };
            }

            // A retry counts once its attempt starts, so cancelled delays leave no trace.
            if attempts > 0 {
                self.acc.record_retry();
            }
            attempts += 1;
            let attempt = AssertUnwindSafe(self.task.run(item, self.task_options)).catch_unwind();
            let result = attempt.await.unwrap_or_else(|panic| {
                Err(TaskError::failed(format!(
                    "task panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });
            let err = match result {
                Ok(outputs) => {
                    self.acc
                        .log(
                            LogLevel::Success,
                            format!("completed with {} result(s)", outputs.len()),
                            Some(item),
                            Some(attempts),
                        )
                        .await;
                    return ItemOutcome::Succeeded { outputs, attempts };
                }
                Err(err) => err,
            };

            if err.is_abort() && token.is_cancelled() {
                self.acc
                    .log(
                        LogLevel::Warn,
                        format!("aborted by cancellation: {err}"),
                        Some(item),
                        Some(attempts),
                    )
                    .await;
                return ItemOutcome::Cancelled {
                    phase: CancelPhase::InFlight,
                    attempts,
                };
            }

            if !(self.options.is_retryable)(&err) {
                self.acc
                    .log(
                        LogLevel::Error,
                        format!("non-retryable error: {err}"),
                        Some(item),
                        Some(attempts),
                    )
                    .await;
                return ItemOutcome::Failed {
                    error: err,
                    attempts,
                };
            }

            if attempts > self.options.max_retries {
                self.acc
                    .log(
                        LogLevel::Error,
                        format!("final attempt failed: {err}"),
                        Some(item),
                        Some(attempts),
                    )
                    .await;
                return ItemOutcome::Failed {
                    error: err,
                    attempts,
                };
            }

            let delay = self.options.retry_delay.delay_for(attempts);
            self.acc
                .log(
                    LogLevel::Warn,
                    format!("attempt failed: {err}; retrying in {}ms", delay.as_millis()),
                    Some(item),
                    Some(attempts),
                )
                .await;

            if delay > Duration::ZERO {
                tokio::select! {
                    _ = token.cancelled() => {
                        self.acc
                            .log(
                                LogLevel::Warn,
                                "cancelled during retry delay",
                                Some(item),
                                Some(attempts),
                            )
                            .await;
                        return ItemOutcome::Cancelled {
                            phase: CancelPhase::DuringDelay,
                            attempts,
                        };
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::TaskError;
    use crate::executor::log::LogSink;
    use crate::executor::types::{task_fn, RetryDelay};

    fn options() -> RunOptions<String> {
        RunOptions::new().with_retry_delay(RetryDelay::Fixed(Duration::ZERO))
    }

    #[tokio::test]
    async fn timeouts_are_retried_until_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let task = task_fn(move |_item: String, _opts: TaskOptions| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<Vec<()>, _>(TaskError::timeout("slow"))
            }
        });
        let opts = options().with_max_retries(2);
        let task_options = TaskOptions::new();
        let acc = RunAccumulator::new(1, LogSink::default());
        let controller = RetryController {
            task: &task,
            task_options: &task_options,
            options: &opts,
            acc: &acc,
        };

        let outcome = controller.execute_with_retries(&"x".to_string()).await;
        assert!(matches!(outcome, ItemOutcome::Failed { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(acc.snapshot().total_retries, 2);
    }

    #[tokio::test]
    async fn non_retryable_errors_stop_immediately() {
        let task = task_fn(|_item: String, _opts: TaskOptions| async {
            Err::<Vec<()>, _>(TaskError::failed("bad input"))
        });
        let opts = options().with_max_retries(5);
        let task_options = TaskOptions::new();
        let acc = RunAccumulator::new(1, LogSink::default());
        let controller = RetryController {
            task: &task,
            task_options: &task_options,
            options: &opts,
            acc: &acc,
        };

        let outcome = controller.execute_with_retries(&"x".to_string()).await;
        assert!(matches!(outcome, ItemOutcome::Failed { attempts: 1, .. }));
        let result = acc.finish(false);
        assert!(result
            .log_history
            .iter()
            .any(|e| e.level == LogLevel::Error && e.message.contains("non-retryable")));
    }

    #[tokio::test]
    async fn panicking_task_becomes_non_retryable_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let task = task_fn(move |_item: String, _opts: TaskOptions| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < u32::MAX {
                    panic!("task blew up");
                }
                Ok::<Vec<()>, TaskError>(Vec::new())
            }
        });
        let opts = options().with_max_retries(3);
        let task_options = TaskOptions::new();
        let acc = RunAccumulator::new(1, LogSink::default());
        let controller = RetryController {
            task: &task,
            task_options: &task_options,
            options: &opts,
            acc: &acc,
        };

        let outcome = controller.execute_with_retries(&"x".to_string()).await;
        match outcome {
            ItemOutcome::Failed { error, attempts } => {
                assert_eq!(attempts, 1);
                assert_eq!(error, TaskError::failed("task panicked: task blew up"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(acc.snapshot().total_retries, 0);
    }

    #[tokio::test]
    async fn retry_cancelled_during_delay_is_not_counted() {
        let opts = options()
            .with_max_retries(4)
            .with_retry_delay(RetryDelay::Fixed(Duration::from_secs(30)));
        let token = opts.cancellation.clone();
        let task = task_fn(|_item: String, _opts: TaskOptions| async {
            Err::<Vec<()>, _>(TaskError::timeout("slow"))
        });
        let task_options = TaskOptions::new();
        let acc = RunAccumulator::new(1, LogSink::default());
        let controller = RetryController {
            task: &task,
            task_options: &task_options,
            options: &opts,
            acc: &acc,
        };

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let outcome = controller.execute_with_retries(&"x".to_string()).await;

        assert!(matches!(
            outcome,
            ItemOutcome::Cancelled {
                phase: CancelPhase::DuringDelay,
                attempts: 1
            }
        ));
        assert_eq!(acc.snapshot().total_retries, 0);
    }

    #[tokio::test]
    async fn aborts_after_cancellation_are_not_failures() {
        let opts = options();
        let token = opts.cancellation.clone();
        let task = task_fn(move |_item: String, _opts: TaskOptions| {
            let token = token.clone();
            async move {
                token.cancel();
                Err::<Vec<()>, _>(TaskError::aborted("request dropped"))
            }
        });
        let task_options = TaskOptions::new();
        let acc = RunAccumulator::new(1, LogSink::default());
        let controller = RetryController {
            task: &task,
            task_options: &task_options,
            options: &opts,
            acc: &acc,
        };

        let outcome = controller.execute_with_retries(&"x".to_string()).await;
        assert!(matches!(
            outcome,
            ItemOutcome::Cancelled {
                phase: CancelPhase::InFlight,
                attempts: 1
            }
        ));
    }
}
