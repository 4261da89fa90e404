//! Bounded fan-out executor with retries and cooperative cancellation.
//!
//! # Architecture
//!
//! ```text
//! Vec<I> + WorkTask<I> + RunOptions<I>
//!   ↓
//! Engine::run()  (setup checks, dedup in streaming mode)
//!   ↓
//! run_streaming() | run_chunked()      ← max_concurrency in flight
//!   ↓
//! ItemProcessor::process()  → RetryController::execute_with_retries()
//!   ↓
//! RunAccumulator::record_completion()  → on_progress / on_error
//!   ↓
//! RunResult { successful_results, failed_items, log_history, stats, cancelled }
//! ```

mod aggregate;
mod engine;
pub mod export;
mod hooks;
pub mod log;
pub mod ordering;
mod progress;
mod retry;
mod scheduler;
pub mod stats;
pub mod traits;
pub mod types;

pub use engine::{run_tasks, Engine, EngineBuilder};
pub use hooks::{CallbackFuture, ErrorCallback, ProgressCallback};
pub use log::{LogEntry, LogHistory, LogLevel};
pub use progress::{ItemStatus, ProgressMonitor};
pub use scheduler::execute_chunk_parallel;
pub use stats::RunStats;
pub use types::{
    default_is_retryable, task_fn, CancelPhase, DispatchMode, EngineConfig, FailedItem, FnTask,
    ItemOutcome, RetryClassifier, RetryConfig, RetryDelay, RunOptions, RunResult, TaskOptions,
    WorkItem, WorkTask,
};
