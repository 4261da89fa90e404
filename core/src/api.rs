//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `fanout_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from_path, AppConfig, EngineConfig, EventsOutConfig, HttpTaskConfig,
    LoggingConfig, OutputConfig, RetryConfig,
};
pub use crate::error::{CliError, EngineError, TaskError};
pub use crate::events_out::{start_events_out, EventsOutTx};
pub use crate::executor::export::{export_to_file, to_delimited, write_delimited};
pub use crate::executor::ordering::{dedup_by_key, dedup_items, sort_by_input_order};
pub use crate::executor::traits::{BackoffStrategy, OutputRendererPlugin, RenderEvent};
pub use crate::executor::{
    default_is_retryable, run_tasks, task_fn, CancelPhase, DispatchMode, Engine, EngineBuilder,
    FailedItem, ItemOutcome, LogEntry, LogLevel, RetryClassifier, RetryDelay, RunOptions,
    RunResult, RunStats, TaskOptions, WorkItem, WorkTask,
};
pub use tokio_util::sync::CancellationToken;
