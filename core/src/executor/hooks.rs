//! Progress and error callbacks, each run behind its own error boundary.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::TaskError;

use super::stats::RunStats;

pub type CallbackFuture = BoxFuture<'static, anyhow::Result<()>>;

/// `(completed, total, stats_snapshot)`
pub type ProgressCallback = Arc<dyn Fn(usize, usize, RunStats) -> CallbackFuture + Send + Sync>;

/// `(final_error, item, attempts_made)`
pub type ErrorCallback<I> = Arc<dyn Fn(TaskError, I, u32) -> CallbackFuture + Send + Sync>;

/// Await a callback future, converting both `Err` returns and panics into a message.
pub(crate) async fn guarded(fut: CallbackFuture) -> Result<(), String> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
