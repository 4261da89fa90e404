use std::fmt;
use std::future::Future;
use std::hash::Hash;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Anything that can be fanned out as one unit of work.
///
/// Identity is the value itself: streaming runs collapse equal items into one execution.
pub trait WorkItem: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static {}

impl<T> WorkItem for T where T: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static
{}

/// Options passed verbatim to every task invocation.
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    /// Signal the task may watch to abandon its own in-flight work.
    pub cancellation: CancellationToken,

    /// Opaque hint for the task (e.g. sub-resource categories to skip).
    pub resource_filter: Vec<String>,
}

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_resource_filter<S: Into<String>>(
        mut self,
        filter: impl IntoIterator<Item = S>,
    ) -> Self {
        self.resource_filter = filter.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive membership test against `resource_filter`.
    pub fn filters(&self, category: &str) -> bool {
        self.resource_filter
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }
}

/// Externally supplied operation executed once per attempt.
///
/// The implementing value doubles as the shared context for every invocation (HTTP client,
/// credentials, ...). Returning `Err` is the retry signal; a task that swallows its own
/// errors is never retried.
#[async_trait]
pub trait WorkTask<I: WorkItem>: Send + Sync {
    type Output: Send + 'static;

    async fn run(&self, item: &I, options: &TaskOptions) -> Result<Vec<Self::Output>, TaskError>;
}

/// Adapter turning an async closure into a [`WorkTask`].
pub struct FnTask<F> {
    f: F,
}

pub fn task_fn<I, F, Fut, T>(f: F) -> FnTask<F>
where
    I: WorkItem,
    F: Fn(I, TaskOptions) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>, TaskError>> + Send + 'static,
    T: Send + 'static,
{
    FnTask { f }
}

#[async_trait]
impl<I, F, Fut, T> WorkTask<I> for FnTask<F>
where
    I: WorkItem,
    F: Fn(I, TaskOptions) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>, TaskError>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    async fn run(&self, item: &I, options: &TaskOptions) -> Result<Vec<T>, TaskError> {
        (self.f)(item.clone(), options.clone()).await
    }
}
