use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;

use super::hooks::guarded;
use super::log::LogLevel;
use super::progress::{ItemStatus, ProgressMonitor};
use super::retry::RetryController;
use super::types::{ItemOutcome, WorkItem, WorkTask};

/// Runs one item end to end: retries, bookkeeping, progress, callbacks.
pub(crate) struct ItemProcessor<'a, I: WorkItem, W: WorkTask<I>> {
    pub controller: RetryController<'a, I, W>,
    pub progress: &'a ProgressMonitor,
}

impl<'a, I: WorkItem, W: WorkTask<I>> ItemProcessor<'a, I, W> {
    pub async fn process(&self, item: I) {
        let acc = self.controller.acc;
        let options = self.controller.options;

        let label = item.to_string();
        let bar = self.progress.add_item(&label);
        let started = Instant::now();

        let outcome = self.controller.execute_with_retries(&item).await;
        let status = match &outcome {
            ItemOutcome::Succeeded { .. } => ItemStatus::Succeeded,
            ItemOutcome::Failed { .. } => ItemStatus::Failed,
            ItemOutcome::Cancelled { .. } => ItemStatus::Cancelled,
        };
        let completion = acc.record_completion(&item, outcome);
        self.progress
            .complete_item(bar, &label, status, started.elapsed().as_millis() as u64);

        if let (Some((completed, total, snapshot)), Some(callback)) =
            (completion.progress, options.on_progress.as_ref())
        {
            if let Err(msg) = guarded(callback(completed, total, snapshot)).await {
                acc.log(
                    LogLevel::Error,
                    format!("on_progress callback failed: {msg}"),
                    Some(&item),
                    None,
                )
                .await;
            }
        }

        if let (Some((error, failed, attempts)), Some(callback)) =
            (completion.failure, options.on_error.as_ref())
        {
            if let Err(msg) = guarded(callback(error, failed, attempts)).await {
                acc.log(
                    LogLevel::Error,
                    format!("on_error callback failed: {msg}"),
                    Some(&item),
                    Some(attempts),
                )
                .await;
            }
        }
    }
}

/// Streaming pool: `min(max_concurrency, n)` workers drain one shared queue.
pub(crate) async fn run_streaming<I: WorkItem, W: WorkTask<I>>(
    processor: &ItemProcessor<'_, I, W>,
    items: Vec<I>,
    max_concurrency: usize,
) {
    let acc = processor.controller.acc;
    let token = &processor.controller.options.cancellation;
    let worker_count = max_concurrency.min(items.len());
    let queue = Mutex::new(VecDeque::from(items));

    let mut workers = FuturesUnordered::new();
    for worker_id in 0..worker_count {
        let queue = &queue;
        workers.push(async move {
            loop {
                if token.is_cancelled() {
                    acc.mark_cancelled();
                    acc.log(
                        LogLevel::Info,
                        format!("worker {worker_id} stopping: cancellation requested"),
                        None,
                        None,
                    )
                    .await;
                    break;
                }
                let next = queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
                let Some(item) = next else {
                    break;
                };
                processor.process(item).await;
            }
        });
    }

    while workers.next().await.is_some() {}
}

/// Chunked dispatch: consecutive chunks of `max_concurrency`, one chunk at a time.
pub(crate) async fn run_chunked<I: WorkItem, W: WorkTask<I>>(
    processor: &ItemProcessor<'_, I, W>,
    items: Vec<I>,
    max_concurrency: usize,
) {
    let acc = processor.controller.acc;
    let token = &processor.controller.options.cancellation;
    let total_chunks = items.len().div_ceil(max_concurrency);

    for (index, chunk) in items.chunks(max_concurrency).enumerate() {
        if token.is_cancelled() {
            acc.mark_cancelled();
            let skipped = items.len() - index * max_concurrency;
            acc.log(
                LogLevel::Warn,
                format!("cancellation requested; skipping {skipped} remaining item(s)"),
                None,
                None,
            )
            .await;
            break;
        }

        acc.log(
            LogLevel::Debug,
            format!(
                "chunk {}/{}: {} item(s)",
                index + 1,
                total_chunks,
                chunk.len()
            ),
            None,
            None,
        )
        .await;
        processor
            .progress
            .set_message(&format!("Chunk {}/{}", index + 1, total_chunks));

        execute_chunk_parallel(chunk, max_concurrency, move |item| processor.process(item)).await;
    }
}

/// Execute every item of a chunk concurrently, bounded by a semaphore, and wait for all.
///
/// # Arguments
///
/// * `chunk` - Items to execute
/// * `max_concurrency` - Maximum number of items in flight
/// * `executor_fn` - Async function to execute a single item
pub async fn execute_chunk_parallel<I, F, Fut>(chunk: &[I], max_concurrency: usize, executor_fn: F)
where
    I: Clone,
    F: Fn(I) -> Fut,
    Fut: Future<Output = ()>,
{
    let sem = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut futs = FuturesUnordered::new();

    for item in chunk {
        let sem = sem.clone();
        let fut = executor_fn(item.clone());

        futs.push(async move {
            match sem.acquire_owned().await {
                Ok(_permit) => fut.await,
                Err(_) => tracing::error!("semaphore closed unexpectedly"),
            }
        });
    }

    while futs.next().await.is_some() {}
}
