use std::sync::Arc;

use uuid::Uuid;

use crate::error::EngineError;
use crate::events_out::{write_run_event, EventsOutTx};

use super::aggregate::RunAccumulator;
use super::log::{LogLevel, LogSink};
use super::ordering::dedup_items;
use super::progress::ProgressMonitor;
use super::retry::RetryController;
use super::scheduler::{run_chunked, run_streaming, ItemProcessor};
use super::traits::{OutputRendererPlugin, RenderEvent};
use super::types::{DispatchMode, RunOptions, RunResult, TaskOptions, WorkItem, WorkTask};

/// Fan-out engine. Holds presentation sinks only; every run starts from fresh state.
#[derive(Clone, Default)]
pub struct Engine {
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    events_out: Option<EventsOutTx>,
    progress_bar: bool,
}

#[derive(Default)]
pub struct EngineBuilder {
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    events_out: Option<EventsOutTx>,
    progress_bar: bool,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Execute `task` once per item (plus retries) with at most `max_concurrency` in flight.
    ///
    /// Never returns an error: setup problems and pre-start cancellation come back as a
    /// result holding one synthetic failed item.
    #[tracing::instrument(
        name = "engine.run",
        skip_all,
        fields(items = items.len(), max_concurrency = max_concurrency, run_id = tracing::field::Empty)
    )]
    pub async fn run<I, W>(
        &self,
        items: Vec<I>,
        max_concurrency: usize,
        task: &W,
        task_options: TaskOptions,
        options: RunOptions<I>,
    ) -> RunResult<I, W::Output>
    where
        I: WorkItem,
        W: WorkTask<I>,
    {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let sink = LogSink::new(
            run_id.clone(),
            options.log_to_console,
            self.renderer.clone(),
            self.events_out.clone(),
        );
        let acc = RunAccumulator::new(items.len(), sink.clone());

        if max_concurrency == 0 {
            let err = EngineError::InvalidConfig("max_concurrency must be at least 1".into());
            return acc.abort(err.into(), false).await;
        }
        if options.cancellation.is_cancelled() {
            let err = EngineError::AbortedBeforeStart("cancellation signalled before start".into());
            return acc.abort(err.into(), true).await;
        }

        let scheduled = match options.dispatch_mode {
            DispatchMode::Streaming => {
                let unique = dedup_items(&items);
                if unique.len() < items.len() {
                    acc.log(
                        LogLevel::Info,
                        format!(
                            "collapsed {} duplicate item(s)",
                            items.len() - unique.len()
                        ),
                        None,
                        None,
                    )
                    .await;
                }
                unique
            }
            DispatchMode::Chunked => items,
        };
        let total = scheduled.len();
        acc.begin(total);

        sink.render(&RenderEvent::RunStart {
            run_id: run_id.clone(),
            total_items: total,
            max_concurrency,
            dispatch_mode: options.dispatch_mode,
        });
        write_run_event(
            self.events_out.as_ref(),
            "run.start",
            &run_id,
            &serde_json::json!({
                "total_items": total,
                "max_concurrency": max_concurrency,
                "dispatch_mode": options.dispatch_mode,
            }),
        )
        .await;
        acc.log(
            LogLevel::Info,
            format!(
                "starting run: {total} item(s), max_concurrency={max_concurrency}, mode={}",
                options.dispatch_mode
            ),
            None,
            None,
        )
        .await;

        let progress = ProgressMonitor::new(total, self.progress_bar);
        let processor = ItemProcessor {
            controller: RetryController {
                task,
                task_options: &task_options,
                options: &options,
                acc: &acc,
            },
            progress: &progress,
        };

        match options.dispatch_mode {
            DispatchMode::Streaming => run_streaming(&processor, scheduled, max_concurrency).await,
            DispatchMode::Chunked => run_chunked(&processor, scheduled, max_concurrency).await,
        }

        let cancelled = acc.cancellation_observed() || options.cancellation.is_cancelled();
        let stats = acc.snapshot();
        if cancelled {
            acc.log(
                LogLevel::Warn,
                format!(
                    "run cancelled: {} succeeded, {} failed, {} not completed",
                    stats.total_succeeded,
                    stats.total_failed,
                    total.saturating_sub(stats.completed())
                ),
                None,
                None,
            )
            .await;
        } else {
            acc.log(
                LogLevel::Info,
                format!(
                    "run finished: {} succeeded, {} failed, {} retries",
                    stats.total_succeeded, stats.total_failed, stats.total_retries
                ),
                None,
                None,
            )
            .await;
        }
        progress.finish(stats.total_failed == 0, cancelled);

        let result = acc.finish(cancelled);
        tracing::debug!(
            succeeded = result.stats.total_succeeded,
            failed = result.stats.total_failed,
            retries = result.stats.total_retries,
            duration_ms = result.stats.duration_ms,
            cancelled,
            "run complete"
        );

        sink.render(&RenderEvent::RunEnd {
            run_id: run_id.clone(),
            stats: result.stats.clone(),
            failed_items: result.failed_items.len(),
            cancelled,
        });
        write_run_event(self.events_out.as_ref(), "run.end", &run_id, &result.stats).await;

        result
    }
}

impl EngineBuilder {
    pub fn renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn events_out(mut self, events_out: Option<EventsOutTx>) -> Self {
        self.events_out = events_out;
        self
    }

    pub fn progress_bar(mut self, enabled: bool) -> Self {
        self.progress_bar = enabled;
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            renderer: self.renderer,
            events_out: self.events_out,
            progress_bar: self.progress_bar,
        }
    }
}

/// Run with a default [`Engine`]: no renderer, no events-out, no progress bar.
pub async fn run_tasks<I, W>(
    items: Vec<I>,
    max_concurrency: usize,
    task: &W,
    task_options: TaskOptions,
    options: RunOptions<I>,
) -> RunResult<I, W::Output>
where
    I: WorkItem,
    W: WorkTask<I>,
{
    Engine::new()
        .run(items, max_concurrency, task, task_options, options)
        .await
}
