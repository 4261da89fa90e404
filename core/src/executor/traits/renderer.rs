use crate::executor::log::LogEntry;
use crate::executor::stats::RunStats;
use crate::executor::types::DispatchMode;

/// Output renderer plugin (controls how run events reach the console).
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Render events emitted by the engine during a run.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        total_items: usize,
        max_concurrency: usize,
        dispatch_mode: DispatchMode,
    },
    Log {
        run_id: String,
        entry: LogEntry,
    },
    RunEnd {
        run_id: String,
        stats: RunStats,
        failed_items: usize,
        cancelled: bool,
    },
}
