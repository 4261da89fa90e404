use fanout_core::executor::log::{LogEntry, LogLevel};
use fanout_core::executor::traits::{OutputRendererPlugin, RenderEvent};

pub struct TextRendererPlugin {
    ascii_only: bool,
    show_debug: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self {
            ascii_only,
            show_debug: false,
        }
    }

    pub fn with_debug(mut self, show_debug: bool) -> Self {
        self.show_debug = show_debug;
        self
    }

    fn level_tag(&self, level: LogLevel) -> &'static str {
        match (level, self.ascii_only) {
            (LogLevel::Success, true) => "OK",
            (LogLevel::Success, false) => "✔ SUCCESS",
            (LogLevel::Error, true) => "FAIL",
            (LogLevel::Error, false) => "✖ ERROR",
            (LogLevel::Warn, true) => "WARN",
            (LogLevel::Warn, false) => "⚠ WARN",
            (level, _) => level.as_str(),
        }
    }

    fn format_entry(&self, entry: &LogEntry) -> String {
        let mut line = format!(
            "{} {:<9}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            self.level_tag(entry.level)
        );
        if let Some(item) = &entry.item {
            line.push_str(&format!(" [{item}"));
            if let Some(attempt) = entry.attempt {
                line.push_str(&format!(" #{attempt}"));
            }
            line.push(']');
        }
        line.push(' ');
        line.push_str(&entry.message);
        line
    }

    fn format_event(&self, event: &RenderEvent) -> Option<String> {
        match event {
            RenderEvent::RunStart {
                run_id,
                total_items,
                max_concurrency,
                dispatch_mode,
            } => Some(format!(
                "RUN START {} (items: {}, concurrency: {}, mode: {})",
                run_id, total_items, max_concurrency, dispatch_mode
            )),
            RenderEvent::Log { entry, .. } => {
                if entry.level == LogLevel::Debug && !self.show_debug {
                    return None;
                }
                Some(self.format_entry(entry))
            }
            RenderEvent::RunEnd {
                run_id,
                stats,
                failed_items,
                cancelled,
            } => {
                let status = if *cancelled {
                    "CANCELLED"
                } else if *failed_items == 0 {
                    "OK"
                } else {
                    "PARTIAL"
                };
                Some(format!(
                    "RUN END {} ({}: succeeded {}, failed {}, retries {}, duration {}ms)",
                    run_id,
                    status,
                    stats.total_succeeded,
                    stats.total_failed,
                    stats.total_retries,
                    stats.duration_ms
                ))
            }
        }
    }
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        if let Some(line) = self.format_event(event) {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_core::executor::stats::RunStats;

    fn log_event(level: LogLevel) -> RenderEvent {
        RenderEvent::Log {
            run_id: "run".to_string(),
            entry: LogEntry::new(level, "attempt failed: timeout")
                .with_item("https://a.com")
                .with_attempt(2),
        }
    }

    #[test]
    fn test_text_renderer_log_line() {
        let renderer = TextRendererPlugin::new(true);
        let line = renderer.format_event(&log_event(LogLevel::Error)).unwrap();
        assert!(line.contains("FAIL"));
        assert!(line.contains("[https://a.com #2]"));
        assert!(line.ends_with("attempt failed: timeout"));
        assert!(line.is_ascii());
    }

    #[test]
    fn test_text_renderer_hides_debug_by_default() {
        let renderer = TextRendererPlugin::new(false);
        assert!(renderer.format_event(&log_event(LogLevel::Debug)).is_none());
        let verbose = TextRendererPlugin::new(false).with_debug(true);
        assert!(verbose.format_event(&log_event(LogLevel::Debug)).is_some());
    }

    #[test]
    fn test_text_renderer_run_end() {
        let renderer = TextRendererPlugin::new(true);
        let mut stats = RunStats::begin(3);
        stats.record_success();
        stats.record_failure();
        let line = renderer
            .format_event(&RenderEvent::RunEnd {
                run_id: "run".to_string(),
                stats,
                failed_items: 1,
                cancelled: false,
            })
            .unwrap();
        assert!(line.contains("PARTIAL"));
        assert!(line.contains("succeeded 1, failed 1"));
    }
}
