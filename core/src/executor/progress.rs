use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Final marker shown on an item's spinner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Succeeded,
    Failed,
    Cancelled,
}

impl ItemStatus {
    fn icon(self) -> &'static str {
        match self {
            Self::Succeeded => "✅",
            Self::Failed => "❌",
            Self::Cancelled => "⏹",
        }
    }
}

/// Terminal progress for a run: one overall bar plus a spinner per in-flight item.
///
/// Every method is a no-op when disabled, so callers never branch on it.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    /// Keyed by handle, not label: chunked runs may carry the same item twice.
    item_bars: Mutex<HashMap<usize, ProgressBar>>,
    next_id: AtomicUsize,
    enabled: bool,
}

impl ProgressMonitor {
    pub fn new(total_items: usize, enabled: bool) -> Self {
        let multi = MultiProgress::new();
        if !enabled {
            return Self {
                multi,
                overall: ProgressBar::hidden(),
                item_bars: Mutex::new(HashMap::new()),
                next_id: AtomicUsize::new(0),
                enabled: false,
            };
        }

        let overall = multi.add(ProgressBar::new(total_items as u64));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} items ({percent}%) {msg}")
        {
            overall.set_style(style.progress_chars("█▓▒░  "));
        }
        overall.set_message("Starting...");

        Self {
            multi,
            overall,
            item_bars: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start a spinner for an item; the returned handle completes it.
    pub fn add_item(&self, label: &str) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if !self.enabled {
            return id;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        bar.set_message(format!("⏳ {label}"));
        bar.enable_steady_tick(Duration::from_millis(100));

        self.item_bars
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, bar);
        id
    }

    pub fn complete_item(&self, id: usize, label: &str, status: ItemStatus, duration_ms: u64) {
        if !self.enabled {
            return;
        }

        let bar = self
            .item_bars
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        if let Some(bar) = bar {
            bar.finish_with_message(format!("{} {label} ({duration_ms}ms)", status.icon()));
        }

        if status != ItemStatus::Cancelled {
            self.overall.inc(1);
        }
    }

    pub fn set_message(&self, msg: &str) {
        if self.enabled {
            self.overall.set_message(msg.to_string());
        }
    }

    pub fn finish(&self, success: bool, cancelled: bool) {
        if !self.enabled {
            return;
        }

        let msg = if cancelled {
            "⏹ Run cancelled"
        } else if success {
            "✅ All items completed"
        } else {
            "❌ Some items failed"
        };
        self.overall.finish_with_message(msg.to_string());
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        let bars = self.item_bars.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, bar) in bars.drain() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_monitor_still_hands_out_ids() {
        let monitor = ProgressMonitor::new(2, false);
        let a = monitor.add_item("a");
        let b = monitor.add_item("a");
        assert_ne!(a, b);
        monitor.complete_item(a, "a", ItemStatus::Succeeded, 10);
        monitor.finish(true, false);
    }

    #[test]
    fn duplicate_labels_get_separate_spinners() {
        let monitor = ProgressMonitor::new(2, true);
        let first = monitor.add_item("same");
        let second = monitor.add_item("same");

        monitor.complete_item(first, "same", ItemStatus::Succeeded, 5);
        assert_eq!(monitor.item_bars.lock().unwrap().len(), 1);
        monitor.complete_item(second, "same", ItemStatus::Failed, 7);
        assert!(monitor.item_bars.lock().unwrap().is_empty());
        monitor.finish(false, false);
    }
}
