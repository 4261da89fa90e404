use chrono::Utc;
use fanout_core::executor::traits::{OutputRendererPlugin, RenderEvent};
use serde_json::{json, Value};

pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        match event {
            RenderEvent::RunStart {
                run_id,
                total_items,
                max_concurrency,
                dispatch_mode,
            } => json!({
                "v": 1,
                "event_type": "run.start",
                "ts": Utc::now().to_rfc3339(),
                "run_id": run_id,
                "metadata": {
                    "total_items": total_items,
                    "max_concurrency": max_concurrency,
                    "dispatch_mode": dispatch_mode,
                }
            }),
            RenderEvent::Log { run_id, entry } => json!({
                "v": 1,
                "event_type": "log",
                "ts": entry.timestamp.to_rfc3339(),
                "run_id": run_id,
                "level": entry.level,
                "message": entry.message,
                "item": entry.item,
                "attempt": entry.attempt,
            }),
            RenderEvent::RunEnd {
                run_id,
                stats,
                failed_items,
                cancelled,
            } => json!({
                "v": 1,
                "event_type": "run.end",
                "ts": Utc::now().to_rfc3339(),
                "run_id": run_id,
                "metadata": {
                    "stats": stats,
                    "failed_items": failed_items,
                    "cancelled": cancelled,
                }
            }),
        }
    }
}

impl OutputRendererPlugin for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}
