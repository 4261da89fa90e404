use serde::Serialize;

use crate::events_out::EventsOutTx;
use crate::executor::log::LogEntry;

/// Schema version stamped on every line.
const EVENTS_VERSION: u32 = 1;

#[derive(Serialize)]
struct LogLine<'a> {
    v: u32,
    #[serde(rename = "type")]
    ty: &'static str,
    run_id: &'a str,
    #[serde(flatten)]
    entry: &'a LogEntry,
}

pub async fn write_log_entry(out: Option<&EventsOutTx>, run_id: &str, entry: &LogEntry) {
    let Some(out) = out else {
        return;
    };
    let line = LogLine {
        v: EVENTS_VERSION,
        ty: "log",
        run_id,
        entry,
    };
    if let Ok(line) = serde_json::to_string(&line) {
        out.send_line(line).await;
    }
}

/// Emit a run-level event (`run.start`, `run.end`) with an arbitrary payload.
pub async fn write_run_event<P: Serialize>(
    out: Option<&EventsOutTx>,
    ty: &str,
    run_id: &str,
    payload: &P,
) {
    let Some(out) = out else {
        return;
    };
    let line = serde_json::json!({
        "v": EVENTS_VERSION,
        "type": ty,
        "run_id": run_id,
        "data": payload,
    });
    out.send_line(line.to_string()).await;
}
