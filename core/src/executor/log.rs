//! Append-only, timestamped execution log.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events_out::{write_log_entry, EventsOutTx};

use super::traits::{OutputRendererPlugin, RenderEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
    Success,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Debug => "DEBUG",
            Self::Success => "SUCCESS",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            item: None,
            attempt: None,
        }
    }

    pub fn with_item(mut self, item: impl fmt::Display) -> Self {
        self.item = Some(item.to_string());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }
}

/// Ordered log history of one run. Order is append order.
#[derive(Debug, Clone, Default)]
pub struct LogHistory {
    entries: Vec<LogEntry>,
}

impl LogHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

/// Mirrors recorded entries to the console (tracing or a renderer) and to events-out.
#[derive(Clone, Default)]
pub struct LogSink {
    run_id: String,
    log_to_console: bool,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    events_out: Option<EventsOutTx>,
}

impl LogSink {
    pub fn new(
        run_id: impl Into<String>,
        log_to_console: bool,
        renderer: Option<Arc<dyn OutputRendererPlugin>>,
        events_out: Option<EventsOutTx>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            log_to_console,
            renderer,
            events_out,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn render(&self, event: &RenderEvent) {
        if let Some(renderer) = &self.renderer {
            renderer.render(event);
        }
    }

    pub async fn emit(&self, entry: &LogEntry) {
        if self.log_to_console {
            if let Some(renderer) = &self.renderer {
                renderer.render(&RenderEvent::Log {
                    run_id: self.run_id.clone(),
                    entry: entry.clone(),
                });
            } else {
                trace_entry(&self.run_id, entry);
            }
        }
        write_log_entry(self.events_out.as_ref(), &self.run_id, entry).await;
    }
}

fn trace_entry(run_id: &str, entry: &LogEntry) {
    let item = entry.item.as_deref().unwrap_or("-");
    let attempt = entry.attempt.unwrap_or(0);
    match entry.level {
        LogLevel::Debug => {
            tracing::debug!(run_id = %run_id, item = %item, attempt, "{}", entry.message)
        }
        LogLevel::Info | LogLevel::Success => {
            tracing::info!(run_id = %run_id, item = %item, attempt, level = %entry.level, "{}", entry.message)
        }
        LogLevel::Warn => {
            tracing::warn!(run_id = %run_id, item = %item, attempt, "{}", entry.message)
        }
        LogLevel::Error => {
            tracing::error!(run_id = %run_id, item = %item, attempt, "{}", entry.message)
        }
    }
}
