//! Optional JSONL mirror of a run's log, written by a background task.

pub mod helpers;
pub mod writer;

pub use crate::config::EventsOutConfig;
pub use helpers::{write_log_entry, write_run_event};
pub use writer::{start_events_out, EventsOutTx};
