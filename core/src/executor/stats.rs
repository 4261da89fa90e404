use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Run-wide counters and timing.
///
/// Mutated only while the run state lock is held; callbacks receive snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    /// Items handed to the run, before deduplication.
    pub total_provided: usize,
    /// Items actually scheduled, after deduplication.
    pub total_attempted: usize,
    pub total_succeeded: usize,
    pub total_failed: usize,
    pub total_retries: usize,
}

impl RunStats {
    pub fn begin(total_provided: usize) -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
            duration_ms: 0,
            total_provided,
            total_attempted: 0,
            total_succeeded: 0,
            total_failed: 0,
            total_retries: 0,
        }
    }

    pub fn set_attempted(&mut self, n: usize) {
        self.total_attempted = n;
    }

    pub fn record_success(&mut self) {
        self.total_succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.total_failed += 1;
    }

    pub fn record_retry(&mut self) {
        self.total_retries += 1;
    }

    /// Items with a final success or failure outcome.
    pub fn completed(&self) -> usize {
        self.total_succeeded + self.total_failed
    }

    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    /// Copy with `duration_ms` measured up to now, for in-flight reporting.
    pub fn snapshot(&self) -> Self {
        let mut snap = self.clone();
        if snap.end_time.is_none() {
            snap.duration_ms = elapsed_ms(snap.start_time, Utc::now());
        }
        snap
    }

    /// Stamp `end_time` and recompute the duration. Later calls are no-ops.
    pub fn finalize(&mut self, now: DateTime<Utc>) {
        if self.end_time.is_some() {
            return;
        }
        self.end_time = Some(now);
        self.duration_ms = elapsed_ms(self.start_time, now);
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::begin(0)
    }
}

fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_milliseconds().max(0) as u64
}
