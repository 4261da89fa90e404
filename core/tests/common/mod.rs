#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fanout_core::api::{RetryDelay, RunOptions, TaskError, TaskOptions, WorkTask};

pub fn urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://example.com/{i}")).collect()
}

/// Options with no retry delay so retry-heavy tests stay fast.
pub fn fast_options() -> RunOptions<String> {
    RunOptions::new().with_retry_delay(RetryDelay::Fixed(Duration::ZERO))
}

type Behaviour = dyn Fn(&str, usize) -> Result<Vec<String>, TaskError> + Send + Sync;

/// Test task that records attempts per item and the peak number of concurrent invocations.
pub struct ProbeTask {
    behaviour: Box<Behaviour>,
    work: Duration,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    attempts: Mutex<HashMap<String, usize>>,
}

impl ProbeTask {
    /// `behaviour(item, attempt)` decides the outcome of each attempt (1-based).
    pub fn new<F>(work: Duration, behaviour: F) -> Arc<Self>
    where
        F: Fn(&str, usize) -> Result<Vec<String>, TaskError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            behaviour: Box::new(behaviour),
            work,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            attempts: Mutex::new(HashMap::new()),
        })
    }

    pub fn echo(work: Duration) -> Arc<Self> {
        Self::new(work, |item, _| Ok(vec![item.to_string()]))
    }

    pub fn attempts_for(&self, item: &str) -> usize {
        self.attempts.lock().unwrap().get(item).copied().unwrap_or(0)
    }

    pub fn total_attempts(&self) -> usize {
        self.attempts.lock().unwrap().values().sum()
    }

    pub fn attempts(&self) -> HashMap<String, usize> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkTask<String> for ProbeTask {
    type Output = String;

    async fn run(&self, item: &String, _options: &TaskOptions) -> Result<Vec<String>, TaskError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(item.clone()).or_insert(0);
            *n += 1;
            *n
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        let out = (self.behaviour)(item, attempt);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }
}
