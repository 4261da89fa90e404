use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, TaskError};
use crate::executor::hooks::{CallbackFuture, ErrorCallback, ProgressCallback};
use crate::executor::stats::RunStats;
use crate::executor::traits::BackoffStrategy;

/// How work items are handed to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Shared queue drained by `min(max_concurrency, n)` workers; duplicates collapse.
    #[default]
    Streaming,
    /// Sequential chunks of `max_concurrency` items; duplicates are kept.
    Chunked,
}

impl DispatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Chunked => "chunked",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "streaming" | "stream" | "pool" => Ok(Self::Streaming),
            "chunked" | "chunk" | "batched" => Ok(Self::Chunked),
            other => Err(EngineError::InvalidConfig(format!(
                "unknown dispatch mode '{other}' (expected streaming|chunked)"
            ))),
        }
    }
}

/// Delay between a failed attempt and the next one.
#[derive(Clone)]
pub enum RetryDelay {
    Fixed(Duration),
    /// `base × attempt`
    Linear(Duration),
    Strategy(Arc<dyn BackoffStrategy>),
}

impl RetryDelay {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self::Strategy(Arc::new(FnBackoff { f }))
    }

    /// Delay after the given 1-based attempt failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(d) => *d,
            Self::Linear(base) => base.saturating_mul(attempt.max(1)),
            Self::Strategy(strategy) => strategy.delay(attempt),
        }
    }

    /// Builds the delays the core understands; other strategies live in plugin crates.
    pub fn from_config(cfg: &RetryConfig) -> Result<Self, EngineError> {
        let base = Duration::from_millis(cfg.base_delay_ms);
        match cfg.strategy.as_str() {
            "fixed" => Ok(Self::Fixed(base)),
            "linear" => Ok(Self::Linear(base)),
            other => Err(EngineError::UnknownRetryStrategy(other.to_string())),
        }
    }
}

impl Default for RetryDelay {
    fn default() -> Self {
        Self::Linear(Duration::from_millis(default_base_delay_ms()))
    }
}

impl fmt::Debug for RetryDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            Self::Linear(d) => f.debug_tuple("Linear").field(d).finish(),
            Self::Strategy(s) => f.debug_tuple("Strategy").field(&s.name()).finish(),
        }
    }
}

struct FnBackoff<F> {
    f: F,
}

impl<F> BackoffStrategy for FnBackoff<F>
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn name(&self) -> &str {
        "fn"
    }

    fn delay(&self, attempt: u32) -> Duration {
        (self.f)(attempt)
    }
}

pub type RetryClassifier = Arc<dyn Fn(&TaskError) -> bool + Send + Sync>;

/// Only timeout-class errors are worth another attempt by default.
pub fn default_is_retryable(err: &TaskError) -> bool {
    err.is_timeout()
}

/// Per-run engine options. Immutable for the duration of a run.
pub struct RunOptions<I> {
    pub dispatch_mode: DispatchMode,

    /// Additional attempts after the first one.
    pub max_retries: u32,

    pub retry_delay: RetryDelay,

    /// Observed before each attempt, before each queue pop / chunk, and during retry delays.
    pub cancellation: CancellationToken,

    pub is_retryable: RetryClassifier,

    pub on_progress: Option<ProgressCallback>,

    pub on_error: Option<ErrorCallback<I>>,

    /// Mirror every log entry to tracing (or the engine's renderer) as it is recorded.
    pub log_to_console: bool,
}

impl<I> Default for RunOptions<I> {
    fn default() -> Self {
        Self {
            dispatch_mode: DispatchMode::default(),
            max_retries: default_max_retries(),
            retry_delay: RetryDelay::default(),
            cancellation: CancellationToken::new(),
            is_retryable: Arc::new(default_is_retryable),
            on_progress: None,
            on_error: None,
            log_to_console: false,
        }
    }
}

impl<I> Clone for RunOptions<I> {
    fn clone(&self) -> Self {
        Self {
            dispatch_mode: self.dispatch_mode,
            max_retries: self.max_retries,
            retry_delay: self.retry_delay.clone(),
            cancellation: self.cancellation.clone(),
            is_retryable: self.is_retryable.clone(),
            on_progress: self.on_progress.clone(),
            on_error: self.on_error.clone(),
            log_to_console: self.log_to_console,
        }
    }
}

impl<I> fmt::Debug for RunOptions<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("dispatch_mode", &self.dispatch_mode)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("on_progress", &self.on_progress.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("log_to_console", &self.log_to_console)
            .finish()
    }
}

impl<I: Send + 'static> RunOptions<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from the `[engine]` config section. Retry strategies the core does not know
    /// fall back to the linear default; plugin factories build the rest.
    pub fn from_config(cfg: &EngineConfig) -> Self {
        let retry_delay = RetryDelay::from_config(&cfg.retry).unwrap_or_else(|err| {
            tracing::debug!(error = %err, "falling back to linear retry delay");
            RetryDelay::Linear(Duration::from_millis(cfg.retry.base_delay_ms))
        });
        Self {
            dispatch_mode: cfg.dispatch_mode,
            max_retries: cfg.retry.max_retries,
            retry_delay,
            log_to_console: cfg.log_to_console,
            ..Self::default()
        }
    }

    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: RetryDelay) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_retry_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&TaskError) -> bool + Send + Sync + 'static,
    {
        self.is_retryable = Arc::new(classifier);
        self
    }

    pub fn with_log_to_console(mut self, enabled: bool) -> Self {
        self.log_to_console = enabled;
        self
    }

    pub fn on_progress<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize, RunStats) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_progress = Some(Arc::new(
            move |completed, total, stats| -> CallbackFuture {
                Box::pin(callback(completed, total, stats))
            },
        ));
        self
    }

    pub fn on_error<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(TaskError, I, u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |error, item, attempts| -> CallbackFuture {
            Box::pin(callback(error, item, attempts))
        }));
        self
    }
}

/// `[engine]` section of the application config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default)]
    pub dispatch_mode: DispatchMode,

    #[serde(default = "default_log_to_console")]
    pub log_to_console: bool,

    /// Enable the terminal progress bar (text output only).
    #[serde(default)]
    pub progress_bar: bool,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            dispatch_mode: DispatchMode::default(),
            log_to_console: default_log_to_console(),
            progress_bar: false,
            retry: RetryConfig::default(),
        }
    }
}

fn default_max_concurrency() -> usize {
    4
}

fn default_log_to_console() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// `fixed`, `linear` or `exponential-backoff`
    #[serde(default = "default_retry_strategy")]
    pub strategy: String,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Jitter ratio in `0.0..=1.0`, only honoured by strategies that support it.
    #[serde(default)]
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: default_retry_strategy(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
            jitter: 0.0,
        }
    }
}

fn default_retry_strategy() -> String {
    "linear".to_string()
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    2
}
