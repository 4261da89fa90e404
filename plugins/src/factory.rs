use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use fanout_core::api::{
    AppConfig, EngineError, OutputRendererPlugin, RetryConfig, RetryDelay, RunOptions,
};

use crate::executor::{
    ExponentialBackoffPlugin, JsonlRendererPlugin, LinearRetryPlugin, TextRendererPlugin,
};
use crate::task::HttpFetchTask;

/// Map a `[engine.retry]` section onto a concrete delay policy.
pub fn build_retry_delay(cfg: &RetryConfig) -> Result<RetryDelay, EngineError> {
    match cfg.strategy.as_str() {
        "fixed" => Ok(RetryDelay::Fixed(Duration::from_millis(cfg.base_delay_ms))),
        "linear" => Ok(RetryDelay::Strategy(Arc::new(LinearRetryPlugin::new(
            cfg.clone(),
        )))),
        "exponential-backoff" | "exponential" => Ok(RetryDelay::Strategy(Arc::new(
            ExponentialBackoffPlugin::new(cfg.clone()),
        ))),
        other => Err(EngineError::UnknownRetryStrategy(other.to_string())),
    }
}

pub fn build_renderer(format: &str, ascii_only: bool) -> Arc<dyn OutputRendererPlugin> {
    match format {
        "jsonl" => Arc::new(JsonlRendererPlugin::new(false)),
        // Anything other than jsonl renders as text.
        _ => Arc::new(TextRendererPlugin::new(ascii_only)),
    }
}

pub fn build_http_task(cfg: &AppConfig) -> Result<HttpFetchTask> {
    HttpFetchTask::new(&cfg.http)
}

/// Engine options from config, with the retry policy resolved through the plugin strategies.
pub fn build_run_options<I: Send + 'static>(
    cfg: &AppConfig,
) -> Result<RunOptions<I>, EngineError> {
    let delay = build_retry_delay(&cfg.engine.retry)?;
    Ok(RunOptions::from_config(&cfg.engine).with_retry_delay(delay))
}
