use std::path::Path;

use fanout_core::api::{
    export_to_file, sort_by_input_order, start_events_out, AppConfig, CancellationToken,
    CliError, DispatchMode, Engine, EngineError, RunResult, TaskOptions,
};
use fanout_plugins::factory::{
    build_http_task, build_renderer, build_retry_delay, build_run_options,
};
use fanout_plugins::task::PageRecord;
use tokio::io::AsyncReadExt;

use super::cli::{FormatArg, ModeArg, RunArgs};

/// Fold command-line flags over the loaded configuration. Flags win.
pub fn apply_overrides(args: &RunArgs, cfg: &mut AppConfig) {
    if let Some(n) = args.concurrency {
        cfg.engine.max_concurrency = n;
    }
    if let Some(mode) = args.mode {
        cfg.engine.dispatch_mode = match mode {
            ModeArg::Streaming => DispatchMode::Streaming,
            ModeArg::Chunked => DispatchMode::Chunked,
        };
    }
    if let Some(n) = args.max_retries {
        cfg.engine.retry.max_retries = n;
    }
    if let Some(strategy) = args.retry_strategy {
        cfg.engine.retry.strategy = strategy.as_str().to_string();
    }
    if let Some(ms) = args.retry_delay_ms {
        cfg.engine.retry.base_delay_ms = ms;
    }
    if let Some(ms) = args.timeout_ms {
        cfg.http.timeout_ms = ms;
    }
    for category in &args.block {
        let category = category.trim().to_ascii_lowercase();
        if !category.is_empty() && !cfg.http.resource_filter.contains(&category) {
            cfg.http.resource_filter.push(category);
        }
    }
    if let Some(format) = args.format {
        cfg.output.format = match format {
            FormatArg::Text => "text".to_string(),
            FormatArg::Jsonl => "jsonl".to_string(),
        };
    }
    if args.progress {
        cfg.engine.progress_bar = true;
    }
    if args.ascii {
        cfg.output.ascii_only = true;
    }
}

/// Reject engine settings that could never start a run.
pub fn check_engine_config(cfg: &AppConfig) -> Result<(), EngineError> {
    if cfg.engine.max_concurrency == 0 {
        return Err(EngineError::InvalidConfig(
            "max_concurrency must be at least 1".into(),
        ));
    }
    build_retry_delay(&cfg.engine.retry)?;
    Ok(())
}

/// One URL per line; blank lines and `#` comments are skipped.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

async fn collect_urls(args: &RunArgs) -> Result<Vec<String>, CliError> {
    let mut urls: Vec<String> = args
        .urls
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();

    if let Some(input) = args.input.as_deref() {
        let text = if input == "-" {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        } else {
            tokio::fs::read_to_string(input)
                .await
                .map_err(|e| CliError::Command(format!("failed to read {input}: {e}")))?
        };
        urls.extend(parse_url_list(&text));
    }

    Ok(urls)
}

/// 0 when everything succeeded, 3 when the run was cancelled, 2 when any item failed.
pub fn exit_code_for_result<I, T>(result: &RunResult<I, T>) -> i32 {
    if result.cancelled {
        3
    } else if !result.failed_items.is_empty() {
        2
    } else {
        0
    }
}

fn write_result_json(result: &RunResult<String, PageRecord>, path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(result).map_err(anyhow::Error::from)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn print_failures(result: &RunResult<String, PageRecord>) {
    for failed in &result.failed_items {
        match &failed.item {
            Some(url) => eprintln!(
                "failed: {url} after {} attempt(s): {}",
                failed.attempts, failed.error
            ),
            None => eprintln!("run failed: {}", failed.error),
        }
    }
}

pub async fn run(args: RunArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    apply_overrides(&args, &mut cfg);
    check_engine_config(&cfg)?;

    let urls = collect_urls(&args).await?;
    if urls.is_empty() {
        return Err(CliError::Command(
            "no URLs given (pass them as arguments or via --input)".into(),
        ));
    }

    let task = build_http_task(&cfg).map_err(|e| CliError::Config(e.to_string()))?;
    let token = CancellationToken::new();
    let options = build_run_options::<String>(&cfg)?
        .with_cancellation(token.clone())
        .with_retry_classifier(task.retry_classifier());
    let task_options = TaskOptions::new()
        .with_cancellation(token.clone())
        .with_resource_filter(cfg.http.resource_filter.clone());

    let (events_tx, events_handle) = match start_events_out(&cfg.events_out).await? {
        Some((tx, handle)) => (Some(tx), Some(handle)),
        None => (None, None),
    };

    let text_output = cfg.output.format != "jsonl";
    let engine = Engine::builder()
        .renderer(build_renderer(&cfg.output.format, cfg.output.ascii_only))
        .events_out(events_tx)
        .progress_bar(cfg.engine.progress_bar && text_output)
        .build();

    let signal_token = token.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            signal_token.cancel();
        }
    });

    let mut result = engine
        .run(
            urls.clone(),
            cfg.engine.max_concurrency,
            &task,
            task_options,
            options,
        )
        .await;
    ctrl_c.abort();

    // The writer task ends once every sender is gone.
    drop(engine);
    if let Some(handle) = events_handle {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "events_out writer task failed");
        }
    }

    if args.sort_by_input {
        sort_by_input_order(&mut result.successful_results, &urls, |page| &page.url);
    }
    if let Some(path) = args.log_csv.as_deref() {
        export_to_file(&result.log_history, path, ',')?;
        tracing::info!(path = %path.display(), "wrote execution log");
    }
    if let Some(path) = args.output.as_deref() {
        write_result_json(&result, path)?;
        tracing::info!(path = %path.display(), "wrote run result");
    }
    if text_output {
        print_failures(&result);
    }

    Ok(exit_code_for_result(&result))
}
