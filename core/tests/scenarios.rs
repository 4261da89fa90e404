mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{fast_options, urls, ProbeTask};
use fanout_core::api::{
    run_tasks, sort_by_input_order, task_fn, DispatchMode, LogLevel, RetryDelay, TaskError,
    TaskOptions,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn all_items_succeed_without_retries() {
    let inputs = urls(5);
    let task = ProbeTask::echo(Duration::from_millis(5));

    let result = run_tasks(
        inputs.clone(),
        2,
        task.as_ref(),
        TaskOptions::new(),
        fast_options(),
    )
    .await;

    let got: HashSet<_> = result.successful_results.iter().cloned().collect();
    let want: HashSet<_> = inputs.iter().cloned().collect();
    assert_eq!(got, want);
    assert_eq!(result.successful_results.len(), 5);
    assert_eq!(result.stats.total_failed, 0);
    assert_eq!(result.stats.total_retries, 0);
    assert!(result.is_success());
    assert!(task.peak() <= 2);
}

#[tokio::test]
async fn retryable_errors_exhaust_every_attempt() {
    let inputs = urls(3);
    let task = ProbeTask::new(Duration::ZERO, |_, _| Err(TaskError::timeout("upstream slow")));

    let result = run_tasks(
        inputs.clone(),
        3,
        task.as_ref(),
        TaskOptions::new(),
        fast_options().with_max_retries(2),
    )
    .await;

    for url in &inputs {
        assert_eq!(task.attempts_for(url), 3, "{url}");
    }
    assert_eq!(result.failed_items.len(), 3);
    for failed in &result.failed_items {
        assert_eq!(failed.attempts, 3);
        assert_eq!(failed.error, TaskError::timeout("upstream slow"));
    }
    assert_eq!(result.stats.total_retries, 6);
    assert!(result.successful_results.is_empty());
    assert_eq!(result.logs_at(LogLevel::Error).count(), 3);
}

#[tokio::test]
async fn non_retryable_error_fails_after_one_attempt() {
    let inputs = urls(4);
    let poisoned = inputs[2].clone();
    let task = ProbeTask::new(Duration::ZERO, move |item, _| {
        if item == poisoned {
            Err(TaskError::failed("malformed page"))
        } else {
            Ok(vec![item.to_string()])
        }
    });

    let result = run_tasks(
        inputs.clone(),
        2,
        task.as_ref(),
        TaskOptions::new(),
        fast_options().with_max_retries(1),
    )
    .await;

    assert_eq!(result.successful_results.len(), 3);
    assert_eq!(result.failed_items.len(), 1);
    assert_eq!(result.failed_items[0].item.as_deref(), Some(inputs[2].as_str()));
    assert_eq!(result.failed_items[0].attempts, 1);
    assert_eq!(result.stats.total_retries, 0);
    assert!(result
        .logs_at(LogLevel::Error)
        .any(|e| e.message.contains("non-retryable")));
}

#[tokio::test]
async fn cancellation_after_first_completion_keeps_partial_results() {
    let inputs = urls(10);
    let task = ProbeTask::echo(Duration::from_millis(40));
    let options = fast_options().with_dispatch_mode(DispatchMode::Streaming);
    let token = options.cancellation.clone();
    let options = options.on_progress(move |completed, _total, _stats| {
        let token = token.clone();
        async move {
            if completed == 1 {
                token.cancel();
            }
            Ok(())
        }
    });

    let result = run_tasks(inputs, 3, task.as_ref(), TaskOptions::new(), options).await;

    let completed = result.successful_results.len() + result.failed_items.len();
    assert!((1..=3).contains(&completed), "completed {completed}");
    let succeeded: HashSet<_> = result.successful_results.iter().collect();
    assert!(result
        .failed_work_items()
        .all(|item| !succeeded.contains(item)));
    assert!(result.cancelled);
    assert!(task.total_attempts() <= 3);
    assert!(result.logs_at(LogLevel::Warn).any(|e| e.message.contains("cancelled")));
}

#[tokio::test]
async fn cancellation_interrupts_retry_delay() {
    let task = ProbeTask::new(Duration::ZERO, |_, _| Err(TaskError::timeout("slow")));
    let options = fast_options()
        .with_max_retries(5)
        .with_retry_delay(RetryDelay::Fixed(Duration::from_secs(10)));
    let token = options.cancellation.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        run_tasks(urls(1), 1, task.as_ref(), TaskOptions::new(), options),
    )
    .await
    .expect("cancellation should cut the delay short");

    assert!(result.cancelled);
    assert!(result.failed_items.is_empty());
    assert_eq!(task.total_attempts(), 1);
    assert_eq!(result.stats.total_retries, 0);
    assert!(result
        .log_history
        .iter()
        .any(|e| e.message.contains("cancelled during retry delay")));
}

#[tokio::test]
async fn panicking_task_fails_only_its_own_item() {
    let task = task_fn(|item: String, _opts: TaskOptions| async move {
        if item == "b" {
            panic!("task blew up");
        }
        Ok(vec![item])
    });
    let inputs: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();

    let result = run_tasks(
        inputs,
        2,
        &task,
        TaskOptions::new(),
        fast_options().with_max_retries(3),
    )
    .await;

    let mut got = result.successful_results.clone();
    got.sort();
    assert_eq!(got, vec!["a".to_string(), "c".to_string()]);
    assert_eq!(result.failed_items.len(), 1);
    assert_eq!(result.failed_items[0].item.as_deref(), Some("b"));
    assert_eq!(result.failed_items[0].attempts, 1);
    assert_eq!(
        result.failed_items[0].error,
        TaskError::failed("task panicked: task blew up")
    );
    assert_eq!(result.stats.total_succeeded, 2);
    assert_eq!(result.stats.total_failed, 1);
    assert!(!result.cancelled);
}

#[tokio::test]
async fn pre_cancelled_run_returns_synthetic_failure() {
    let task = ProbeTask::echo(Duration::ZERO);
    let options = fast_options();
    options.cancellation.cancel();

    let result = run_tasks(urls(4), 2, task.as_ref(), TaskOptions::new(), options).await;

    assert!(result.cancelled);
    assert!(result.successful_results.is_empty());
    assert_eq!(result.failed_items.len(), 1);
    assert_eq!(result.failed_items[0].item, None);
    assert_eq!(result.failed_items[0].error.kind(), "setup");
    assert_eq!(result.stats.total_provided, 4);
    assert_eq!(result.stats.total_attempted, 0);
    assert!(result.stats.end_time.is_some());
    assert_eq!(task.total_attempts(), 0);
}

#[tokio::test]
async fn zero_concurrency_is_a_setup_failure() {
    let task = ProbeTask::echo(Duration::ZERO);
    let result = run_tasks(urls(2), 0, task.as_ref(), TaskOptions::new(), fast_options()).await;

    assert!(!result.cancelled);
    assert_eq!(result.failed_items.len(), 1);
    assert!(matches!(result.failed_items[0].error, TaskError::Setup(_)));
    assert_eq!(task.total_attempts(), 0);
}

#[tokio::test]
async fn empty_input_completes_immediately() {
    let task = ProbeTask::echo(Duration::ZERO);
    let result = run_tasks(Vec::new(), 4, task.as_ref(), TaskOptions::new(), fast_options()).await;

    assert!(result.is_success());
    assert_eq!(result.stats.total_attempted, 0);
    assert!(result.stats.end_time.is_some());
}

#[tokio::test]
async fn chunked_mode_keeps_duplicates() {
    let inputs = vec!["a".to_string(), "b".to_string(), "a".to_string()];
    let task = ProbeTask::echo(Duration::ZERO);

    let result = run_tasks(
        inputs,
        2,
        task.as_ref(),
        TaskOptions::new(),
        fast_options().with_dispatch_mode(DispatchMode::Chunked),
    )
    .await;

    assert_eq!(result.successful_results.len(), 3);
    assert_eq!(result.stats.total_attempted, 3);
    assert_eq!(task.attempts_for("a"), 2);
}

#[tokio::test]
async fn chunked_mode_stops_at_chunk_boundary_on_cancel() {
    let inputs = urls(6);
    let task = ProbeTask::echo(Duration::from_millis(10));
    let options = fast_options().with_dispatch_mode(DispatchMode::Chunked);
    let token = options.cancellation.clone();
    let options = options.on_progress(move |completed, _, _| {
        let token = token.clone();
        async move {
            if completed == 2 {
                token.cancel();
            }
            Ok(())
        }
    });

    let result = run_tasks(inputs, 2, task.as_ref(), TaskOptions::new(), options).await;

    assert!(result.cancelled);
    assert_eq!(result.successful_results.len(), 2);
    assert_eq!(task.total_attempts(), 2);
    assert!(result
        .logs_at(LogLevel::Warn)
        .any(|e| e.message.contains("skipping 4 remaining")));
}

#[tokio::test]
async fn flaky_item_recovers_on_retry() {
    let task = ProbeTask::new(Duration::ZERO, |item, attempt| {
        if attempt < 2 {
            Err(TaskError::timeout("first try times out"))
        } else {
            Ok(vec![item.to_string()])
        }
    });

    let result = run_tasks(
        urls(2),
        2,
        task.as_ref(),
        TaskOptions::new(),
        fast_options().with_max_retries(3),
    )
    .await;

    assert!(result.is_success());
    assert_eq!(result.stats.total_retries, 2);
    assert_eq!(result.logs_at(LogLevel::Success).count(), 2);
    assert!(result
        .logs_at(LogLevel::Success)
        .all(|e| e.attempt == Some(2)));
}

#[tokio::test]
async fn on_error_receives_final_failure() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let task = ProbeTask::new(Duration::ZERO, |_, _| Err(TaskError::failed("nope")));
    let options = fast_options().on_error(move |error, item: String, attempts| {
        let counter = counter.clone();
        async move {
            assert_eq!(error, TaskError::failed("nope"));
            assert!(item.starts_with("https://"));
            assert_eq!(attempts, 1);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    let result = run_tasks(urls(3), 2, task.as_ref(), TaskOptions::new(), options).await;

    assert_eq!(result.failed_items.len(), 3);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn results_can_be_restored_to_input_order() {
    let inputs = urls(6);
    let task = ProbeTask::new(Duration::ZERO, |item, _| Ok(vec![item.to_string()]));

    let result = run_tasks(
        inputs.clone(),
        3,
        task.as_ref(),
        TaskOptions::new(),
        fast_options(),
    )
    .await;

    let mut ordered = result.successful_results.clone();
    sort_by_input_order(&mut ordered, &inputs, |r| r);
    assert_eq!(ordered, inputs);
}
