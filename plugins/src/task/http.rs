//! HTTP fetch task: one GET per URL, summarised as a [`PageRecord`].

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fanout_core::api::{HttpTaskConfig, TaskError, TaskOptions, WorkTask};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix marking connection-level transport errors, which are worth retrying.
const CONNECT_PREFIX: &str = "connect: ";

const TITLE_LIMIT: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub title: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct HttpFetchTask {
    http: reqwest::Client,
    retry_on_status: Arc<Vec<u16>>,
}

impl HttpFetchTask {
    pub fn new(cfg: &HttpTaskConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            retry_on_status: Arc::new(cfg.retry_on_status.clone()),
        })
    }

    /// Retry timeouts, connect failures and the configured HTTP statuses.
    pub fn retry_classifier(&self) -> impl Fn(&TaskError) -> bool + Send + Sync + 'static {
        let statuses = self.retry_on_status.clone();
        move |err: &TaskError| match err {
            TaskError::Timeout(_) => true,
            TaskError::Transport(msg) => msg.starts_with(CONNECT_PREFIX),
            TaskError::Http { status, .. } => statuses.contains(status),
            _ => false,
        }
    }

    async fn fetch(&self, url: &str) -> Result<PageRecord, TaskError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status();
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let header_length = resp.content_length();

        if !status.is_success() {
            return Err(TaskError::Http {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let body = resp.text().await.map_err(map_reqwest_error)?;
        let is_html = content_type
            .as_deref()
            .map(|ct| ct.contains("html"))
            .unwrap_or(false);

        Ok(PageRecord {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            content_type,
            content_length: header_length.or(Some(body.len() as u64)),
            title: if is_html { extract_title(&body) } else { None },
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl WorkTask<String> for HttpFetchTask {
    type Output = PageRecord;

    async fn run(&self, item: &String, options: &TaskOptions) -> Result<Vec<PageRecord>, TaskError> {
        if let Some(category) = resource_category(item) {
            if options.filters(category) {
                tracing::debug!(url = %item, category, "skipping filtered resource");
                return Ok(Vec::new());
            }
        }

        tokio::select! {
            biased;
            _ = options.cancellation.cancelled() => {
                Err(TaskError::aborted(format!("request to {item} cancelled")))
            }
            res = self.fetch(item) => res.map(|page| vec![page]),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TaskError {
    if err.is_timeout() {
        TaskError::Timeout(err.to_string())
    } else if err.is_connect() {
        TaskError::Transport(format!("{CONNECT_PREFIX}{err}"))
    } else if let Some(status) = err.status() {
        TaskError::Http {
            status: status.as_u16(),
            message: err.to_string(),
        }
    } else {
        TaskError::Transport(err.to_string())
    }
}

/// Sub-resource category of a URL, judged by its path extension.
pub fn resource_category(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.split_once("://").map(|(_, rest)| rest).unwrap_or(path);
    let file = path.split_once('/').map(|(_, p)| p)?.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;

    match ext.to_ascii_lowercase().as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "ico" | "bmp" | "avif" => Some("image"),
        "woff" | "woff2" | "ttf" | "otf" | "eot" => Some("font"),
        "mp4" | "webm" | "mp3" | "ogg" | "wav" | "mov" | "m4a" | "avi" => Some("media"),
        "css" => Some("stylesheet"),
        "js" | "mjs" => Some("script"),
        _ => None,
    }
}

fn title_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok())
        .as_ref()
}

fn extract_title(body: &str) -> Option<String> {
    let raw = title_regex()?.captures(body)?.get(1)?.as_str();
    let title: String = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(TITLE_LIMIT)
        .collect();
    (!title.is_empty()).then_some(title)
}
