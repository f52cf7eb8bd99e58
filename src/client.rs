use crate::errors::FetchError;
use crate::models::Task;
use crate::normalize::normalize_task;
use crate::paginate::PageCursor;
use crate::query::TaskQuery;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// One page of normalized records plus the server's pagination hints.
#[derive(Debug, Clone, Default)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: Option<u64>,
    pub next: Option<String>,
}

/// A single filtered page request. Implemented over HTTP by [`TaskApiClient`]
/// and by in-memory fakes in tests.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, query: &TaskQuery, cursor: &PageCursor) -> Result<TaskPage, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 0,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskApiClient {
    http: reqwest::Client,
    list_url: String,
    options: ClientOptions,
}

impl TaskApiClient {
    /// `base_url` is the REST root; `tasks.task.list` is appended.
    pub fn new(base_url: &str, options: ClientOptions) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;
        Ok(Self {
            http,
            list_url: format!("{}/tasks.task.list", base_url.trim_end_matches('/')),
            options,
        })
    }

    async fn request_once(&self, query: &TaskQuery, cursor: &PageCursor) -> Result<TaskPage, FetchError> {
        let response = self
            .http
            .get(&self.list_url)
            .query(query.params())
            .query(&[("start", cursor.start())])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let description = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|value| error_description(&value));
            return Err(FetchError::Http {
                status: status.as_u16(),
                description,
            });
        }

        let value: Value = serde_json::from_slice(&body).map_err(|err| FetchError::MalformedBody {
            message: err.to_string(),
        })?;
        parse_page(&value)
    }
}

#[async_trait]
impl PageSource for TaskApiClient {
    async fn fetch_page(&self, query: &TaskQuery, cursor: &PageCursor) -> Result<TaskPage, FetchError> {
        let mut attempt = 0;
        loop {
            match self.request_once(query, cursor).await {
                Ok(page) => return Ok(page),
                Err(err) if err.is_retryable() && attempt < self.options.max_retries => {
                    let delay = self.options.retry_backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        "page request '{}' at {} failed ({err}); retry {attempt} in {delay:?}",
                        query.label(),
                        cursor.start()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Reads `result.tasks`, the total (top-level `total` first, then
/// `result.total`) and the `next` cursor from a list response body.
pub fn parse_page(value: &Value) -> Result<TaskPage, FetchError> {
    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        return Err(FetchError::Api {
            error: scalar_text(error).unwrap_or_else(|| error.to_string()),
            description: value.get("error_description").and_then(scalar_text),
        });
    }

    let tasks = value
        .get("result")
        .and_then(|result| result.get("tasks"))
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::MalformedBody {
            message: "missing result.tasks array".to_string(),
        })?;

    let total = value
        .get("total")
        .and_then(as_count)
        .or_else(|| value.get("result").and_then(|r| r.get("total")).and_then(as_count));

    let next = value.get("next").and_then(scalar_text).filter(|n| !n.is_empty());

    debug!("parsed page: {} records, total {total:?}, next {next:?}", tasks.len());

    Ok(TaskPage {
        tasks: tasks.iter().map(normalize_task).collect(),
        total,
        next,
    })
}

fn error_description(value: &Value) -> Option<String> {
    value
        .get("error_description")
        .and_then(scalar_text)
        .filter(|text| !text.trim().is_empty())
        .or_else(|| value.get("error").and_then(scalar_text))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
