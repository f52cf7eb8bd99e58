use axum::http::StatusCode;

/// Failure of a single page request against the task API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Non-2xx status, with the server's `error_description`/`error` when present.
    #[error("HTTP {status}{}", describe(.description))]
    Http {
        status: u16,
        description: Option<String>,
    },

    /// 2xx response whose body still carries an `error` field.
    #[error("API error {error}{}", describe(.description))]
    Api {
        error: String,
        description: Option<String>,
    },

    #[error("request timed out")]
    Timeout,

    #[error("connection error: {message}")]
    Transport { message: String },

    #[error("malformed response body: {message}")]
    MalformedBody { message: String },

    /// An empty page arrived before the reported total was reached.
    #[error("listing ended at {fetched} of {total} records")]
    Truncated { fetched: u64, total: u64 },

    #[error("gave up after {limit} pages")]
    PageLimit { limit: usize },
}

fn describe(description: &Option<String>) -> String {
    match description {
        Some(text) if !text.trim().is_empty() => format!(": {}", text.trim()),
        _ => String::new(),
    }
}

impl FetchError {
    /// Transport failures, timeouts and 5xx responses may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::MalformedBody {
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                message: err.to_string(),
            }
        }
    }
}

/// The one error a logical (multi-page) fetch surfaces. Records collected
/// before the failure are dropped with it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("fetch '{label}' failed: {source}")]
pub struct QueryError {
    pub label: String,
    #[source]
    pub source: FetchError,
}

impl QueryError {
    pub fn new(label: impl Into<String>, source: FetchError) -> Self {
        Self {
            label: label.into(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    /// Upstream task API failure, reported with a short view-specific prefix.
    pub fn upstream(prefix: &str, err: QueryError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: format!("{prefix}: {err}"),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
