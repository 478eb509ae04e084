// src/utils/errors.rs

/// Errors coming from upstream data APIs (HTTP, JSON, payload shape).
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Network-level trouble that is worth trying again next cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::Json(_) | ApiError::Malformed(_) => false,
        }
    }
}

// Request URLs carry API keys and the bot token; never keep them.
impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Http(e.without_url())
    }
}

/// Errors delivering an alert.
#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Http(e.without_url())
    }
}

/// Start-up configuration problems; the only errors that stop the process.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} missing from env")]
    Missing(&'static str),
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
