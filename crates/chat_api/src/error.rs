use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Closed failure taxonomy shared by the classifier and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport-level failure: refused or reset connection, DNS, aborted fetch.
    Network,
    /// HTTP 400/401/403/404.
    Client,
    /// Any other non-success status.
    Server,
    /// Everything else, such as a failure while reading a body.
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Client => "client",
            Self::Server => "server",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ChatApiError {
    #[error("api key is required")]
    MissingApiKey,
    #[error("model identifier is required")]
    MissingModel,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("client error (HTTP {status}): {message}")]
    Client { status: StatusCode, message: String },
    #[error("server error (HTTP {status}): {message}")]
    Server { status: StatusCode, message: String },
    #[error(
        "retry exhausted after {attempts} attempts (kind: {kind}, status: {}, last_error: {last_error})",
        display_status(.status)
    )]
    RetryExhausted {
        attempts: u32,
        kind: ErrorKind,
        status: Option<StatusCode>,
        last_error: String,
    },
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("stream read failure: {0}")]
    Stream(String),
    #[error("request was cancelled")]
    Cancelled,
}

impl ChatApiError {
    /// Taxonomy bucket of this error. Exhausted retries report the kind of the
    /// last failed attempt.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Client { .. } => ErrorKind::Client,
            Self::Server { .. } => ErrorKind::Server,
            Self::RetryExhausted { kind, .. } => *kind,
            Self::Request(error) if error.is_connect() || error.is_timeout() => ErrorKind::Network,
            _ => ErrorKind::Unknown,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Client { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::RetryExhausted { status, .. } => *status,
            Self::Request(error) => error.status(),
            _ => None,
        }
    }

    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Self::RetryExhausted { .. })
    }
}

fn display_status(status: &Option<StatusCode>) -> String {
    status
        .map(|status| status.as_u16().to_string())
        .unwrap_or_else(|| "n/a".to_owned())
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorPayloadFields {
    Detailed { message: Option<String> },
    Plain(String),
}

impl ErrorPayloadFields {
    fn message(&self) -> Option<&str> {
        let message = match self {
            Self::Detailed { message } => message.as_deref()?,
            Self::Plain(message) => message.as_str(),
        };
        non_empty_string(message)
    }
}

/// Extract a readable message from an error response body.
///
/// Prefers `error.message` of a JSON error envelope, then the raw body, then
/// the status reason phrase.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload.error.as_ref().and_then(ErrorPayloadFields::message) {
            return message.to_owned();
        }
    }

    match non_empty_string(body.trim()) {
        Some(body) => body.to_owned(),
        None => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
