//! Maps failed responses and transport errors onto [`ErrorKind`].
//!
//! This is the only place that knows which status codes are terminal and which
//! are transient.

use std::error::Error as StdError;
use std::sync::OnceLock;

use regex::Regex;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

use crate::error::{parse_error_message, ChatApiError, ErrorKind};

/// Statuses that signal a transient condition warranting another attempt.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];
/// Statuses surfaced to the caller immediately as [`ErrorKind::Client`].
pub const CLIENT_ERROR_STATUSES: [u16; 4] = [400, 401, 403, 404];

/// Outcome of classifying one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub retryable: bool,
    pub status: Option<StatusCode>,
    pub detail: String,
    /// Raw `Retry-After` header value, only captured for retryable statuses.
    pub retry_after: Option<String>,
}

impl Classification {
    fn new(kind: ErrorKind, retryable: bool, detail: impl Into<String>) -> Self {
        Self {
            kind,
            retryable,
            status: None,
            detail: detail.into(),
            retry_after: None,
        }
    }

    /// Error raised when this failure ends the send without further attempts.
    pub fn into_terminal_error(self) -> ChatApiError {
        match (self.kind, self.status) {
            (ErrorKind::Client, Some(status)) => ChatApiError::Client {
                status,
                message: self.detail,
            },
            (ErrorKind::Server, Some(status)) => ChatApiError::Server {
                status,
                message: self.detail,
            },
            (kind, status) => ChatApiError::RetryExhausted {
                attempts: 1,
                kind,
                status,
                last_error: self.detail,
            },
        }
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

pub fn is_client_error_status(status: u16) -> bool {
    CLIENT_ERROR_STATUSES.contains(&status)
}

/// Classify a non-success HTTP response.
pub fn classify_status(status: StatusCode, headers: &HeaderMap, body: &str) -> Classification {
    let code = status.as_u16();
    let detail = parse_error_message(status, body);

    let mut classification = if is_client_error_status(code) {
        Classification::new(ErrorKind::Client, false, detail)
    } else if is_retryable_status(code) {
        let mut transient = Classification::new(ErrorKind::Server, true, detail);
        transient.retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned);
        transient
    } else {
        Classification::new(ErrorKind::Server, false, detail)
    };
    classification.status = Some(status);
    classification
}

/// Classify a failure raised by the HTTP client itself.
pub fn classify_transport(error: &reqwest::Error) -> Classification {
    let detail = error_chain_text(error);
    if error.is_connect() || error.is_timeout() || error.is_request() {
        return Classification::new(ErrorKind::Network, true, detail);
    }
    classify_message(&detail)
}

/// Classify a failure to read the body of a non-success response.
///
/// The status code is irrelevant here: the attempt failed on our side, so it
/// is retried as [`ErrorKind::Unknown`].
pub fn classify_body_read(status: StatusCode, error: &reqwest::Error) -> Classification {
    classify_unreadable_body(status, &error_chain_text(error))
}

pub fn classify_unreadable_body(status: StatusCode, detail: &str) -> Classification {
    Classification {
        status: Some(status),
        ..Classification::new(ErrorKind::Unknown, true, detail)
    }
}

/// Classify a failure known only by its message.
pub fn classify_message(message: &str) -> Classification {
    let kind = if transport_failure_regex().is_match(message) {
        ErrorKind::Network
    } else {
        ErrorKind::Unknown
    };
    Classification::new(kind, true, message)
}

fn transport_failure_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(
            r"(?i)connection.?(reset|refused|closed|aborted)|failed to fetch|error sending request|dns|name.?resolution|failed to lookup|broken.?pipe|timed?.?out",
        )
        .expect("transport failure regex must compile")
    })
}

fn error_chain_text(error: &reqwest::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
