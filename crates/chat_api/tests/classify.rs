use chat_api::classify::*;
use chat_api::{ChatApiError, ErrorKind};
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::StatusCode;

fn classify(code: u16, body: &str) -> Classification {
    classify_status(
        StatusCode::from_u16(code).expect("status code"),
        &HeaderMap::new(),
        body,
    )
}

#[test]
fn classify_client_statuses_are_terminal() {
    for code in CLIENT_ERROR_STATUSES {
        let classification = classify(code, "nope");
        assert_eq!(classification.kind, ErrorKind::Client);
        assert!(!classification.retryable);
        assert_eq!(classification.detail, "nope");
        assert_eq!(classification.status.map(|status| status.as_u16()), Some(code));
    }
}

#[test]
fn classify_retryable_statuses_are_transient() {
    for code in RETRYABLE_STATUSES {
        let classification = classify(code, "busy");
        assert_eq!(classification.kind, ErrorKind::Server);
        assert!(classification.retryable, "status {code} should be retried");
    }
}

#[test]
fn classify_unlisted_statuses_are_terminal_server_errors() {
    for code in [402, 409, 418, 422, 501, 505] {
        let classification = classify(code, "");
        assert_eq!(classification.kind, ErrorKind::Server);
        assert!(!classification.retryable, "status {code} should not be retried");
    }
}

#[test]
fn classify_captures_retry_after_only_for_retryable_statuses() {
    let mut headers = HeaderMap::new();
    headers.insert(RETRY_AFTER, HeaderValue::from_static("4"));

    let limited = classify_status(StatusCode::TOO_MANY_REQUESTS, &headers, "");
    assert_eq!(limited.retry_after.as_deref(), Some("4"));

    let rejected = classify_status(StatusCode::FORBIDDEN, &headers, "");
    assert_eq!(rejected.retry_after, None);
}

#[test]
fn classify_extracts_json_error_message() {
    let classification = classify(401, r#"{"error":{"message":"invalid api key"}}"#);
    assert_eq!(classification.detail, "invalid api key");
}

#[test]
fn classify_transport_messages() {
    for message in [
        "error sending request for url (http://localhost/)",
        "tcp connect error: Connection refused (os error 111)",
        "connection reset by peer",
        "TypeError: Failed to fetch",
        "dns error: failed to lookup address information",
        "operation timed out",
    ] {
        let classification = classify_message(message);
        assert_eq!(classification.kind, ErrorKind::Network, "{message}");
        assert!(classification.retryable);
    }

    let other = classify_message("unexpected end of JSON input");
    assert_eq!(other.kind, ErrorKind::Unknown);
    assert!(other.retryable);
}

#[test]
fn terminal_classifications_map_to_typed_errors() {
    assert!(matches!(
        classify(404, "missing").into_terminal_error(),
        ChatApiError::Client { status, ref message } if status == StatusCode::NOT_FOUND && message == "missing"
    ));
    assert!(matches!(
        classify(501, "nope").into_terminal_error(),
        ChatApiError::Server { status, .. } if status == StatusCode::NOT_IMPLEMENTED
    ));
}

#[test]
fn classify_unreadable_error_body_is_unknown_and_retried() {
    for code in [401, 418, 503] {
        let status = StatusCode::from_u16(code).expect("status code");
        let classification = classify_unreadable_body(status, "error decoding response body");
        assert_eq!(classification.kind, ErrorKind::Unknown, "status {code}");
        assert!(classification.retryable, "status {code} should be retried");
        assert_eq!(classification.status, Some(status));
        assert_eq!(classification.detail, "error decoding response body");
    }
}
