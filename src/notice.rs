use chat_api::{ChatApiError, ErrorKind};

pub const NETWORK_NOTICE: &str = "Network error. Check your connection.";
pub const SERVER_NOTICE: &str = "Server error. Please try later.";
pub const GENERIC_NOTICE: &str = "An error occurred. Please try again.";

/// Text shown to the user, as an assistant message, when an exchange fails.
pub fn failure_notice(error: &ChatApiError) -> String {
    match error {
        ChatApiError::Client { message, .. } => format!("Client error: {message}"),
        ChatApiError::Server { .. } => SERVER_NOTICE.to_owned(),
        ChatApiError::RetryExhausted { kind, .. } if *kind == ErrorKind::Network => {
            NETWORK_NOTICE.to_owned()
        }
        _ => GENERIC_NOTICE.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use chat_api::{ChatApiError, ErrorKind, StatusCode};

    use super::*;

    #[test]
    fn client_errors_show_server_message() {
        let error = ChatApiError::Client {
            status: StatusCode::BAD_REQUEST,
            message: "messages must not be empty".to_owned(),
        };
        assert_eq!(
            failure_notice(&error),
            "Client error: messages must not be empty"
        );
    }

    #[test]
    fn server_errors_hide_details() {
        let error = ChatApiError::Server {
            status: StatusCode::NOT_IMPLEMENTED,
            message: "stack trace".to_owned(),
        };
        assert_eq!(failure_notice(&error), SERVER_NOTICE);
    }

    #[test]
    fn exhausted_retries_distinguish_network_failures() {
        let exhausted = |kind| ChatApiError::RetryExhausted {
            attempts: 3,
            kind,
            status: None,
            last_error: "x".to_owned(),
        };
        assert_eq!(failure_notice(&exhausted(ErrorKind::Network)), NETWORK_NOTICE);
        assert_eq!(failure_notice(&exhausted(ErrorKind::Server)), GENERIC_NOTICE);
        assert_eq!(failure_notice(&exhausted(ErrorKind::Unknown)), GENERIC_NOTICE);
        assert_eq!(
            failure_notice(&ChatApiError::Stream("reset".to_owned())),
            GENERIC_NOTICE
        );
    }
}
