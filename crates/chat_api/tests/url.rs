use chat_api::normalize_completions_url;
use chat_api::url::DEFAULT_BASE_URL;

#[test]
fn url_normalization_keeps_existing_completions_endpoint() {
    assert_eq!(
        normalize_completions_url("https://llm.internal/v1/chat/completions"),
        "https://llm.internal/v1/chat/completions"
    );
}

#[test]
fn url_normalization_appends_completions_path() {
    assert_eq!(
        normalize_completions_url(" https://llm.internal/v1/ "),
        "https://llm.internal/v1/chat/completions"
    );
}

#[test]
fn url_normalization_defaults_blank_base() {
    assert_eq!(
        normalize_completions_url(""),
        format!("{DEFAULT_BASE_URL}/chat/completions")
    );
}
