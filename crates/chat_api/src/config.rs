use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::ChatApiError;
use crate::retry::{BackoffPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::url::DEFAULT_BASE_URL;

pub const ENV_API_KEY: &str = "CHAT_API_KEY";
pub const ENV_BASE_URL: &str = "CHAT_API_BASE_URL";
pub const ENV_MODEL: &str = "CHAT_MODEL";

/// Transport configuration for chat completion requests.
#[derive(Debug, Clone)]
pub struct ChatApiConfig {
    /// Bearer token passed to `Authorization`.
    pub api_key: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Base URL; `/chat/completions` is appended when missing.
    pub base_url: String,
    /// Total attempts per send, including the first one.
    pub max_attempts: u32,
    /// Wait policy between attempts.
    pub backoff: BackoffPolicy,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffPolicy::default(),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }
}

impl ChatApiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Read `CHAT_API_KEY`, `CHAT_MODEL` and the optional `CHAT_API_BASE_URL`.
    pub fn from_env() -> Result<Self, ChatApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`], resolving variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChatApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let api_key = read(ENV_API_KEY).ok_or(ChatApiError::MissingApiKey)?;
        let model = read(ENV_MODEL).ok_or(ChatApiError::MissingModel)?;
        let mut config = Self::new(api_key, model);
        if let Some(base_url) = read(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    /// Reject configurations that cannot produce a request.
    pub fn validate(&self) -> Result<(), ChatApiError> {
        if self.api_key.trim().is_empty() {
            return Err(ChatApiError::MissingApiKey);
        }
        if self.model.trim().is_empty() {
            return Err(ChatApiError::MissingModel);
        }
        if self.max_attempts == 0 {
            return Err(ChatApiError::InvalidConfig(
                "max_attempts must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}
