use std::future::Future;
use std::pin::Pin;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::stream::{self, Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};

use crate::classify::{classify_body_read, classify_status, classify_transport, Classification};
use crate::config::ChatApiConfig;
use crate::decoder::{decode, FrameStream};
use crate::error::ChatApiError;
use crate::headers::build_headers;
use crate::payload::{ChatMessage, ChatRequest};
use crate::retry::BackoffPolicy;
use crate::url::normalize_completions_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

/// Live response body, chunk by chunk as the transport delivers it.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ChatApiError>> + Send>>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Seam between a conversation and whatever produces its response bytes.
pub trait CompletionTransport {
    /// Start one streaming exchange for the full message history.
    fn open(
        &self,
        messages: &[ChatMessage],
        cancellation: Option<&CancellationSignal>,
    ) -> impl Future<Output = Result<ByteStream, ChatApiError>> + Send;
}

#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

/// A successfully dispatched request whose body has not been read yet.
pub struct ChatStream {
    status: StatusCode,
    attempts: u32,
    body: ByteStream,
}

impl ChatStream {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Attempts used to obtain this stream, the successful one included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn into_body(self) -> ByteStream {
        self.body
    }

    pub fn frames(self) -> FrameStream {
        decode(self.body)
    }
}

/// Result of one dispatch attempt.
enum Attempt {
    Delivered(Response),
    Failed(Classification),
}

/// What the dispatcher does after a failed attempt.
#[derive(Debug)]
pub enum RetryDecision {
    Retry(Duration),
    Fail(ChatApiError),
}

/// Decide between waiting for another attempt and giving up.
///
/// `attempt` is zero-based. Non-retryable classifications fail regardless of
/// the remaining budget.
pub fn next_step(
    classification: Classification,
    attempt: u32,
    max_attempts: u32,
    policy: &BackoffPolicy,
) -> RetryDecision {
    if !classification.retryable {
        return RetryDecision::Fail(classification.into_terminal_error());
    }

    if attempt.saturating_add(1) >= max_attempts {
        return RetryDecision::Fail(ChatApiError::RetryExhausted {
            attempts: attempt.saturating_add(1),
            kind: classification.kind,
            status: classification.status,
            last_error: classification.detail,
        });
    }

    RetryDecision::Retry(policy.delay(attempt, classification.retry_after.as_deref()))
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        config.validate()?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_completions_url(&self.config.base_url)
    }

    pub fn build_headers(&self, user_agent: Option<&str>) -> Result<HeaderMap, ChatApiError> {
        let headers = build_headers(&self.config, user_agent)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    ChatApiError::InvalidConfig(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ChatApiError::InvalidConfig(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        messages: &[ChatMessage],
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        let payload = ChatRequest::new(self.config.model.clone(), messages.to_vec());
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(&payload))
    }

    /// Dispatch the conversation, retrying transient failures.
    ///
    /// Returns as soon as a success status arrives; the body is left unread.
    pub async fn send(
        &self,
        messages: &[ChatMessage],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ChatStream, ChatApiError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }

            let classification = match self.attempt(messages, cancellation).await? {
                Attempt::Delivered(response) => {
                    tracing::debug!(
                        attempt = attempt + 1,
                        status = response.status().as_u16(),
                        "chat stream opened"
                    );
                    return Ok(ChatStream {
                        status: response.status(),
                        attempts: attempt + 1,
                        body: body_stream(response, cancellation.cloned()),
                    });
                }
                Attempt::Failed(classification) => classification,
            };

            let kind = classification.kind;
            let status = classification.status.map(|status| status.as_u16());
            match next_step(classification, attempt, max_attempts, &self.config.backoff) {
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        %kind,
                        ?status,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "chat request failed, retrying"
                    );
                    await_or_cancel(tokio::time::sleep(delay), cancellation).await?;
                    attempt += 1;
                }
                RetryDecision::Fail(error) => {
                    tracing::error!(attempt = attempt + 1, %kind, ?status, %error, "chat request failed");
                    return Err(error);
                }
            }
        }
    }

    /// Dispatch and decode in one call.
    pub async fn stream(
        &self,
        messages: &[ChatMessage],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<FrameStream, ChatApiError> {
        Ok(self.send(messages, cancellation).await?.frames())
    }

    async fn attempt(
        &self,
        messages: &[ChatMessage],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Attempt, ChatApiError> {
        let request = self.build_request(messages)?;
        let response = match await_or_cancel(request.send(), cancellation).await? {
            Ok(response) => response,
            Err(error) => return Ok(Attempt::Failed(classify_transport(&error))),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(Attempt::Delivered(response));
        }

        let headers = response.headers().clone();
        match await_or_cancel(response.text(), cancellation).await? {
            Ok(body) => Ok(Attempt::Failed(classify_status(status, &headers, &body))),
            Err(error) => Ok(Attempt::Failed(classify_body_read(status, &error))),
        }
    }
}

impl CompletionTransport for ChatApiClient {
    async fn open(
        &self,
        messages: &[ChatMessage],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ByteStream, ChatApiError> {
        Ok(self.send(messages, cancellation).await?.into_body())
    }
}

fn body_stream(response: Response, cancellation: Option<CancellationSignal>) -> ByteStream {
    let body: ByteStream = Box::pin(response.bytes_stream().map(|chunk| {
        chunk
            .map(|bytes| bytes.to_vec())
            .map_err(|error| ChatApiError::Stream(error.to_string()))
    }));

    let Some(cancellation) = cancellation else {
        return body;
    };

    Box::pin(stream::unfold(Some(body), move |state| {
        let cancellation = Arc::clone(&cancellation);
        async move {
            let mut body = state?;
            match await_or_cancel(body.next(), Some(&cancellation)).await {
                Ok(Some(chunk)) => Some((chunk, Some(body))),
                Ok(None) => None,
                Err(error) => Some((Err(error), None)),
            }
        }
    }))
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
