//! Transport-only client primitives for streaming chat completions.
//!
//! This crate owns request building, failure classification, the retry loop
//! and incremental decoding of the `data:`-framed completion stream. It holds
//! no conversation state; see the root `stream_chat` crate for that.
//!
//! Failures are classified once by [`classify`] and the retry decision is made
//! by [`client::next_step`], so the dispatcher loop itself carries no status
//! code literals.

pub mod classify;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod url;

pub use classify::Classification;
pub use client::{
    ByteStream, CancellationSignal, ChatApiClient, ChatStream, CompletionTransport, RetryDecision,
};
pub use config::ChatApiConfig;
pub use decoder::{decode, FrameStream, StreamDecoder};
pub use error::{ChatApiError, ErrorKind};
pub use events::Frame;
pub use payload::{ChatMessage, ChatRequest, Role};
pub use retry::BackoffPolicy;
pub use reqwest::StatusCode;
pub use url::normalize_completions_url;
