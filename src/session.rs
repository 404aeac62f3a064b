//! In-memory conversation driven by one streaming exchange at a time.
//!
//! The session is the only writer of its message list. Every applied frame is
//! published as a [`Snapshot`] on a `watch` channel so a UI can re-render
//! without holding a reference into the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chat_api::{
    decode, CancellationSignal, ChatApiError, ChatMessage, CompletionTransport, ErrorKind,
};
use futures_util::StreamExt;
use tokio::sync::watch;

use crate::accumulator::MessageAccumulator;
use crate::notice::failure_notice;

/// Observable state of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub messages: Vec<ChatMessage>,
    /// True while an exchange is in flight; input should be disabled.
    pub sending: bool,
    /// Bumped by every [`ChatSession::clear`].
    pub generation: u64,
}

/// How one call to [`ChatSession::send_user_message`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Input was blank; nothing was sent.
    Ignored,
    /// The stream was drained. `terminated` is false when the server closed
    /// the body without the `[DONE]` sentinel.
    Completed { deltas: usize, terminated: bool },
    /// The exchange was cancelled through the session's signal.
    Cancelled,
    /// The exchange failed; a notice was appended as an assistant message.
    Failed(ErrorKind),
}

/// What an interrupt did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// An exchange was in flight and its cancellation signal is now set.
    CancelledExchange,
    /// Nothing was in flight.
    Idle,
}

/// Cancels the in-flight exchange of a session from another task.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    state: watch::Receiver<Snapshot>,
    cancellation: CancellationSignal,
}

impl InterruptHandle {
    pub fn interrupt(&self) -> Interrupt {
        if !self.state.borrow().sending {
            return Interrupt::Idle;
        }
        self.cancellation.store(true, Ordering::Release);
        Interrupt::CancelledExchange
    }
}

pub struct ChatSession<T> {
    transport: T,
    messages: Vec<ChatMessage>,
    generation: u64,
    state: watch::Sender<Snapshot>,
    cancellation: CancellationSignal,
}

impl<T: CompletionTransport> ChatSession<T> {
    pub fn new(transport: T) -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self {
            transport,
            messages: Vec::new(),
            generation: 0,
            state,
            cancellation: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Signal that aborts the in-flight exchange when set. It is reset at the
    /// start of every send.
    pub fn cancellation(&self) -> CancellationSignal {
        Arc::clone(&self.cancellation)
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            state: self.state.subscribe(),
            cancellation: self.cancellation(),
        }
    }

    /// Drop the whole history.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.generation = self.generation.wrapping_add(1);
        self.publish(false);
    }

    /// Append `input` as a user message and stream the assistant reply.
    pub async fn send_user_message(&mut self, input: &str) -> Outcome {
        let text = input.trim();
        if text.is_empty() {
            return Outcome::Ignored;
        }

        self.cancellation.store(false, Ordering::Release);
        self.messages.push(ChatMessage::user(text));
        self.publish(true);

        let outcome = match self.run_exchange().await {
            Ok(outcome) => outcome,
            Err(ChatApiError::Cancelled) => {
                tracing::info!("chat exchange cancelled");
                Outcome::Cancelled
            }
            Err(error) => {
                let kind = error.kind();
                tracing::error!(%kind, %error, "chat exchange failed");
                self.messages
                    .push(ChatMessage::assistant(failure_notice(&error)));
                Outcome::Failed(kind)
            }
        };

        self.publish(false);
        outcome
    }

    async fn run_exchange(&mut self) -> Result<Outcome, ChatApiError> {
        let body = self
            .transport
            .open(&self.messages, Some(&self.cancellation))
            .await?;
        let mut frames = decode(body);
        let mut accumulator = MessageAccumulator::new();

        while let Some(frame) = frames.next().await {
            let frame = frame?;
            if accumulator.apply(&frame, &mut self.messages) {
                self.publish(true);
            }
            if frame.is_terminal() {
                return Ok(Outcome::Completed {
                    deltas: accumulator.deltas(),
                    terminated: true,
                });
            }
        }

        tracing::debug!(
            deltas = accumulator.deltas(),
            "stream closed without sentinel"
        );
        Ok(Outcome::Completed {
            deltas: accumulator.deltas(),
            terminated: false,
        })
    }

    fn publish(&self, sending: bool) {
        self.state.send_replace(Snapshot {
            messages: self.messages.clone(),
            sending,
            generation: self.generation,
        });
    }
}
