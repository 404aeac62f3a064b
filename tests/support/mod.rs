use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chat_api::{ByteStream, CancellationSignal, ChatApiError, ChatMessage, CompletionTransport};
use futures_util::{stream, StreamExt};

/// One scripted reply: either body chunks or a dispatch failure.
pub enum Reply {
    Chunks(Vec<Vec<u8>>),
    ChunksThenError(Vec<Vec<u8>>, ChatApiError),
    /// Chunks, then silence until the cancellation signal is set.
    ChunksThenStall(Vec<Vec<u8>>),
    Fail(ChatApiError),
}

#[derive(Default)]
pub struct TransportTrace {
    pub replies: VecDeque<Reply>,
    pub requests: Vec<Vec<ChatMessage>>,
}

/// Transport that replays scripted replies and records every history it was
/// asked to send.
#[derive(Default)]
pub struct ScriptedTransport {
    state: Mutex<TransportTrace>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            state: Mutex::new(TransportTrace {
                replies: replies.into(),
                requests: Vec::new(),
            }),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        lock_unpoisoned(&self.state).requests.clone()
    }
}

impl CompletionTransport for ScriptedTransport {
    async fn open(
        &self,
        messages: &[ChatMessage],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ByteStream, ChatApiError> {
        let mut state = lock_unpoisoned(&self.state);
        state.requests.push(messages.to_vec());
        let reply = state
            .replies
            .pop_front()
            .expect("a scripted reply for every request");

        match reply {
            Reply::Chunks(chunks) => Ok(Box::pin(stream::iter(
                chunks.into_iter().map(Ok::<Vec<u8>, ChatApiError>),
            ))),
            Reply::ChunksThenError(chunks, error) => Ok(Box::pin(stream::iter(
                chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(error))),
            ))),
            Reply::ChunksThenStall(chunks) => {
                let cancellation = cancellation
                    .cloned()
                    .expect("session passes its cancellation signal");
                let stall = stream::once(async move {
                    while !cancellation.load(Ordering::Acquire) {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                    Err::<Vec<u8>, ChatApiError>(ChatApiError::Cancelled)
                });
                Ok(Box::pin(
                    stream::iter(chunks.into_iter().map(Ok)).chain(stall),
                ))
            }
            Reply::Fail(error) => Err(error),
        }
    }
}

pub fn sse(lines: &[&str]) -> Vec<u8> {
    lines
        .iter()
        .map(|line| format!("data: {line}\n"))
        .collect::<String>()
        .into_bytes()
}

pub fn delta(content: &str) -> String {
    serde_json::json!({"choices": [{"delta": {"content": content}}]}).to_string()
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
