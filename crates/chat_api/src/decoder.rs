use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::stream::{self, Stream, StreamExt};

use crate::client::ByteStream;
use crate::error::ChatApiError;
use crate::events::{CompletionChunk, Frame};

pub const DATA_PREFIX: &str = "data:";
pub const DONE_SENTINEL: &str = "[DONE]";

/// Lazy, in-order sequence of frames decoded from one response body.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, ChatApiError>> + Send>>;

/// Incremental decoder for `data:`-framed completion streams.
///
/// Bytes are decoded as UTF-8 with sequences split across chunks carried
/// forward, text is buffered until a newline completes a line, and each
/// complete line is turned into at most one [`Frame`]. Once [`Frame::Done`] is
/// produced all further input is discarded.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending_bytes: Vec<u8>,
    buffer: String,
    done: bool,
}

impl StreamDecoder {
    /// Feed arbitrary bytes into the decoder and drain complete frames.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.done {
            return frames;
        }

        self.push_bytes(bytes);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return frames;
        };
        let partial = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, partial);

        for line in complete.lines() {
            let Some(frame) = parse_line(line) else {
                continue;
            };
            let terminal = frame.is_terminal();
            frames.push(frame);
            if terminal {
                self.done = true;
                self.buffer.clear();
                self.pending_bytes.clear();
                break;
            }
        }

        frames
    }

    /// Decode a complete payload in one shot.
    pub fn decode_all(input: &[u8]) -> Vec<Frame> {
        let mut decoder = Self::default();
        decoder.feed(input)
    }

    /// Close the decoder at end of stream, returning any unterminated text
    /// that was discarded.
    pub fn finish(&mut self) -> Option<String> {
        self.done = true;
        let mut residual = std::mem::take(&mut self.buffer);
        if !self.pending_bytes.is_empty() {
            residual.push_str(&String::from_utf8_lossy(&self.pending_bytes));
            self.pending_bytes.clear();
        }
        if residual.trim().is_empty() {
            None
        } else {
            Some(residual)
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty() && self.pending_bytes.is_empty()
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        let mut pending = std::mem::take(&mut self.pending_bytes);
        pending.extend_from_slice(bytes);

        let mut input = pending.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(error) => {
                    let (valid, rest) = input.split_at(error.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match error.error_len() {
                        Some(invalid) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[invalid..];
                        }
                        None => {
                            // Incomplete sequence at the chunk boundary.
                            self.pending_bytes = rest.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn parse_line(line: &str) -> Option<Frame> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    if payload.trim().is_empty() {
        return None;
    }
    if payload.trim() == DONE_SENTINEL {
        return Some(Frame::Done);
    }

    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => chunk
            .content()
            .map(|content| Frame::Delta(content.to_owned())),
        Err(error) => {
            tracing::warn!(%error, payload, "dropping malformed stream frame");
            Some(Frame::Malformed(payload.to_owned()))
        }
    }
}

struct DecodeState {
    body: ByteStream,
    decoder: StreamDecoder,
    ready: VecDeque<Frame>,
    finished: bool,
}

/// Turn a response body into a lazy frame sequence.
///
/// The body is only polled when no decoded frame is waiting, and never again
/// after the sentinel or a read failure.
pub fn decode(body: ByteStream) -> FrameStream {
    let state = DecodeState {
        body,
        decoder: StreamDecoder::default(),
        ready: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.ready.pop_front() {
                return Some((Ok(frame), state));
            }
            if state.finished || state.decoder.is_done() {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.feed(&chunk);
                    state.ready.extend(frames);
                }
                Some(Err(error)) => {
                    state.finished = true;
                    return Some((Err(error), state));
                }
                None => {
                    state.finished = true;
                    if let Some(residual) = state.decoder.finish() {
                        tracing::debug!(
                            bytes = residual.len(),
                            "stream ended with an unterminated line"
                        );
                    }
                }
            }
        }
    }))
}
