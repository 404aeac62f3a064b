use chat_api::{ChatMessage, Frame};

/// Folds the frames of one streaming exchange into a message list.
///
/// The first delta always opens a new assistant message; later deltas extend
/// the last message while it is still an assistant message. Content only ever
/// grows for the lifetime of one accumulator.
#[derive(Debug, Default)]
pub struct MessageAccumulator {
    started: bool,
    deltas: usize,
}

impl MessageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one frame. Returns whether `messages` changed.
    pub fn apply(&mut self, frame: &Frame, messages: &mut Vec<ChatMessage>) -> bool {
        let Frame::Delta(text) = frame else {
            return false;
        };

        match messages.last_mut() {
            Some(last) if self.started && last.is_assistant() => last.content.push_str(text),
            // Also covers a foreign message appended mid-stream.
            _ => messages.push(ChatMessage::assistant(text.as_str())),
        }

        self.started = true;
        self.deltas += 1;
        true
    }

    /// Deltas applied so far.
    pub fn deltas(&self) -> usize {
        self.deltas
    }
}
