use serde::Deserialize;

/// One decoded unit of the completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Incremental assistant text.
    Delta(String),
    /// The `[DONE]` sentinel; nothing follows.
    Done,
    /// A data line whose payload failed to parse. Carries the raw payload.
    Malformed(String),
}

impl Frame {
    pub fn as_delta(&self) -> Option<&str> {
        match self {
            Self::Delta(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Payload of one `data:` line: `{ choices: [{ delta: { content? } }] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionChunk {
    /// Non-empty content of the first choice, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|content| !content.is_empty())
    }
}
