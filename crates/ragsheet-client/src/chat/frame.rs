//! Wire types for one `data: ` line of the chat stream

use serde::Deserialize;
use thiserror::Error;

use super::message::Source;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";
pub const FINISH_REASON_STOP: &str = "stop";

// Longest slice of an offending line kept in a parse error.
const MAX_EXCERPT: usize = 120;

/// One decoded JSON payload of the stream
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Citations attached by the server; collected and rendered at completion.
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
}

impl ChatChunk {
    /// The stream only ever carries one choice; later ones are ignored.
    pub fn first_choice(&self) -> Option<&ChunkChoice> {
        self.choices.first()
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl ChunkChoice {
    pub fn is_stop(&self) -> bool {
        self.finish_reason.as_deref() == Some(FINISH_REASON_STOP)
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallFragment>>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ToolCallFragment {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionFragment>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FunctionFragment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// A `data: ` line whose payload is not a valid chunk
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} (in `{excerpt}`)")]
pub struct FrameParseError {
    pub reason: String,
    pub excerpt: String,
}

impl FrameParseError {
    fn new(reason: impl Into<String>, payload: &str) -> Self {
        let excerpt = match payload.char_indices().nth(MAX_EXCERPT) {
            Some((end, _)) => format!("{}...", &payload[..end]),
            None => payload.to_string(),
        };
        Self {
            reason: reason.into(),
            excerpt,
        }
    }
}

/// Logical event produced by the frame decoder
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    Chunk(ChatChunk),
    /// Explicit `[DONE]` sentinel, distinct from transport EOF.
    Done,
    Malformed(FrameParseError),
}

/// Interpret one complete line. Returns `None` for lines that carry no frame.
pub fn parse_line(line: &str) -> Option<FrameEvent> {
    if line.trim().is_empty() {
        return None;
    }

    let data = line.strip_prefix(DATA_PREFIX)?;
    if data.trim() == DONE_SENTINEL {
        return Some(FrameEvent::Done);
    }

    Some(match serde_json::from_str::<ChatChunk>(data) {
        Ok(chunk) => FrameEvent::Chunk(chunk),
        Err(e) => FrameEvent::Malformed(FrameParseError::new(e.to_string(), data)),
    })
}
