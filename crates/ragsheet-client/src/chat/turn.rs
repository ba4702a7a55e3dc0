//! Incremental reconstruction of one assistant turn from decoded chunks

use std::collections::HashMap;
use std::fmt::Write as _;

use super::frame::{ChatChunk, ToolCallFragment};
use super::message::{Message, Source, ToolCall};
use super::tool_calls::ToolCallSet;

pub const TOOL_STATUS_PREFIX: &str = "Using tools: ";
pub const CITATION_HEADER: &str = "\n\n**Sources:**\n";

/// What applying one chunk did to the turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    /// The displayed message changed and should be re-rendered.
    pub changed: bool,
    /// The chunk carried `finish_reason: "stop"`.
    pub terminal: bool,
}

/// State machine for the assistant message of the current turn.
///
/// Until the first text delta arrives the displayed content is a status
/// line (placeholder, then tool names); afterwards it is exactly the
/// concatenation of text deltas.
#[derive(Debug)]
pub struct TurnAccumulator {
    message: Message,
    content_started: bool,
    tool_calls: ToolCallSet,
    ids_by_index: HashMap<usize, String>,
    sources: Vec<Source>,
}

impl TurnAccumulator {
    pub fn new(placeholder: Message) -> Self {
        Self {
            message: placeholder,
            content_started: false,
            tool_calls: ToolCallSet::new(),
            ids_by_index: HashMap::new(),
            sources: Vec::new(),
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn content_started(&self) -> bool {
        self.content_started
    }

    pub fn tool_calls(&self) -> &ToolCallSet {
        &self.tool_calls
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn apply(&mut self, chunk: &ChatChunk) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();

        if let Some(sources) = &chunk.sources {
            self.sources.extend(sources.iter().cloned());
        }

        let Some(choice) = chunk.first_choice() else {
            return outcome;
        };

        if let Some(fragments) = &choice.delta.tool_calls
            && self.merge_tool_calls(fragments)
        {
            self.message.tool_calls = self.tool_calls.to_vec();
            if !self.content_started {
                self.message.content = format!("{TOOL_STATUS_PREFIX}{}", self.tool_calls.names());
            }
            outcome.changed = true;
        }

        if let Some(delta) = &choice.delta.content
            && !delta.is_empty()
        {
            if !self.content_started {
                self.message.content.clear();
                self.content_started = true;
            }
            self.message.content.push_str(delta);
            outcome.changed = true;
        }

        outcome.terminal = choice.is_stop();
        outcome
    }

    fn merge_tool_calls(&mut self, fragments: &[ToolCallFragment]) -> bool {
        let mut merged = false;

        for fragment in fragments {
            let Some(function) = &fragment.function else {
                continue;
            };
            let Some(name) = function.name.as_deref().filter(|name| !name.is_empty()) else {
                tracing::trace!(?fragment, "Skipping tool call fragment without a name");
                continue;
            };

            let id = match (&fragment.id, fragment.index) {
                (Some(id), index) => {
                    if let Some(index) = index {
                        self.ids_by_index.insert(index, id.clone());
                    }
                    id.clone()
                }
                (None, Some(index)) => match self.ids_by_index.get(&index) {
                    Some(id) => id.clone(),
                    None => {
                        tracing::debug!(index, "Tool call fragment references unknown index");
                        continue;
                    }
                },
                (None, None) => {
                    tracing::debug!(function = name, "Tool call fragment without id or index");
                    continue;
                }
            };

            let arguments = function.arguments.clone().unwrap_or_default();
            self.tool_calls.upsert(ToolCall::new(id, name, arguments));
            merged = true;
        }

        merged
    }

    /// Build the finalized message: text, then the citation block if any
    /// sources were collected.
    pub fn finish(self) -> Message {
        let mut message = self.message;
        if !self.content_started {
            message.content.clear();
        }
        message.content.push_str(&format_citations(&self.sources));
        message.tool_calls = self.tool_calls.to_vec();
        message.sources = self.sources;
        message.finalize();
        message
    }
}

/// Numbered citation block appended to a finished answer; empty without sources.
pub fn format_citations(sources: &[Source]) -> String {
    if sources.is_empty() {
        return String::new();
    }

    let mut block = String::from(CITATION_HEADER);
    for (i, source) in sources.iter().enumerate() {
        let _ = writeln!(block, "{}. File: {}, Sheet: {}", i + 1, source.file, source.sheet);
    }
    block
}
