//! Chat module - streaming chat session over the `data: ` event protocol

mod backend;
mod decoder;
mod frame;
mod message;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
mod session;
mod sink;
mod state;
mod tool_calls;
mod turn;

pub use backend::{ByteStream, ChatBackend, ChatRequest, HttpChatBackend};
pub use decoder::{FrameStream, LineAccumulator, decode_frames};
pub use frame::{
    ChatChunk, ChunkChoice, ChunkDelta, FINISH_REASON_STOP, FrameEvent, FrameParseError,
    FunctionFragment, ToolCallFragment, parse_line,
};
pub use message::{ChatTurn, Message, Role, Source, ToolCall};
pub use session::{StreamingChatSession, THINKING_PLACEHOLDER};
pub use sink::RenderSink;
pub use state::{ConversationSnapshot, ConversationState};
pub use tool_calls::{ToolCallSet, Upsert};
pub use turn::{FrameOutcome, TurnAccumulator, format_citations};
