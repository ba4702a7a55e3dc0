//! Ragsheet client - streaming chat client for a spreadsheet RAG service
//!
//! This crate provides:
//! - Streaming chat session with incremental message snapshots
//! - Event-frame decoder for the `data: ` line protocol
//! - HTTP chat backend (OpenAI-compatible chat completions)
//! - Knowledge-base file management (list, upload, delete, rebuild)
//! - Health probing and periodic readiness monitoring

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod files;
pub mod health;
mod http_client;

// Re-export commonly used types
pub use chat::{
    ByteStream, ChatBackend, ChatChunk, ChatRequest, ChatTurn, ConversationSnapshot,
    ConversationState, FrameEvent, FrameParseError, HttpChatBackend, Message, RenderSink, Role,
    Source, StreamingChatSession, ToolCall, ToolCallSet,
};
pub use client::RagClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use files::{FileClient, FileInfo, FileListResponse, UploadResponse};
pub use health::{HealthClient, HealthMonitor, HealthProbe, HealthStatus, SystemStatus};
