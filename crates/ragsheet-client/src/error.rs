//! Error types for the client

use thiserror::Error;

use crate::chat::FrameParseError;

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Stream ended before a completion signal")]
    IncompleteStream,

    #[error("Malformed frame: {0}")]
    Frame(#[from] FrameParseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not ready: {0}")]
    Precondition(String),

    #[error("A chat turn is already in flight")]
    TurnInFlight,

    #[error("Chat turn cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Whether the error came from the network or the server rather than
    /// from local input or session state.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_)
                | ClientError::Http { .. }
                | ClientError::IncompleteStream
                | ClientError::Reqwest(_)
        )
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
