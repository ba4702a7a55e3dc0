//! Conversation message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Roles that are resent to the backend as conversation history
    pub fn is_conversational(self) -> bool {
        matches!(self, Role::User | Role::Assistant)
    }
}

/// Tool invocation announced by the backend while answering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub function_name: String,
    /// Raw argument text as transmitted; may be partial JSON mid-stream.
    pub arguments_text: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        function_name: impl Into<String>,
        arguments_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            function_name: function_name.into(),
            arguments_text: arguments_text.into(),
        }
    }

    /// Parse the argument text, returning `None` while it is incomplete or invalid.
    pub fn arguments_json(&self) -> Option<Value> {
        if self.arguments_text.trim().is_empty() {
            return None;
        }
        serde_json::from_str(&self.arguments_text).ok()
    }
}

/// Provenance of retrieved data: a worksheet inside an uploaded file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub file: String,
    pub sheet: String,
}

impl Source {
    pub fn new(file: impl Into<String>, sheet: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            sheet: sheet.into(),
        }
    }
}

/// A role/content pair as sent to the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub sources: Vec<Source>,
    pub timestamp: DateTime<Utc>,
    pub streaming: bool,
}

impl Message {
    fn finalized(role: Role, content: String) -> Self {
        Self {
            id: new_message_id(),
            role,
            content,
            tool_calls: Vec::new(),
            sources: Vec::new(),
            timestamp: Utc::now(),
            streaming: false,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::finalized(Role::User, content.into())
    }

    /// Create a finalized assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::finalized(Role::Assistant, content.into())
    }

    /// Create a system notice (errors, readiness warnings)
    pub fn system(content: impl Into<String>) -> Self {
        Self::finalized(Role::System, content.into())
    }

    /// Create an assistant message that is still being extended
    pub fn streaming_assistant(content: impl Into<String>) -> Self {
        Self {
            streaming: true,
            ..Self::finalized(Role::Assistant, content.into())
        }
    }

    /// Mark the message as complete. Returns false if it already was.
    pub fn finalize(&mut self) -> bool {
        std::mem::replace(&mut self.streaming, false)
    }

    pub fn as_turn(&self) -> ChatTurn {
        ChatTurn {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

fn new_message_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_are_unique() {
        let a = Message::user("a");
        let b = Message::user("a");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("msg_"));
    }

    #[test]
    fn finalize_is_one_way() {
        let mut message = Message::streaming_assistant("");
        assert!(message.streaming);
        assert!(message.finalize());
        assert!(!message.streaming);
        assert!(!message.finalize());
        assert!(!message.streaming);
    }

    #[test]
    fn arguments_json_tolerates_partial_text() {
        let partial = ToolCall::new("t1", "lookup", "{\"q\":");
        assert_eq!(partial.arguments_json(), None);

        let complete = ToolCall::new("t1", "lookup", "{\"q\":\"x\"}");
        assert_eq!(
            complete.arguments_json(),
            Some(serde_json::json!({"q": "x"}))
        );

        assert_eq!(ToolCall::new("t2", "noop", "").arguments_json(), None);
    }

    #[test]
    fn role_serializes_lowercase() {
        let turn = ChatTurn::assistant("hi");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn only_user_and_assistant_are_conversational() {
        assert!(Role::User.is_conversational());
        assert!(Role::Assistant.is_conversational());
        assert!(!Role::System.is_conversational());
        assert!(!Role::Tool.is_conversational());
    }
}
