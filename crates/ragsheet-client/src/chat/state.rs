//! In-memory conversation state

use serde::Serialize;

use super::message::{ChatTurn, Message};
use crate::error::{ClientError, Result};

/// Finalized messages plus at most one message still streaming
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    streaming: Option<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalized messages in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn streaming(&self) -> Option<&Message> {
        self.streaming.as_ref()
    }

    pub fn streaming_mut(&mut self) -> Option<&mut Message> {
        self.streaming.as_mut()
    }

    /// Append a finalized message
    pub fn push(&mut self, mut message: Message) {
        message.finalize();
        self.messages.push(message);
    }

    /// Install the in-progress message. Fails if one is already streaming.
    pub fn begin_streaming(&mut self, message: Message) -> Result<()> {
        if self.streaming.is_some() {
            return Err(ClientError::TurnInFlight);
        }
        debug_assert!(message.streaming);
        self.streaming = Some(message);
        Ok(())
    }

    /// Replace the in-progress message, keeping its position
    pub fn replace_streaming(&mut self, message: Message) {
        self.streaming = Some(message);
    }

    /// Move the in-progress message into history as finalized
    pub fn finalize_streaming(&mut self) -> Option<Message> {
        let mut message = self.streaming.take()?;
        message.finalize();
        self.messages.push(message.clone());
        Some(message)
    }

    /// Drop the in-progress message without finalizing it
    pub fn discard_streaming(&mut self) -> Option<Message> {
        self.streaming.take()
    }

    /// Conversation resent to the backend: user and assistant turns only
    pub fn history(&self) -> Vec<ChatTurn> {
        self.messages
            .iter()
            .filter(|message| message.role.is_conversational())
            .map(Message::as_turn)
            .collect()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        let mut messages = self.messages.clone();
        messages.extend(self.streaming.iter().cloned());
        ConversationSnapshot { messages }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.streaming = None;
    }
}

/// Renderable view of the conversation at one instant
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
}

impl ConversationSnapshot {
    /// The message currently being extended, always the last one
    pub fn streaming_message(&self) -> Option<&Message> {
        self.messages.last().filter(|message| message.streaming)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn streaming_count(&self) -> usize {
        self.messages.iter().filter(|message| message.streaming).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::Role;

    #[test]
    fn history_excludes_system_and_tool_messages() {
        let mut state = ConversationState::new();
        state.push(Message::user("q1"));
        state.push(Message::assistant("a1"));
        state.push(Message::system("Send failed"));
        state.push(Message::user("q2"));

        let history = state.history();
        assert_eq!(
            history,
            vec![
                ChatTurn::user("q1"),
                ChatTurn::assistant("a1"),
                ChatTurn::user("q2"),
            ]
        );
    }

    #[test]
    fn only_one_streaming_message_at_a_time() {
        let mut state = ConversationState::new();
        state
            .begin_streaming(Message::streaming_assistant("..."))
            .unwrap();
        assert!(matches!(
            state.begin_streaming(Message::streaming_assistant("again")),
            Err(ClientError::TurnInFlight)
        ));
        assert_eq!(state.snapshot().streaming_count(), 1);
    }

    #[test]
    fn snapshot_puts_streaming_message_last() {
        let mut state = ConversationState::new();
        state.push(Message::user("q"));
        state
            .begin_streaming(Message::streaming_assistant("partial"))
            .unwrap();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[0].role, Role::User);
        assert_eq!(
            snapshot.streaming_message().map(|m| m.content.as_str()),
            Some("partial")
        );
    }

    #[test]
    fn finalize_moves_message_into_history() {
        let mut state = ConversationState::new();
        state
            .begin_streaming(Message::streaming_assistant("done"))
            .unwrap();
        let message = state.finalize_streaming().unwrap();
        assert!(!message.streaming);
        assert!(state.streaming().is_none());
        assert_eq!(state.messages().len(), 1);
        assert!(state.snapshot().streaming_message().is_none());
    }

    #[test]
    fn discard_leaves_history_untouched() {
        let mut state = ConversationState::new();
        state.push(Message::user("q"));
        state
            .begin_streaming(Message::streaming_assistant("partial"))
            .unwrap();
        let discarded = state.discard_streaming().unwrap();
        assert!(discarded.streaming);
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn pushed_messages_are_always_finalized() {
        let mut state = ConversationState::new();
        state.push(Message::streaming_assistant("x"));
        assert!(!state.messages()[0].streaming);
    }
}
