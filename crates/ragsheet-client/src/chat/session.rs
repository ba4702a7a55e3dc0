//! Streaming chat session
//!
//! One [`StreamingChatSession`] owns the conversation and runs at most one
//! turn at a time. A turn:
//!
//! 1. appends the user message and shows a placeholder assistant message,
//! 2. opens the backend stream and feeds decoded frames into a
//!    [`TurnAccumulator`], emitting a snapshot whenever the display changes,
//! 3. finalizes the assistant message on the first terminal signal.
//!
//! Transport failures replace the in-progress message with a system notice.
//! Cancellation (explicit or by dropping the `send` future) discards the
//! in-progress message and stops all further snapshots.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::backend::{ChatBackend, ChatRequest};
use super::decoder::decode_frames;
use super::frame::FrameEvent;
use super::message::{ChatTurn, Message};
use super::sink::RenderSink;
use super::state::{ConversationSnapshot, ConversationState};
use super::turn::TurnAccumulator;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

pub const THINKING_PLACEHOLDER: &str = "Thinking...";
pub const SEND_FAILED_PREFIX: &str = "Send failed: ";

pub struct StreamingChatSession {
    backend: Arc<dyn ChatBackend>,
    model: String,
    temperature: f32,
    state: Mutex<ConversationState>,
    in_flight: AtomicBool,
    cancel: Mutex<CancellationToken>,
    // Held while checking the token and rendering, and while cancelling.
    emit_lock: Mutex<()>,
}

impl StreamingChatSession {
    /// Create a session using the model settings from `config`
    pub fn new(backend: Arc<dyn ChatBackend>, config: &ClientConfig) -> Self {
        Self {
            backend,
            model: config.model.clone(),
            temperature: config.temperature,
            state: Mutex::new(ConversationState::new()),
            in_flight: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            emit_lock: Mutex::new(()),
        }
    }

    /// True while a turn's stream is open. Callers gate sending on this.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Current ordered message list, including any streaming message
    pub fn conversation(&self) -> ConversationSnapshot {
        self.state.lock().snapshot()
    }

    /// Append a system notice, e.g. a refused send because the backend is not ready
    pub fn push_notice(&self, text: impl Into<String>) -> Message {
        let message = Message::system(text);
        self.state.lock().push(message.clone());
        message
    }

    /// Forget the whole conversation. Refused while a turn is in flight.
    pub fn clear(&self) -> Result<()> {
        if self.is_in_flight() {
            return Err(ClientError::TurnInFlight);
        }
        self.state.lock().clear();
        Ok(())
    }

    /// Abandon the current turn.
    ///
    /// Once this returns no further snapshot is rendered for the turn. Must
    /// not be called from inside [`RenderSink::render`].
    pub fn cancel(&self) {
        let _emit = self.emit_lock.lock();
        self.cancel.lock().cancel();
    }

    /// Send `text` as a new user turn and stream the answer into `sink`.
    ///
    /// Returns the finalized assistant message.
    pub async fn send(&self, text: &str, sink: &dyn RenderSink) -> Result<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::Validation("message is empty".to_string()));
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ClientError::TurnInFlight);
        }

        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        let mut guard = TurnGuard {
            session: self,
            completed: false,
        };

        let request = {
            let mut state = self.state.lock();
            let mut messages = state.history();
            messages.push(ChatTurn::user(text));
            state.push(Message::user(text));
            ChatRequest::new(self.model.clone(), messages, self.temperature)
        };
        self.emit(&token, sink);

        let placeholder = Message::streaming_assistant(THINKING_PLACEHOLDER);
        let mut turn = TurnAccumulator::new(placeholder.clone());
        self.state.lock().begin_streaming(placeholder)?;
        self.emit(&token, sink);

        tracing::info!(
            model = %request.model,
            history = request.messages.len(),
            "Starting chat turn"
        );

        let bytes = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ClientError::Cancelled),
            opened = self.backend.open_stream(request) => match opened {
                Ok(bytes) => bytes,
                Err(e) => return Err(self.fail(e, &token, sink)),
            },
        };

        let mut frames = decode_frames(bytes);
        let mut frame_count = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ClientError::Cancelled),
                next = frames.next() => next,
            };

            match next {
                Some(Ok(FrameEvent::Chunk(chunk))) => {
                    frame_count += 1;
                    let outcome = turn.apply(&chunk);
                    tracing::debug!(
                        frame = frame_count,
                        changed = outcome.changed,
                        terminal = outcome.terminal,
                        "Applied chat frame"
                    );
                    if outcome.changed {
                        self.state.lock().replace_streaming(turn.message().clone());
                        self.emit(&token, sink);
                    }
                    if outcome.terminal {
                        break;
                    }
                }
                Some(Ok(FrameEvent::Done)) => break,
                Some(Ok(FrameEvent::Malformed(err))) => {
                    tracing::warn!(error = %err, "Skipping malformed chat frame");
                }
                Some(Err(e)) => return Err(self.fail(e, &token, sink)),
                None => return Err(self.fail(ClientError::IncompleteStream, &token, sink)),
            }
        }
        // Release the connection before finalizing.
        drop(frames);

        let message = turn.finish();
        {
            let mut state = self.state.lock();
            state.replace_streaming(message.clone());
            state.finalize_streaming();
        }
        guard.completed = true;
        self.emit(&token, sink);

        tracing::info!(
            frames = frame_count,
            tool_calls = message.tool_calls.len(),
            sources = message.sources.len(),
            "Chat turn finished"
        );
        Ok(message)
    }

    fn emit(&self, token: &CancellationToken, sink: &dyn RenderSink) {
        let _emit = self.emit_lock.lock();
        if token.is_cancelled() {
            return;
        }
        let snapshot = self.state.lock().snapshot();
        sink.render(&snapshot);
    }

    fn fail(
        &self,
        error: ClientError,
        token: &CancellationToken,
        sink: &dyn RenderSink,
    ) -> ClientError {
        tracing::warn!(error = %error, "Chat turn failed");
        {
            let mut state = self.state.lock();
            state.discard_streaming();
            state.push(Message::system(format!("{SEND_FAILED_PREFIX}{error}")));
        }
        self.emit(token, sink);
        error
    }
}

/// Clears the in-flight flag on every exit path and discards the
/// in-progress message unless the turn completed.
struct TurnGuard<'a> {
    session: &'a StreamingChatSession,
    completed: bool,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if !self.completed
            && self.session.state.lock().discard_streaming().is_some()
        {
            tracing::debug!("Discarded unfinished assistant message");
        }
        self.session.in_flight.store(false, Ordering::Release);
    }
}
