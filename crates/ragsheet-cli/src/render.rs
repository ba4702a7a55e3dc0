//! Terminal rendering of conversation snapshots
//!
//! The session hands over a full snapshot after every frame; the terminal
//! can only append, so the renderer remembers what it already printed for
//! the streaming message and writes the difference.

use std::io::{self, Write};
use std::sync::Mutex;

use colored::Colorize;
use ragsheet_client::{ConversationSnapshot, Message, RenderSink, Role};

const CLEAR_LINE: &str = "\r\x1b[2K";

#[derive(Default)]
struct RenderState {
    /// Id of the assistant message currently being printed
    current: Option<String>,
    /// Exact text already written for `current`
    printed: String,
    /// Finalized messages already handled
    seen: usize,
}

pub struct TerminalRenderer<W: Write + Send> {
    inner: Mutex<(W, RenderState)>,
    color: bool,
    show_notices: bool,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), true)
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(writer: W, color: bool) -> Self {
        Self {
            inner: Mutex::new((writer, RenderState::default())),
            color,
            show_notices: true,
        }
    }

    /// Whether system messages (send failures, notices) are printed
    pub fn with_notices(mut self, show: bool) -> Self {
        self.show_notices = show;
        self
    }

    /// Forget everything printed; call after the conversation is cleared.
    pub fn reset(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.1 = RenderState::default();
        }
    }

    /// Close an unfinished streaming line after a cancelled turn.
    pub fn interrupt(&self, note: &str) {
        let Ok(mut guard) = self.inner.lock() else {
            return;
        };
        let (writer, state) = &mut *guard;
        if state.current.take().is_some() {
            let note = self.paint_dim(note);
            let _ = writeln!(writer, " {note}");
            let _ = writer.flush();
        }
        state.printed.clear();
    }

    #[cfg(test)]
    fn into_writer(self) -> W {
        match self.inner.into_inner() {
            Ok((writer, _)) => writer,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    fn paint_dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_notice(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    fn write_progress(&self, writer: &mut W, state: &mut RenderState, message: &Message) {
        if state.current.as_deref() != Some(message.id.as_str()) {
            state.current = Some(message.id.clone());
            state.printed.clear();
        }

        match message.content.strip_prefix(state.printed.as_str()) {
            Some(suffix) => {
                let _ = write!(writer, "{suffix}");
            }
            // Status lines are single-line, so clearing the line is enough.
            None => {
                let _ = write!(writer, "{CLEAR_LINE}{}", message.content);
            }
        }
        state.printed.clone_from(&message.content);
        let _ = writer.flush();
    }

    fn write_finalized(&self, writer: &mut W, state: &mut RenderState, message: &Message) {
        match message.role {
            Role::Assistant => {
                self.write_progress(writer, state, message);
                let _ = writeln!(writer);
                state.current = None;
                state.printed.clear();
            }
            Role::System if self.show_notices => {
                if state.current.take().is_some() {
                    let _ = writeln!(writer);
                }
                let _ = writeln!(writer, "{}", self.paint_notice(&message.content));
            }
            _ => {}
        }
        let _ = writer.flush();
    }
}

impl<W: Write + Send> RenderSink for TerminalRenderer<W> {
    fn render(&self, snapshot: &ConversationSnapshot) {
        let Ok(mut guard) = self.inner.lock() else {
            return;
        };
        let (writer, state) = &mut *guard;

        // A discarded streaming message can shrink the timeline.
        let finalized = snapshot.messages.iter().filter(|m| !m.streaming).count();
        if finalized < state.seen {
            state.seen = finalized;
        }

        for message in snapshot.messages.iter().skip(state.seen) {
            if message.streaming {
                self.write_progress(writer, state, message);
                break;
            }
            self.write_finalized(writer, state, message);
            state.seen += 1;
        }
    }
}
