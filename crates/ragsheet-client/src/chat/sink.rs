use super::state::ConversationSnapshot;

/// Receives the ordered message list after every processed frame.
///
/// Called synchronously from the session, so implementations should hand
/// the snapshot off quickly (print, forward to a channel, store).
pub trait RenderSink: Send + Sync {
    fn render(&self, snapshot: &ConversationSnapshot);
}

impl<F> RenderSink for F
where
    F: Fn(&ConversationSnapshot) + Send + Sync,
{
    fn render(&self, snapshot: &ConversationSnapshot) {
        self(snapshot)
    }
}
