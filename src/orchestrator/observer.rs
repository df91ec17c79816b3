use crate::types::Conversation;

/// Receives the conversation after every mutation made by the orchestrator.
///
/// Called synchronously from the run loop, so implementations should be
/// quick: copy what they need (or rebuild display groups) and return.
pub trait ConversationObserver: Send + Sync {
    fn on_update(&self, conversation: &Conversation);
}

impl<F> ConversationObserver for F
where
    F: Fn(&Conversation) + Send + Sync,
{
    fn on_update(&self, conversation: &Conversation) {
        self(conversation)
    }
}

/// Observer that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ConversationObserver for NoopObserver {
    fn on_update(&self, _conversation: &Conversation) {}
}
