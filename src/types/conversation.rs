//! Conversation log
//!
//! The append-only, ordered message log a chat is made of. Entries are never
//! removed; only the most recent assistant message is mutated in place while
//! a round streams into it.

use serde::{Deserialize, Serialize};

use super::message::{AssistantMessage, Message};
use crate::error::{ChatError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a message and return its index.
    pub fn push(&mut self, message: impl Into<Message>) -> usize {
        self.messages.push(message.into());
        self.messages.len() - 1
    }

    /// Mutable access to the assistant message at `index`.
    ///
    /// Fails with `InternalError` when the index is out of range or points at
    /// another role, which means the caller lost track of its placeholder.
    pub fn assistant_mut(&mut self, index: usize) -> Result<&mut AssistantMessage> {
        self.messages
            .get_mut(index)
            .and_then(Message::as_assistant_mut)
            .ok_or_else(|| {
                ChatError::InternalError(format!("no assistant message at log index {index}"))
            })
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self::from_messages(messages)
    }
}
