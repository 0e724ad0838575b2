//! The ordered, append-only conversation log.

use healthbot_core::Message;

/// Messages in the order they were appended.
///
/// Entries are never edited or removed individually; `clear` empties the
/// whole log on reset.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recently appended bot message.
    pub fn last_bot(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_bot())
    }
}
