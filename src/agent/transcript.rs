//! Transcript management
//!
//! The transcript is the ordered message history sent to the model. Each
//! Reason step stages the raw model reply as the single provisional element;
//! the step that follows either replaces it with a cleaned-up record
//! ([`Transcript::replace_provisional`]) or keeps it
//! ([`Transcript::commit_provisional`]). At most one provisional element ever
//! exists and it is always the last message.

use crate::core::{Message, Role};

/// Ordered message history for one agent invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
    /// Whether the last message is provisional
    provisional: bool,
}

impl Transcript {
    /// Start a transcript from a system prompt and the task message
    pub fn new(system_prompt: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::human(task)],
            provisional: false,
        }
    }

    /// Stage a provisional message
    ///
    /// A provisional message that is already staged is replaced.
    pub fn stage(&mut self, message: Message) {
        if self.provisional {
            self.messages.pop();
        }
        self.messages.push(message);
        self.provisional = true;
    }

    /// Replace the provisional message with `replacement`
    ///
    /// Returns the message that was replaced. Without a provisional message
    /// the replacement is appended and `None` is returned.
    pub fn replace_provisional(
        &mut self,
        replacement: impl IntoIterator<Item = Message>,
    ) -> Option<Message> {
        let replaced = if self.provisional {
            self.messages.pop()
        } else {
            tracing::warn!("no provisional message to replace; appending");
            None
        };
        self.provisional = false;
        self.messages.extend(replacement);
        replaced
    }

    /// Keep the provisional message and append `extra` after it
    pub fn commit_provisional(&mut self, extra: impl IntoIterator<Item = Message>) {
        self.provisional = false;
        self.messages.extend(extra);
    }

    /// Messages in order, including a staged provisional message
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The provisional message, if one is staged
    pub fn provisional(&self) -> Option<&Message> {
        if self.provisional {
            self.messages.last()
        } else {
            None
        }
    }

    pub fn has_provisional(&self) -> bool {
        self.provisional
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

    /// Number of messages with the given role
    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
