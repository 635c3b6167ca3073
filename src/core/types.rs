//! Shared types used across Conductor modules
//!
//! Contains the message structures exchanged with the model and the result
//! type produced by every action execution.

use serde::{Deserialize, Serialize};

/// Author of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions rendered from a prompt template
    System,
    /// Task text and observations fed back to the model
    Human,
    /// Model replies and the records the loop writes on its behalf
    Ai,
}

impl Role {
    /// Role name as chat APIs expect it
    pub fn as_chat_role(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::Human => "user",
            Role::Ai => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::Human => write!(f, "human"),
            Role::Ai => write!(f, "ai"),
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a new human message
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    /// Create a new AI message
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }
}

/// Result of executing an action
///
/// `content` holds either the action's output or the error text; the loop
/// feeds both back to the model the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    /// Name of the action that was requested
    pub name: String,
    /// Output or error message
    pub content: String,
    /// Whether the action ran to completion
    pub success: bool,
}

impl ActionResult {
    /// Create a successful result
    pub fn success(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            success: true,
        }
    }

    /// Create a failed result
    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: error.into(),
            success: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::human("h").role, Role::Human);
        assert_eq!(Message::ai("a").role, Role::Ai);
    }

    #[test]
    fn test_chat_roles() {
        assert_eq!(Role::Human.as_chat_role(), "user");
        assert_eq!(Role::Ai.as_chat_role(), "assistant");
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn test_message_serializes_lowercase_role() {
        let json = serde_json::to_string(&Message::ai("done")).unwrap();
        assert_eq!(json, r#"{"role":"ai","content":"done"}"#);
    }
}
