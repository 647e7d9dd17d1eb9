//! Message Types
//!
//! The unit of conversation content shared by the history endpoint, the
//! conversation buffer and the display layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Prompt typed by the user
    User,
    /// Reply streamed by Gigi
    Assistant,
}

impl Role {
    /// Label shown in front of the message
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "Gigi",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single conversation entry
///
/// Values are never edited after they land in a
/// [`Conversation`](crate::conversation::Conversation); appending a fragment
/// produces a new `Message` that replaces the old one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message
    pub role: Role,
    /// Raw markdown content
    pub content: String,
}

impl Message {
    /// Create a message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// A copy of this message with `fragment` appended to the content
    #[must_use]
    pub fn with_appended(&self, fragment: &str) -> Self {
        let mut content = String::with_capacity(self.content.len() + fragment.len());
        content.push_str(&self.content);
        content.push_str(fragment);
        Self {
            role: self.role,
            content,
        }
    }

    /// Whether the message should be hidden from display
    ///
    /// An assistant message with blank content is a placeholder for a reply
    /// that has not produced any text (yet, or ever).
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.role == Role::Assistant && self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = serde_json::from_str::<Message>(r#"{"role":"system","content":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_with_appended_leaves_original() {
        let original = Message::assistant("Hel");
        let next = original.with_appended("lo");
        assert_eq!(original.content, "Hel");
        assert_eq!(next, Message::assistant("Hello"));
    }

    #[test]
    fn test_placeholder() {
        assert!(Message::assistant("").is_placeholder());
        assert!(Message::assistant(" \n").is_placeholder());
        assert!(!Message::assistant("4").is_placeholder());
        assert!(!Message::user("").is_placeholder());
    }
}
