//! Session model representing one chat conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Message;

/// Maximum characters of the first user message shown as a session title.
const TITLE_LEN: usize = 40;

/// A chat session: an ordered message history plus identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Unique, time-ordered session identifier.
    pub id: String,
    /// Messages in chronological order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create an empty session with a fresh identifier.
    pub fn new() -> Self {
        Self {
            id: generate_session_id(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Short label for listings: the first user message, or "New chat".
    pub fn title(&self) -> String {
        self.messages
            .iter()
            .find(|m| m.is_user())
            .map_or_else(
                || "New chat".to_string(),
                |m| {
                    let line = m.content.lines().next().unwrap_or_default().trim();
                    if line.chars().count() > TITLE_LEN {
                        let short: String = line.chars().take(TITLE_LEN - 3).collect();
                        format!("{short}...")
                    } else {
                        line.to_string()
                    }
                },
            )
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a `UUIDv7` (time-ordered, globally unique).
pub fn generate_session_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sessions_are_empty_and_distinct() {
        let a = ChatSession::new();
        let b = ChatSession::new();
        assert!(a.messages.is_empty());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn title_uses_first_user_message() {
        let mut session = ChatSession::new();
        assert_eq!(session.title(), "New chat");

        session.messages = vec![
            Message::user("What is a list?\nand more"),
            Message::assistant("An ordered collection."),
        ];
        assert_eq!(session.title(), "What is a list?");

        session.messages = vec![Message::user("x".repeat(100))];
        assert_eq!(session.title().chars().count(), TITLE_LEN);
    }

    #[test]
    fn persists_created_at_in_camel_case() {
        let json = serde_json::to_value(ChatSession::new()).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("messages").unwrap().as_array().unwrap().is_empty());
    }
}
