//! Data models for chat sessions.

mod message;
mod session;

pub use message::{Message, MessageRole};
pub use session::{generate_session_id, ChatSession};
