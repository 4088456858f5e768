//! Conversation context management: sending turns and regenerating replies.

mod gate;
mod manager;

pub use manager::{ChatOptions, ConversationManager, MAX_ATTACHMENT_BYTES};
