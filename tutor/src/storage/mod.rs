//! Local key-value persistence.
//!
//! Everything the app remembers between runs (sessions, the active session,
//! settings) goes through a string-keyed store where each value is an
//! independently JSON-encoded payload.

mod file;
mod kv;

pub use file::{FileStore, HOME_ENV};
#[cfg(test)]
pub use kv::MemoryStore;
pub use kv::{load_or, save, KeyValueStore, StorageError};

/// Key holding the array of chat sessions.
pub const KEY_SESSIONS: &str = "chatSessions";
/// Key holding the active session identifier.
pub const KEY_ACTIVE_SESSION: &str = "activeChatSessionId";
/// Key holding the selected model identifier.
pub const KEY_MODEL: &str = "model";
/// Key holding the API key.
pub const KEY_API_KEY: &str = "apiKey";
/// Key holding the system prompt.
pub const KEY_SYSTEM_PROMPT: &str = "systemPrompt";
