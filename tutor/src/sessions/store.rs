//! The session store: the single owner of chat sessions.
//!
//! Invariants held after every operation:
//! - the session list is never empty
//! - session identifiers are unique
//! - the active identifier refers to an existing session
//!
//! Every mutation is written through to the key-value store immediately.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::{generate_session_id, ChatSession, Message};
use crate::storage::{load_or, save, KeyValueStore, KEY_ACTIVE_SESSION, KEY_SESSIONS};

/// Owns the ordered session list (most recent first) and the active session.
pub struct SessionStore<S: KeyValueStore> {
    store: S,
    sessions: Vec<ChatSession>,
    active_id: String,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Load sessions from `store`, repairing anything that breaks the invariants.
    pub fn open(store: S) -> Self {
        let loaded: Vec<ChatSession> = load_or(&store, KEY_SESSIONS, Vec::new());
        let stored_active: Option<String> = load_or(&store, KEY_ACTIVE_SESSION, None);

        let mut repaired = false;
        let mut seen = HashSet::new();
        let mut sessions: Vec<ChatSession> = Vec::with_capacity(loaded.len());
        for session in loaded {
            if seen.insert(session.id.clone()) {
                sessions.push(session);
            } else {
                tracing::warn!(id = %session.id, "Dropping session with duplicate id");
                repaired = true;
            }
        }

        if sessions.is_empty() {
            sessions.push(ChatSession::new());
            repaired = true;
        }

        let active_id = match stored_active {
            Some(id) if sessions.iter().any(|s| s.id == id) => id,
            _ => {
                repaired = true;
                sessions[0].id.clone()
            }
        };

        let mut this = Self {
            store,
            sessions,
            active_id,
        };
        if repaired {
            this.persist();
        }
        tracing::debug!(count = this.sessions.len(), active = %this.active_id, "Loaded sessions");
        this
    }

    /// All sessions, most recently created first. Never empty.
    pub fn list_sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    /// Get a session by ID.
    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Identifier of the active session.
    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    /// The active session.
    pub fn active_session(&self) -> &ChatSession {
        self.get(&self.active_id).unwrap_or(&self.sessions[0])
    }

    /// Create an empty session and prepend it to the list.
    pub fn create_session(&mut self) -> ChatSession {
        let session = self.fresh_session();
        self.sessions.insert(0, session.clone());
        tracing::info!(id = %session.id, "Created session");
        self.persist();
        session
    }

    /// Delete a session. Returns whether a session was removed.
    ///
    /// Deleting the last session replaces it with a fresh empty one; deleting
    /// the active session moves the active marker to the first remaining one.
    pub fn delete_session(&mut self, id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() == before {
            return false;
        }

        if self.sessions.is_empty() {
            let replacement = self.fresh_session();
            tracing::info!(id = %replacement.id, "Created replacement for last session");
            self.sessions.push(replacement);
        }

        if self.get(&self.active_id).is_none() {
            self.active_id = self.sessions[0].id.clone();
        }

        tracing::info!(id, active = %self.active_id, "Deleted session");
        self.persist();
        true
    }

    /// Mark a session as active.
    pub fn set_active_session(&mut self, id: &str) -> Result<()> {
        if self.get(id).is_none() {
            return Err(Error::SessionNotFound(id.to_string()));
        }
        id.clone_into(&mut self.active_id);
        self.persist();
        Ok(())
    }

    /// Replace the messages of a session wholesale. No-op if the id is unknown.
    pub fn update_messages(&mut self, id: &str, messages: Vec<Message>) -> bool {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            tracing::debug!(id, "Ignoring message update for unknown session");
            return false;
        };
        session.messages = messages;
        self.persist();
        true
    }

    /// Remove every message from a session.
    pub fn clear_messages(&mut self, id: &str) -> bool {
        self.update_messages(id, Vec::new())
    }

    fn fresh_session(&self) -> ChatSession {
        let mut session = ChatSession::new();
        while self.get(&session.id).is_some() {
            session.id = generate_session_id();
        }
        session
    }

    fn persist(&mut self) {
        save(&mut self.store, KEY_SESSIONS, &self.sessions);
        save(&mut self.store, KEY_ACTIVE_SESSION, &self.active_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn reopen(store: SessionStore<MemoryStore>) -> SessionStore<MemoryStore> {
        SessionStore::open(store.store)
    }

    #[test]
    fn empty_storage_synthesizes_one_session() {
        let store = SessionStore::open(MemoryStore::new());
        assert_eq!(store.list_sessions().len(), 1);
        assert_eq!(store.active_id(), store.list_sessions()[0].id);
        assert!(store.kv_raw(KEY_SESSIONS).is_some());
    }

    #[test]
    fn corrupt_storage_falls_back_to_default() {
        let kv = MemoryStore::new().with_raw(KEY_SESSIONS, "not json");
        let store = SessionStore::open(kv);
        assert_eq!(store.list_sessions().len(), 1);
        assert!(store.active_session().messages.is_empty());
    }

    #[test]
    fn dangling_active_id_is_repaired() {
        let session = ChatSession::new();
        let kv = MemoryStore::new()
            .with_raw(KEY_SESSIONS, &serde_json::to_string(&vec![session.clone()]).unwrap())
            .with_raw(KEY_ACTIVE_SESSION, "\"gone\"");
        let store = SessionStore::open(kv);
        assert_eq!(store.active_id(), session.id);
    }

    #[test]
    fn duplicate_ids_from_storage_are_dropped() {
        let mut a = ChatSession::new();
        a.messages.push(Message::user("first"));
        let mut b = a.clone();
        b.messages.push(Message::user("second"));
        let kv = MemoryStore::new()
            .with_raw(KEY_SESSIONS, &serde_json::to_string(&vec![a, b]).unwrap());
        let store = SessionStore::open(kv);
        assert_eq!(store.list_sessions().len(), 1);
        assert_eq!(store.list_sessions()[0].messages.len(), 1);
    }

    #[test]
    fn create_prepends_and_persists() {
        let mut store = SessionStore::open(MemoryStore::new());
        let original = store.list_sessions()[0].id.clone();
        let created = store.create_session();

        assert_eq!(store.list_sessions()[0].id, created.id);
        assert_eq!(store.list_sessions()[1].id, original);

        let store = reopen(store);
        assert_eq!(store.list_sessions().len(), 2);
        assert_eq!(store.list_sessions()[0].id, created.id);
    }

    #[test]
    fn store_is_never_empty() {
        let mut store = SessionStore::open(MemoryStore::new());
        for round in 0..5 {
            if round % 2 == 0 {
                store.create_session();
            }
            let ids: Vec<String> = store.list_sessions().iter().map(|s| s.id.clone()).collect();
            for id in ids {
                assert!(store.delete_session(&id));
                assert!(!store.list_sessions().is_empty());
                assert!(store.get(store.active_id()).is_some());
            }
        }
    }

    #[test]
    fn deleting_last_session_creates_replacement() {
        let mut store = SessionStore::open(MemoryStore::new());
        let only = store.active_id().to_string();
        assert!(store.delete_session(&only));

        assert_eq!(store.list_sessions().len(), 1);
        assert_ne!(store.active_id(), only);
        assert_eq!(store.active_id(), store.list_sessions()[0].id);
    }

    #[test]
    fn deleting_active_session_moves_active() {
        let mut store = SessionStore::open(MemoryStore::new());
        let older = store.active_id().to_string();
        let newer = store.create_session();
        store.set_active_session(&newer.id).unwrap();

        assert!(store.delete_session(&newer.id));
        assert_eq!(store.active_id(), older);
    }

    #[test]
    fn deleting_inactive_session_keeps_active() {
        let mut store = SessionStore::open(MemoryStore::new());
        let active = store.active_id().to_string();
        let other = store.create_session();

        assert!(store.delete_session(&other.id));
        assert_eq!(store.active_id(), active);
        assert!(!store.delete_session("unknown"));
    }

    #[test]
    fn set_active_requires_existing_session() {
        let mut store = SessionStore::open(MemoryStore::new());
        let before = store.active_id().to_string();
        assert!(matches!(
            store.set_active_session("nope"),
            Err(Error::SessionNotFound(_))
        ));
        assert_eq!(store.active_id(), before);
    }

    #[test]
    fn update_messages_replaces_and_ignores_unknown() {
        let mut store = SessionStore::open(MemoryStore::new());
        let id = store.active_id().to_string();
        let messages = vec![Message::user("Hi"), Message::assistant("Hello!")];

        assert!(store.update_messages(&id, messages.clone()));
        assert!(!store.update_messages("unknown", Vec::new()));

        let mut store = reopen(store);
        assert_eq!(store.get(&id).unwrap().messages, messages);

        assert!(store.clear_messages(&id));
        assert!(store.get(&id).unwrap().messages.is_empty());
    }

    #[test]
    fn storage_failures_do_not_break_memory_state() {
        let mut store = SessionStore::open(MemoryStore::failing_writes());
        let created = store.create_session();
        assert_eq!(store.list_sessions()[0].id, created.id);
        assert!(store.update_messages(&created.id, vec![Message::user("Hi")]));
        assert_eq!(store.get(&created.id).unwrap().messages.len(), 1);
    }

    impl SessionStore<MemoryStore> {
        fn kv_raw(&self, key: &str) -> Option<&str> {
            self.store.raw(key)
        }
    }
}
