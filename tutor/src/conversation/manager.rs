//! Sending messages and regenerating replies against a session's history.
//!
//! Both operations follow the same shape: apply a tentative history to the
//! session store, await the model, then either commit the reply or restore
//! the exact history that was there before the call.

use std::sync::Arc;

use parking_lot::Mutex;

use super::gate::{FlightGate, FlightGuard};
use crate::error::{Error, Result};
use crate::llm::{prompt, GenerateRequest, GenerateResponse, InferenceClient};
use crate::models::Message;
use crate::sessions::SessionStore;
use crate::storage::KeyValueStore;

/// Largest attached file accepted as chat context.
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// Per-call settings for a conversational request.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// System prompt (tutor persona).
    pub system_prompt: String,
    /// Model identifier.
    pub model: String,
}

/// Drives conversational turns for the sessions in a [`SessionStore`].
pub struct ConversationManager<C, S: KeyValueStore> {
    client: C,
    sessions: Arc<Mutex<SessionStore<S>>>,
    gate: FlightGate,
}

impl<C, S> ConversationManager<C, S>
where
    C: InferenceClient,
    S: KeyValueStore,
{
    pub fn new(client: C, sessions: Arc<Mutex<SessionStore<S>>>) -> Self {
        Self {
            client,
            sessions,
            gate: FlightGate::new(),
        }
    }

    /// Shared handle to the session store.
    pub fn sessions(&self) -> &Arc<Mutex<SessionStore<S>>> {
        &self.sessions
    }

    /// Whether a send or regenerate is outstanding for `session_id`.
    pub fn is_busy(&self, session_id: &str) -> bool {
        self.gate.is_busy(session_id)
    }

    /// Cancel the outstanding request for `session_id`. The pending call
    /// rolls back and returns [`Error::Cancelled`].
    pub fn cancel(&self, session_id: &str) -> bool {
        self.gate.cancel(session_id)
    }

    /// Send a user message and append the assistant's reply.
    ///
    /// Returns the full updated history (prior + user + assistant). On any
    /// failure the session's history is restored to what it was before the call.
    pub async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        file_content: Option<&str>,
        options: &ChatOptions,
    ) -> Result<Vec<Message>> {
        if content.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }
        if file_content.is_some_and(|f| f.len() > MAX_ATTACHMENT_BYTES) {
            return Err(Error::InvalidInput(
                "attached file is larger than 5MB".to_string(),
            ));
        }

        let guard = self.gate.acquire(session_id)?;

        let prior = self.snapshot(session_id)?;
        let mut pending = prior.clone();
        pending.push(Message::user(content));
        self.sessions.lock().update_messages(session_id, pending.clone());

        let request = prompt::chat_request(
            &options.model,
            &options.system_prompt,
            &prior,
            content,
            file_content,
        );

        match self.complete(&guard, request).await {
            Ok(reply) => {
                pending.push(Message::assistant(reply));
                self.commit(session_id, &pending);
                tracing::info!(session = session_id, messages = pending.len(), "Reply received");
                Ok(pending)
            }
            Err(e) => {
                tracing::warn!(session = session_id, error = %e, "Send failed, rolling back");
                self.sessions.lock().update_messages(session_id, prior);
                Err(e)
            }
        }
    }

    /// Replace the reply to the most recent user message with a fresh one.
    ///
    /// Everything after the last user message is discarded and a new reply is
    /// requested for it. On failure the untruncated history is restored.
    pub async fn regenerate(
        &self,
        session_id: &str,
        options: &ChatOptions,
    ) -> Result<Vec<Message>> {
        let guard = self.gate.acquire(session_id)?;

        let original = self.snapshot(session_id)?;
        let last_user = original
            .iter()
            .rposition(Message::is_user)
            .ok_or(Error::NothingToRegenerate)?;

        let context = &original[..last_user];
        let user_message = original[last_user].clone();
        let mut pending = original[..=last_user].to_vec();
        self.sessions.lock().update_messages(session_id, pending.clone());

        let request = prompt::chat_request(
            &options.model,
            &options.system_prompt,
            context,
            &user_message.content,
            None,
        );

        match self.complete(&guard, request).await {
            Ok(reply) => {
                pending.push(Message::assistant(reply));
                self.commit(session_id, &pending);
                tracing::info!(session = session_id, "Reply regenerated");
                Ok(pending)
            }
            Err(e) => {
                tracing::warn!(
                    session = session_id,
                    error = %e,
                    "Regenerate failed, restoring history"
                );
                self.sessions.lock().update_messages(session_id, original);
                Err(e)
            }
        }
    }

    fn snapshot(&self, session_id: &str) -> Result<Vec<Message>> {
        self.sessions
            .lock()
            .get(session_id)
            .map(|s| s.messages.clone())
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    fn commit(&self, session_id: &str, messages: &[Message]) {
        if !self
            .sessions
            .lock()
            .update_messages(session_id, messages.to_vec())
        {
            tracing::warn!(session = session_id, "Session was deleted before the reply arrived");
        }
    }

    /// Run one inference call, racing the session's cancellation token.
    async fn complete(&self, guard: &FlightGuard<'_>, request: GenerateRequest) -> Result<String> {
        tokio::select! {
            () = guard.token().cancelled() => Err(Error::Cancelled),
            response = self.client.generate(request) => {
                response.and_then(GenerateResponse::into_text).map_err(Error::from)
            }
        }
    }
}
