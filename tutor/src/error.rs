//! Error types for tutor operations.

use thiserror::Error;

use crate::llm::LlmError;

/// The main error type for chat and generator operations.
///
/// Every variant is recoverable: callers report it and keep going.
#[derive(Error, Debug)]
pub enum Error {
    /// The message was empty after trimming whitespace.
    #[error("Message is empty")]
    EmptyMessage,

    /// No session with this identifier exists.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A request for this session is still in flight.
    #[error("A request for session {0} is already in progress")]
    Busy(String),

    /// There is no user message to regenerate a reply for.
    #[error("No user message found to regenerate a response for")]
    NothingToRegenerate,

    /// The in-flight request was cancelled.
    #[error("Request was cancelled")]
    Cancelled,

    /// Rejected before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The inference collaborator failed.
    #[error("Failed to get a response from the AI: {0}")]
    Inference(#[from] LlmError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tutor operations.
pub type Result<T> = std::result::Result<T, Error>;
