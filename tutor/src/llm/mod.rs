//! Hosted LLM inference.
//!
//! The rest of the crate talks to the model through [`InferenceClient`];
//! [`GeminiClient`] is the production implementation.

mod client;
mod gemini;
pub mod prompt;

pub use client::{GenerateRequest, GenerateResponse, InferenceClient, LlmError, Modality};
pub use gemini::{GeminiClient, DEFAULT_TIMEOUT};
