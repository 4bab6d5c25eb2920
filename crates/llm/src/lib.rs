//! LLM fallback for the banking assistant
//!
//! Features:
//! - Ollama chat backend with retry and exponential backoff
//! - French fallback prompt built from the transcript and caller context
//! - Envelope parsing (direct JSON, fenced block, first balanced object)
//!   validated against a JSON Schema before it is trusted
//! - Recipient-name lookup answering a bare name or `NONE`
//!
//! [`LlmFallbackClient`] implements [`bank_assistant_core::LlmFallback`];
//! [`LlmNameLookup`] implements [`bank_assistant_core::NameLookup`].

pub mod backend;
pub mod envelope;
pub mod fallback;
pub mod names;
pub mod prompt;

pub use backend::{LlmBackend, LlmConfig, OllamaBackend};
pub use envelope::EnvelopeParser;
pub use fallback::LlmFallbackClient;
pub use names::LlmNameLookup;
pub use prompt::{FallbackPrompt, Message, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Non-conforming envelope: {0}")]
    NonConforming(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for bank_assistant_core::Error {
    fn from(err: LlmError) -> Self {
        bank_assistant_core::Error::Llm(err.to_string())
    }
}
