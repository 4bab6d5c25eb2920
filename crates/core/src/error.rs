//! Error types shared across the assistant crates

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown intent: {0}")]
    UnknownIntent(String),

    #[error("Unknown slot: {0}")]
    UnknownSlot(String),

    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Timeout after {0} ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
