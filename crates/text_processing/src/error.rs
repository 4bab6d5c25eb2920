//! Error types for text processing

use thiserror::Error;

/// Text processing errors
///
/// Processing itself never fails; errors only come from building the
/// engine out of configuration.
#[derive(Error, Debug)]
pub enum TextProcessingError {
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, TextProcessingError>;

impl From<TextProcessingError> for bank_assistant_core::Error {
    fn from(err: TextProcessingError) -> Self {
        bank_assistant_core::Error::Config(err.to_string())
    }
}
