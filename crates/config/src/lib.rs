//! Configuration management for the banking assistant
//!
//! Supports loading configuration from:
//! - YAML/TOML files under `config/`
//! - Environment variables (BANK_ASSISTANT__ prefix)
//!
//! # Domain Configuration
//!
//! The banking domain (intent patterns, spelling vocabulary, extraction
//! patterns, response texts) lives in `config/domain/*.yaml` and is read
//! through [`DomainConfig`].

pub mod domain;
pub mod settings;

pub use domain::{DomainConfig, DomainConfigError};
pub use settings::{
    load_settings, load_settings_from, EngineConfig, ExecutionConfig, LlmSettings,
    ObservabilityConfig, RuntimeEnvironment, ServerConfig, SessionConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Domain configuration error: {0}")]
    Domain(#[from] DomainConfigError),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
