//! Application settings
//!
//! Layered with the `config` crate: `config/default`, then
//! `config/{env}`, then `BANK_ASSISTANT__*` environment variables.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Relaxed validation, warnings only
    #[default]
    Development,
    Staging,
    /// All validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// Intent engine thresholds
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub sessions: SessionConfig,

    /// LLM fallback
    #[serde(default)]
    pub llm: LlmSettings,

    /// Banking execution back-end
    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Empty means any origin in development
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Intent engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Below this score the turn defers to the LLM fallback
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f32,

    /// Upper bound of the reported confidence
    #[serde(default = "default_max_confidence")]
    pub max_confidence: f32,

    /// Score given by priority rules and keyword forces
    #[serde(default = "default_priority_floor")]
    pub priority_floor: f32,

    /// Minimum fuzzy similarity (0-100) to accept a spelling correction
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: u8,

    /// Words shorter than this are only corrected through the exact table
    #[serde(default = "default_min_fuzzy_word_len")]
    pub min_fuzzy_word_len: usize,

    /// Offset of the bank's local time (Africa/Tunis is UTC+01:00 year-round)
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Directory overriding the embedded domain tables
    #[serde(default)]
    pub domain_dir: Option<PathBuf>,
}

fn default_confidence_floor() -> f32 {
    0.4
}

fn default_max_confidence() -> f32 {
    0.95
}

fn default_priority_floor() -> f32 {
    0.9
}

fn default_similarity_threshold() -> u8 {
    70
}

fn default_min_fuzzy_word_len() -> usize {
    4
}

fn default_utc_offset_minutes() -> i32 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_floor: default_confidence_floor(),
            max_confidence: default_max_confidence(),
            priority_floor: default_priority_floor(),
            similarity_threshold: default_similarity_threshold(),
            min_fuzzy_word_len: default_min_fuzzy_word_len(),
            utc_offset_minutes: default_utc_offset_minutes(),
            domain_dir: None,
        }
    }
}

/// Session lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle time before a session is evicted
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,

    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// Age after which a pending slot-filling request is dropped
    #[serde(default = "default_pending_ttl")]
    pub pending_state_ttl_secs: u64,

    /// Transcript messages kept per session for the LLM fallback
    #[serde(default = "default_transcript_limit")]
    pub transcript_limit: usize,
}

fn default_max_sessions() -> usize {
    1000
}

fn default_session_timeout() -> u64 {
    3600
}

fn default_cleanup_interval() -> u64 {
    300
}

fn default_pending_ttl() -> u64 {
    600
}

fn default_transcript_limit() -> usize {
    30
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            session_timeout_secs: default_session_timeout(),
            cleanup_interval_secs: default_cleanup_interval(),
            pending_state_ttl_secs: default_pending_ttl(),
            transcript_limit: default_transcript_limit(),
        }
    }
}

/// LLM fallback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Bound on a whole fallback call, retries included
    #[serde(default = "default_llm_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,

    /// Ask the model for recipient names, the heuristic answering when it
    /// fails or times out
    #[serde(default = "default_true")]
    pub name_lookup: bool,

    #[serde(default = "default_name_lookup_timeout")]
    pub name_lookup_timeout_ms: u64,
}

fn default_llm_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_llm_timeout() -> u64 {
    15_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff() -> u64 {
    100
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> usize {
    512
}

fn default_keep_alive() -> String {
    "5m".to_string()
}

fn default_name_lookup_timeout() -> u64 {
    3_000
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            timeout_ms: default_llm_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            keep_alive: default_keep_alive(),
            name_lookup: true,
            name_lookup_timeout_ms: default_name_lookup_timeout(),
        }
    }
}

/// Banking execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// When disabled, actions are answered by the dry-run executor
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_execution_timeout")]
    pub timeout_ms: u64,
}

fn default_execution_timeout() -> u64 {
    10_000
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            timeout_ms: default_execution_timeout(),
        }
    }
}

/// Logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// OTLP collector, used when built with the `telemetry` feature
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
            otlp_endpoint: None,
        }
    }
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_engine()?;
        self.validate_sessions()?;
        self.validate_llm()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port must be non-zero".to_string(),
            });
        }

        if self.environment.is_strict()
            && self.server.cors_enabled
            && self.server.cors_origins.is_empty()
        {
            tracing::warn!(
                environment = ?self.environment,
                "CORS enabled without explicit origins; no cross-origin request will be allowed"
            );
        }

        Ok(())
    }

    fn validate_engine(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;

        if !(engine.confidence_floor > 0.0 && engine.confidence_floor < 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "engine.confidence_floor".to_string(),
                message: format!("Must be between 0.0 and 1.0, got {}", engine.confidence_floor),
            });
        }

        if engine.max_confidence < engine.confidence_floor || engine.max_confidence > 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.max_confidence".to_string(),
                message: format!(
                    "Must be between confidence_floor ({}) and 1.0, got {}",
                    engine.confidence_floor, engine.max_confidence
                ),
            });
        }

        if !(0.0..=1.0).contains(&engine.priority_floor) {
            return Err(ConfigError::InvalidValue {
                field: "engine.priority_floor".to_string(),
                message: format!("Must be between 0.0 and 1.0, got {}", engine.priority_floor),
            });
        }

        if engine.similarity_threshold > 100 {
            return Err(ConfigError::InvalidValue {
                field: "engine.similarity_threshold".to_string(),
                message: format!("Must be at most 100, got {}", engine.similarity_threshold),
            });
        }

        if engine.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::InvalidValue {
                field: "engine.utc_offset_minutes".to_string(),
                message: format!("Out of range: {}", engine.utc_offset_minutes),
            });
        }

        Ok(())
    }

    fn validate_sessions(&self) -> Result<(), ConfigError> {
        if self.sessions.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sessions.max_sessions".to_string(),
                message: "Must allow at least one session".to_string(),
            });
        }

        if self.sessions.transcript_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sessions.transcript_limit".to_string(),
                message: "Must keep at least one message".to_string(),
            });
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        if self.llm.enabled && self.llm.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField("llm.endpoint".to_string()));
        }

        if self.llm.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.timeout_ms".to_string(),
                message: "Timeout must be non-zero".to_string(),
            });
        }

        if self.llm.name_lookup && self.llm.name_lookup_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.name_lookup_timeout_ms".to_string(),
                message: "Timeout must be non-zero".to_string(),
            });
        }

        if self.execution.enabled && self.execution.endpoint.is_none() {
            return Err(ConfigError::MissingField("execution.endpoint".to_string()));
        }

        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (BANK_ASSISTANT__ prefix)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Same as [`load_settings`] with an explicit configuration directory
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(&format!("{}/default", dir)).required(false));

    if let Some(env_name) = env {
        builder = builder
            .add_source(File::with_name(&format!("{}/{}", dir, env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("BANK_ASSISTANT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
