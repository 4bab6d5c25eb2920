//! Declarative domain tables
//!
//! Four YAML files describe the banking domain:
//! - `patterns.yaml`: intent rules, vetoes, bonuses, forces, fast path
//! - `vocabulary.yaml`: spelling corrections and fuzzy vocabulary
//! - `extraction.yaml`: slot extraction patterns and lookup tables
//! - `responses.yaml`: slot phrases, confirmations and prompts
//!
//! The files under `config/domain/` are embedded at build time and can be
//! overridden at startup by pointing `engine.domain_dir` at a directory
//! holding any subset of them.

mod extraction;
mod patterns;
mod responses;
mod vocabulary;

pub use extraction::{
    AccountPatterns, AmountPatterns, BillNumberPatterns, ExtractionConfig, FrequencyPattern,
    HistoryPatterns, MerchantPatterns, NamePatterns, ProviderEntry, ServiceEntry, TypePattern,
};
pub use patterns::{
    BonusMode, FastPathConfig, FastPathRule, ForceRule, IntentPatterns, MatchRule,
    PatternsConfig, WeightBonus,
};
pub use responses::{ResponseConfidence, ResponsesConfig};
pub use vocabulary::{Correction, TopicRule, VocabularyConfig};

use serde::de::DeserializeOwned;
use std::path::Path;

const PATTERNS_YAML: &str = include_str!("../../../../config/domain/patterns.yaml");
const VOCABULARY_YAML: &str = include_str!("../../../../config/domain/vocabulary.yaml");
const EXTRACTION_YAML: &str = include_str!("../../../../config/domain/extraction.yaml");
const RESPONSES_YAML: &str = include_str!("../../../../config/domain/responses.yaml");

/// All domain tables
#[derive(Debug, Clone)]
pub struct DomainConfig {
    pub patterns: PatternsConfig,
    pub vocabulary: VocabularyConfig,
    pub extraction: ExtractionConfig,
    pub responses: ResponsesConfig,
}

impl DomainConfig {
    /// Tables shipped with the crate
    pub fn embedded() -> Result<Self, DomainConfigError> {
        let config = Self {
            patterns: parse("patterns.yaml", PATTERNS_YAML)?,
            vocabulary: parse("vocabulary.yaml", VOCABULARY_YAML)?,
            extraction: parse("extraction.yaml", EXTRACTION_YAML)?,
            responses: parse("responses.yaml", RESPONSES_YAML)?,
        };
        config.check()?;
        Ok(config)
    }

    /// Load from a directory; files that are absent fall back to the
    /// embedded tables.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, DomainConfigError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DomainConfigError::FileNotFound(
                dir.display().to_string(),
                "not a directory".to_string(),
            ));
        }

        let config = Self {
            patterns: load_or_embedded(dir, "patterns.yaml", PATTERNS_YAML)?,
            vocabulary: load_or_embedded(dir, "vocabulary.yaml", VOCABULARY_YAML)?,
            extraction: load_or_embedded(dir, "extraction.yaml", EXTRACTION_YAML)?,
            responses: load_or_embedded(dir, "responses.yaml", RESPONSES_YAML)?,
        };
        config.check()?;

        tracing::info!(
            dir = %dir.display(),
            intents = config.patterns.intents.len(),
            corrections = config.vocabulary.corrections.len(),
            providers = config.extraction.merchant.providers.len(),
            "Loaded domain config"
        );
        Ok(config)
    }

    /// Load from `dir` when given, otherwise use the embedded tables
    pub fn load_or_embedded(dir: Option<&Path>) -> Result<Self, DomainConfigError> {
        match dir {
            Some(dir) => Self::load(dir),
            None => Self::embedded(),
        }
    }

    fn check(&self) -> Result<(), DomainConfigError> {
        let missing = self.responses.missing_keys();
        if !missing.is_empty() {
            return Err(DomainConfigError::Invalid(format!(
                "responses.yaml is missing {}",
                missing.join(", ")
            )));
        }
        for rule in &self.patterns.fast_path.rules {
            if rule.replies.is_empty() {
                return Err(DomainConfigError::Invalid(format!(
                    "fast path rule for {} has no replies",
                    rule.intent
                )));
            }
        }
        for (intent, p) in &self.patterns.intents {
            if p.rules.is_empty() {
                return Err(DomainConfigError::Invalid(format!(
                    "intent {intent} has no rules"
                )));
            }
        }
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(name: &str, content: &str) -> Result<T, DomainConfigError> {
    serde_yaml::from_str(content)
        .map_err(|e| DomainConfigError::ParseError(name.to_string(), e.to_string()))
}

fn load_or_embedded<T: DeserializeOwned>(
    dir: &Path,
    name: &str,
    embedded: &str,
) -> Result<T, DomainConfigError> {
    let path = dir.join(name);
    if !path.exists() {
        tracing::debug!(file = name, "Using embedded domain table");
        return parse(name, embedded);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| {
        DomainConfigError::FileNotFound(path.display().to_string(), e.to_string())
    })?;
    parse(name, &content)
}

/// Errors loading domain tables
#[derive(Debug)]
pub enum DomainConfigError {
    FileNotFound(String, String),
    ParseError(String, String),
    Invalid(String),
}

impl std::fmt::Display for DomainConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileNotFound(path, err) => {
                write!(f, "Domain config not found at {}: {}", path, err)
            }
            Self::ParseError(file, err) => write!(f, "Failed to parse {}: {}", file, err),
            Self::Invalid(msg) => write!(f, "Invalid domain config: {}", msg),
        }
    }
}

impl std::error::Error for DomainConfigError {}
