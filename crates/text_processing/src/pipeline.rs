//! Compiled NLU pipeline
//!
//! Bundles every component built from the domain tables. Built once at
//! startup and shared read-only across sessions.

use regex::Regex;
use std::sync::Arc;

use bank_assistant_config::{DomainConfig, EngineConfig};

use crate::intent::{FastPath, IntentScorer, ScorerConfig};
use crate::normalizer::{NormalizerConfig, TextNormalizer};
use crate::pattern;
use crate::slot_extraction::{NameExtractor, SlotExtractor};
use crate::Result;

pub struct NluPipeline {
    pub normalizer: TextNormalizer,
    pub fast_path: FastPath,
    pub scorer: IntentScorer,
    pub extractor: SlotExtractor,
    cancel: Vec<Regex>,
}

impl NluPipeline {
    pub fn new(domain: &DomainConfig, engine: &EngineConfig) -> Result<Self> {
        let extractor = SlotExtractor::from_config(&domain.extraction, engine.utc_offset_minutes)?;
        Self::assemble(domain, engine, extractor)
    }

    /// Same as [`new`](Self::new) with another name lookup
    pub fn with_name_extractor(
        domain: &DomainConfig,
        engine: &EngineConfig,
        names: Arc<dyn NameExtractor>,
    ) -> Result<Self> {
        let extractor = SlotExtractor::with_name_extractor(
            &domain.extraction,
            engine.utc_offset_minutes,
            names,
        )?;
        Self::assemble(domain, engine, extractor)
    }

    fn assemble(domain: &DomainConfig, engine: &EngineConfig, extractor: SlotExtractor) -> Result<Self> {
        let normalizer = TextNormalizer::from_config(
            &domain.vocabulary,
            NormalizerConfig {
                similarity_threshold: f64::from(engine.similarity_threshold),
                min_fuzzy_word_len: engine.min_fuzzy_word_len,
            },
        )?;
        let scorer = IntentScorer::from_config(
            &domain.patterns,
            ScorerConfig {
                confidence_floor: engine.confidence_floor,
                max_confidence: engine.max_confidence,
                priority_floor: engine.priority_floor,
            },
        )?;

        tracing::info!(
            intents = domain.patterns.intents.len(),
            confidence_floor = engine.confidence_floor,
            "NLU pipeline compiled"
        );

        Ok(Self {
            normalizer,
            fast_path: FastPath::from_config(&domain.patterns.fast_path)?,
            scorer,
            extractor,
            cancel: pattern::compile_all(&domain.patterns.cancel)?,
        })
    }

    /// Explicit abandonment of a pending request
    pub fn is_cancel(&self, text: &str) -> bool {
        pattern::any_match(&self.cancel, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> NluPipeline {
        let domain = DomainConfig::embedded().unwrap();
        NluPipeline::new(&domain, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_cancel() {
        let p = pipeline();
        assert!(p.is_cancel("annuler"));
        assert!(p.is_cancel("laisse tomber"));
        assert!(p.is_cancel("annule le virement"));
        assert!(!p.is_cancel("vers juliette compte 1984573201694"));
    }

    #[test]
    fn test_bad_domain_pattern_is_reported() {
        let mut domain = DomainConfig::embedded().unwrap();
        domain.patterns.cancel.push("(broken".to_string());
        let err = NluPipeline::new(&domain, &EngineConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("(broken"));
    }
}
