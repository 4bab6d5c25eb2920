//! Text processing for the banking assistant
//!
//! This crate provides the deterministic NLU engine:
//! - **Normalization**: accent folding and spelling correction against the
//!   banking vocabulary
//! - **Intent Scoring**: weighted pattern rules with vetoes, bonuses,
//!   priority overrides and keyword forces
//! - **Fast Path**: courtesy replies answered before scoring
//! - **Slot Extraction**: amounts, accounts, names, merchants, bill
//!   numbers, schedules and history periods
//!
//! Everything is built once from [`DomainConfig`](bank_assistant_config::DomainConfig)
//! and is read-only afterwards.
//!
//! # Example
//!
//! ```ignore
//! use bank_assistant_config::{DomainConfig, EngineConfig};
//! use bank_assistant_text_processing::NluPipeline;
//!
//! let domain = DomainConfig::embedded()?;
//! let nlu = NluPipeline::new(&domain, &EngineConfig::default())?;
//!
//! let text = nlu.normalizer.normalize("Quel est mon slde ?");
//! let best = nlu.scorer.detect(&text.corrected);
//! ```

pub mod intent;
pub mod normalizer;
pub mod pattern;
pub mod slot_extraction;

mod error;
mod pipeline;

pub use error::{Result, TextProcessingError};
pub use pipeline::NluPipeline;

pub use intent::{FastPath, FastPathMatch, IntentScorer, IntentScores, ScoredIntent, ScorerConfig};
pub use normalizer::{fold, Normalized, NormalizerConfig, TextNormalizer};
pub use slot_extraction::{
    format_amount, BareNameMatcher, Extraction, HeuristicNameExtractor, MerchantMatch, MessageText,
    NameExtractor, SlotExtractor, SlotValidator,
};
