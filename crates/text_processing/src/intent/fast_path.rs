//! Courtesy fast path
//!
//! Greetings, goodbyes and thanks are answered before any scoring, unless
//! the message also carries a banking request.

use regex::Regex;

use bank_assistant_config::domain::FastPathConfig;
use bank_assistant_core::Intent;

use crate::error::{Result, TextProcessingError};
use crate::pattern;

struct FastPathRule {
    intent: Intent,
    confidence: f32,
    pattern: Regex,
    replies: Vec<String>,
}

/// Fast-path hit
#[derive(Debug, Clone, Copy)]
pub struct FastPathMatch<'a> {
    pub intent: Intent,
    pub confidence: f32,
    /// Reply rotation, never empty
    pub replies: &'a [String],
}

impl FastPathMatch<'_> {
    /// Reply number `turn` of the rotation
    pub fn reply(&self, turn: usize) -> &str {
        &self.replies[turn % self.replies.len()]
    }
}

pub struct FastPath {
    banking_cue: Regex,
    rules: Vec<FastPathRule>,
}

impl FastPath {
    pub fn from_config(config: &FastPathConfig) -> Result<Self> {
        let rules = config
            .rules
            .iter()
            .map(|r| {
                if r.replies.is_empty() {
                    return Err(TextProcessingError::InvalidConfig(format!(
                        "fast path rule for {} has no replies",
                        r.intent
                    )));
                }
                Ok(FastPathRule {
                    intent: r.intent,
                    confidence: r.confidence,
                    pattern: pattern::compile(&r.pattern)?,
                    replies: r.replies.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            banking_cue: pattern::compile(&config.banking_cue)?,
            rules,
        })
    }

    /// First matching courtesy rule for normalized text
    pub fn check(&self, text: &str) -> Option<FastPathMatch<'_>> {
        if self.banking_cue.is_match(text) {
            return None;
        }
        self.rules
            .iter()
            .find(|r| r.pattern.is_match(text))
            .map(|r| FastPathMatch {
                intent: r.intent,
                confidence: r.confidence,
                replies: &r.replies,
            })
    }

    /// Rotation for a courtesy intent chosen by the scorer
    pub fn replies_for(&self, intent: Intent) -> Option<FastPathMatch<'_>> {
        self.rules
            .iter()
            .find(|r| r.intent == intent)
            .map(|r| FastPathMatch {
                intent: r.intent,
                confidence: r.confidence,
                replies: &r.replies,
            })
    }
}
