//! Intent Scorer
//!
//! Scores every banking intent against normalized text using the pattern
//! library, then applies turn-level keyword forces and picks a winner.
//!
//! Per intent:
//! 1. a matching veto zeroes the score
//! 2. no matching rule zeroes the score
//! 3. `(Σ partial / rule_count + min(match_cap, matches × match_step)) × weight`,
//!    where `weight` includes the intent's bonuses
//! 4. a matching priority rule lifts the score to the priority floor
//! 5. clamp to [0, 1]
//!
//! Precedence across the turn: veto > keyword force > weighted score.
//! Equal scores are resolved by the configured tie order.

mod fast_path;

pub use fast_path::{FastPath, FastPathMatch};

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

use bank_assistant_config::domain::{BonusMode, PatternsConfig};
use bank_assistant_core::Intent;

use crate::error::Result;
use crate::pattern::{self, all_match, any_match};

/// Scorer thresholds
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Minimum score for an intent to be selected
    pub confidence_floor: f32,
    /// Upper bound of the reported confidence
    pub max_confidence: f32,
    /// Score given by a matching priority rule
    pub priority_floor: f32,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.4,
            max_confidence: 0.95,
            priority_floor: 0.9,
        }
    }
}

struct CompiledRule {
    pattern: Regex,
    priority: bool,
    partial: f32,
}

struct CompiledBonus {
    mode: BonusMode,
    amount: f32,
    patterns: Vec<Regex>,
}

impl CompiledBonus {
    fn value(&self, text: &str) -> f32 {
        match self.mode {
            BonusMode::Each => {
                let hits = self.patterns.iter().filter(|p| p.is_match(text)).count();
                self.amount * hits as f32
            }
            BonusMode::Any if any_match(&self.patterns, text) => self.amount,
            BonusMode::All if all_match(&self.patterns, text) => self.amount,
            _ => 0.0,
        }
    }
}

struct CompiledIntent {
    intent: Intent,
    weight: f32,
    match_step: f32,
    match_cap: f32,
    rules: Vec<CompiledRule>,
    vetoes: Vec<Regex>,
    bonuses: Vec<CompiledBonus>,
}

struct CompiledForce {
    intent: Intent,
    floor: f32,
    all: Vec<Regex>,
}

/// Scores of every intent for one message
#[derive(Debug, Clone, Default)]
pub struct IntentScores {
    scores: BTreeMap<Intent, f32>,
    vetoed: BTreeSet<Intent>,
}

impl IntentScores {
    pub fn get(&self, intent: Intent) -> f32 {
        self.scores.get(&intent).copied().unwrap_or(0.0)
    }

    pub fn is_vetoed(&self, intent: Intent) -> bool {
        self.vetoed.contains(&intent)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Intent, f32)> + '_ {
        self.scores.iter().map(|(i, s)| (*i, *s))
    }
}

/// Winning intent of a message
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredIntent {
    pub intent: Intent,
    /// Raw score after forces
    pub score: f32,
    /// Reported confidence, capped
    pub confidence: f32,
}

/// Weighted pattern scorer
pub struct IntentScorer {
    intents: Vec<CompiledIntent>,
    forces: Vec<CompiledForce>,
    tie_order: Vec<Intent>,
    config: ScorerConfig,
}

impl IntentScorer {
    pub fn from_config(patterns: &PatternsConfig, config: ScorerConfig) -> Result<Self> {
        let mut intents = Vec::with_capacity(patterns.intents.len());
        for (intent, p) in &patterns.intents {
            let rules = p
                .rules
                .iter()
                .map(|r| {
                    Ok(CompiledRule {
                        pattern: pattern::compile(&r.pattern)?,
                        priority: r.priority,
                        partial: p.partial_score(&r.pattern),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let bonuses = p
                .bonuses
                .iter()
                .map(|b| {
                    Ok(CompiledBonus {
                        mode: b.mode,
                        amount: b.amount,
                        patterns: pattern::compile_all(&b.patterns)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            intents.push(CompiledIntent {
                intent: *intent,
                weight: p.weight,
                match_step: p.match_step,
                match_cap: p.match_cap,
                rules,
                vetoes: pattern::compile_all(&p.vetoes)?,
                bonuses,
            });
        }

        let forces = patterns
            .forces
            .iter()
            .map(|f| {
                Ok(CompiledForce {
                    intent: f.intent,
                    floor: f.floor,
                    all: pattern::compile_all(&f.all)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            intents = intents.len(),
            forces = forces.len(),
            "Intent scorer ready"
        );

        Ok(Self {
            intents,
            forces,
            tie_order: patterns.tie_order.clone(),
            config,
        })
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Weighted score of one intent, without turn-level forces
    pub fn score(&self, text: &str, intent: Intent) -> f32 {
        self.intents
            .iter()
            .find(|c| c.intent == intent)
            .map(|c| self.score_intent(c, text).0)
            .unwrap_or(0.0)
    }

    /// Returns the score and whether a veto fired
    fn score_intent(&self, c: &CompiledIntent, text: &str) -> (f32, bool) {
        if any_match(&c.vetoes, text) {
            return (0.0, true);
        }

        let matched: Vec<&CompiledRule> =
            c.rules.iter().filter(|r| r.pattern.is_match(text)).collect();
        if matched.is_empty() || c.rules.is_empty() {
            return (0.0, false);
        }

        let partial_sum: f32 = matched.iter().map(|r| r.partial).sum();
        let match_bonus = (matched.len() as f32 * c.match_step).min(c.match_cap);
        let weight = c.weight + c.bonuses.iter().map(|b| b.value(text)).sum::<f32>();

        let mut score = (partial_sum / c.rules.len() as f32 + match_bonus) * weight;
        if matched.iter().any(|r| r.priority) {
            score = score.max(self.config.priority_floor);
        }
        (score.clamp(0.0, 1.0), false)
    }

    /// Scores of every intent, forces applied
    pub fn score_all(&self, text: &str) -> IntentScores {
        let mut scores = IntentScores::default();
        for c in &self.intents {
            let (score, vetoed) = self.score_intent(c, text);
            scores.scores.insert(c.intent, score);
            if vetoed {
                scores.vetoed.insert(c.intent);
            }
        }

        for force in &self.forces {
            let current = scores.get(force.intent);
            if current > 0.0 && !scores.is_vetoed(force.intent) && all_match(&force.all, text) {
                scores
                    .scores
                    .insert(force.intent, current.max(force.floor).min(1.0));
            }
        }
        scores
    }

    /// Highest scoring intent with a non-zero score, ties broken by the
    /// configured order
    pub fn best(&self, text: &str) -> Option<ScoredIntent> {
        let scores = self.score_all(text);
        let mut ranked: Vec<(Intent, f32)> = scores.iter().filter(|(_, s)| *s > 0.0).collect();
        ranked.sort_by_key(|(intent, _)| self.tie_rank(*intent));

        let mut best: Option<(Intent, f32)> = None;
        for (intent, score) in ranked {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((intent, score)),
            }
        }

        best.map(|(intent, score)| ScoredIntent {
            intent,
            score,
            confidence: score.min(self.config.max_confidence),
        })
    }

    /// Winner at or above the confidence floor
    pub fn detect(&self, text: &str) -> Option<ScoredIntent> {
        let best = self.best(text)?;
        tracing::debug!(intent = %best.intent, score = best.score, "Best intent");
        (best.score >= self.config.confidence_floor).then_some(best)
    }

    fn tie_rank(&self, intent: Intent) -> usize {
        self.tie_order
            .iter()
            .position(|i| *i == intent)
            .unwrap_or(self.tie_order.len())
    }
}
