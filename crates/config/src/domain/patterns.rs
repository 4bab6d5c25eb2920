//! Intent pattern library
//!
//! Declarative per-intent match rules, vetoes and weight bonuses, plus the
//! turn-level forces and fast-path replies. Loaded from `patterns.yaml`.

use bank_assistant_core::{Intent, Slot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Patterns configuration loaded from patterns.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternsConfig {
    pub intents: BTreeMap<Intent, IntentPatterns>,
    #[serde(default)]
    pub forces: Vec<ForceRule>,
    #[serde(default)]
    pub tie_order: Vec<Intent>,
    pub fast_path: FastPathConfig,
    #[serde(default)]
    pub cancel: Vec<String>,
}

impl PatternsConfig {
    pub fn intent(&self, intent: Intent) -> Option<&IntentPatterns> {
        self.intents.get(&intent)
    }

    /// Slots that must be present before `intent` can be executed
    pub fn required_slots(&self, intent: Intent) -> &[Slot] {
        self.intents
            .get(&intent)
            .map(|p| p.required_slots.as_slice())
            .unwrap_or(&[])
    }

    /// Every pattern string in the file, for up-front compilation checks
    pub fn all_patterns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for p in self.intents.values() {
            out.extend(p.rules.iter().map(|r| r.pattern.as_str()));
            out.extend(p.vetoes.iter().map(String::as_str));
            for bonus in &p.bonuses {
                out.extend(bonus.patterns.iter().map(String::as_str));
            }
        }
        for force in &self.forces {
            out.extend(force.all.iter().map(String::as_str));
        }
        out.push(self.fast_path.banking_cue.as_str());
        out.extend(self.fast_path.rules.iter().map(|r| r.pattern.as_str()));
        out.extend(self.cancel.iter().map(String::as_str));
        out
    }
}

/// Scoring data of a single intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentPatterns {
    pub weight: f32,
    /// Fixed partial score per matching rule; when absent the partial is
    /// `min(0.3, len(pattern) / 50)`
    #[serde(default)]
    pub rule_score: Option<f32>,
    #[serde(default = "default_match_step")]
    pub match_step: f32,
    #[serde(default = "default_match_cap")]
    pub match_cap: f32,
    pub rules: Vec<MatchRule>,
    #[serde(default)]
    pub vetoes: Vec<String>,
    #[serde(default)]
    pub bonuses: Vec<WeightBonus>,
    #[serde(default)]
    pub required_slots: Vec<Slot>,
}

fn default_match_step() -> f32 {
    0.1
}

fn default_match_cap() -> f32 {
    0.3
}

impl IntentPatterns {
    /// Partial score contributed by one matching rule
    pub fn partial_score(&self, pattern: &str) -> f32 {
        match self.rule_score {
            Some(fixed) => fixed,
            None => (pattern.len() as f32 / 50.0).min(0.3),
        }
    }
}

/// Ordered match rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRule {
    pub pattern: String,
    /// Lifts the intent to the priority floor when it matches
    #[serde(default)]
    pub priority: bool,
}

/// How the patterns of a bonus are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusMode {
    /// Add the amount once per matching pattern
    Each,
    /// Add the amount once if any pattern matches
    Any,
    /// Add the amount once if every pattern matches
    All,
}

/// Weight bonus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightBonus {
    pub mode: BonusMode,
    pub amount: f32,
    pub patterns: Vec<String>,
}

/// Keyword force: lifts an already-scoring intent to `floor`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceRule {
    pub intent: Intent,
    pub floor: f32,
    /// Every pattern must match
    pub all: Vec<String>,
}

/// Courtesy replies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastPathConfig {
    /// A message matching this carries a banking request and skips the fast path
    pub banking_cue: String,
    pub rules: Vec<FastPathRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastPathRule {
    pub intent: Intent,
    pub confidence: f32,
    pub pattern: String,
    pub replies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_deserialization() {
        let yaml = r#"
intents:
  check_balance:
    weight: 0.85
    rules:
      - { pattern: 'mon\s+solde', priority: true }
      - pattern: 'solde\s+actuel'
    vetoes: ['\bmes\s+comptes\b']
    bonuses:
      - mode: any
        amount: 0.3
        patterns: ['^solde']
  transaction_history:
    weight: 0.95
    rule_score: 0.4
    match_step: 0.15
    rules:
      - pattern: 'historique'
forces:
  - intent: transaction_history
    floor: 0.9
    all: ['historique']
tie_order: [transaction_history, check_balance]
fast_path:
  banking_cue: 'solde'
  rules:
    - intent: greeting
      confidence: 0.95
      pattern: '^bonjour'
      replies: ["Bonjour !"]
"#;
        let config: PatternsConfig = serde_yaml::from_str(yaml).unwrap();
        let balance = config.intent(Intent::CheckBalance).unwrap();
        assert_eq!(balance.rule_score, None);
        assert!(balance.rules[0].priority);
        assert_eq!(balance.match_cap, 0.3);
        assert_eq!(balance.bonuses[0].mode, BonusMode::Any);

        let history = config.intent(Intent::TransactionHistory).unwrap();
        assert_eq!(history.rule_score, Some(0.4));
        assert_eq!(history.match_step, 0.15);

        assert!(config.required_slots(Intent::TransferMoney).is_empty());
        assert_eq!(config.fast_path.rules[0].intent, Intent::Greeting);
        assert!(config.cancel.is_empty());
    }

    #[test]
    fn test_partial_score() {
        let mut patterns = IntentPatterns {
            weight: 1.0,
            rule_score: None,
            match_step: 0.1,
            match_cap: 0.3,
            rules: Vec::new(),
            vetoes: Vec::new(),
            bonuses: Vec::new(),
            required_slots: Vec::new(),
        };
        assert!((patterns.partial_score("mon\\s+solde") - 0.22).abs() < 1e-6);
        assert_eq!(patterns.partial_score(&"x".repeat(40)), 0.3);
        patterns.rule_score = Some(0.4);
        assert_eq!(patterns.partial_score("historique"), 0.4);
    }
}
