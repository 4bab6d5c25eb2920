//! Text normalization and spelling correction
//!
//! User text is folded (accents removed, lowercase, single spaces) and each
//! word is corrected against the banking vocabulary:
//! 1. exact lookup in the misspelling table
//! 2. fuzzy lookup for long alphabetic words that are not vocabulary,
//!    searching the categories suggested by the sentence topic first
//!
//! Normalization is idempotent: every correction target is itself a fixed
//! point, so a normalized sentence normalizes to itself.
//!
//! Correction only knows banking words, so free text such as recipient
//! names must be read from [`Normalized::folded`], never from the corrected
//! text, where "julie" may have become "oublie".

mod similarity;

pub use similarity::{ratio, similarity};

use regex::Regex;
use std::collections::{HashMap, HashSet};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use bank_assistant_config::domain::VocabularyConfig;

use crate::error::Result;
use crate::pattern;

/// Normalizer settings
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Minimum similarity (0..100) for a fuzzy correction
    pub similarity_threshold: f64,
    /// Words shorter than this are never fuzzily corrected
    pub min_fuzzy_word_len: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 70.0,
            min_fuzzy_word_len: 4,
        }
    }
}

/// Result of normalizing one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Folded and corrected text
    pub corrected: String,
    /// Folded text before any spelling correction
    pub folded: String,
    /// True when a spelling correction changed the folded text
    pub was_corrected: bool,
    /// Trimmed raw input
    pub original: String,
}

struct TopicRule {
    pattern: Regex,
    categories: Vec<String>,
}

/// Vocabulary-backed normalizer
pub struct TextNormalizer {
    corrections: HashMap<String, String>,
    categories: HashMap<String, Vec<String>>,
    /// Every category word, in category order, without duplicates
    vocabulary: Vec<String>,
    fixed_points: HashSet<String>,
    topics: Vec<TopicRule>,
    config: NormalizerConfig,
}

impl TextNormalizer {
    pub fn from_config(vocab: &VocabularyConfig, config: NormalizerConfig) -> Result<Self> {
        let corrections = vocab
            .corrections
            .iter()
            .filter_map(|(word, c)| Some((fold(word), fold(c.preferred()?))))
            .collect();

        let categories: HashMap<String, Vec<String>> = vocab
            .categories
            .iter()
            .map(|(name, words)| (name.clone(), words.iter().map(|w| fold(w)).collect()))
            .collect();

        let mut seen = HashSet::new();
        let mut vocabulary = Vec::new();
        for words in vocab.categories.values() {
            for word in words {
                let word = fold(word);
                if seen.insert(word.clone()) {
                    vocabulary.push(word);
                }
            }
        }

        let fixed_points = vocab.fixed_points().into_iter().map(fold).collect();

        let topics = vocab
            .topics
            .iter()
            .map(|t| {
                Ok(TopicRule {
                    pattern: pattern::compile(&t.pattern)?,
                    categories: t.categories.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            corrections = vocab.corrections.len(),
            vocabulary = vocabulary.len(),
            "Text normalizer ready"
        );

        Ok(Self {
            corrections,
            categories,
            vocabulary,
            fixed_points,
            topics,
            config,
        })
    }

    /// Normalize a message. Never fails.
    pub fn normalize(&self, raw: &str) -> Normalized {
        let original = raw.trim().to_string();
        let folded = fold(&original);
        let priority = self.topic_categories(&folded);

        let mut corrected = String::with_capacity(folded.len());
        for segment in folded.split_word_bounds() {
            if segment.chars().any(char::is_alphanumeric) {
                match self.correct_word(segment, &priority) {
                    Some(word) => corrected.push_str(&word),
                    None => corrected.push_str(segment),
                }
            } else {
                corrected.push_str(segment);
            }
        }

        let was_corrected = corrected != folded;
        if was_corrected {
            tracing::debug!(original = %folded, corrected = %corrected, "Spelling corrected");
        }

        Normalized {
            corrected,
            folded,
            was_corrected,
            original,
        }
    }

    fn topic_categories(&self, text: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for topic in &self.topics {
            if topic.pattern.is_match(text) {
                for category in &topic.categories {
                    if !out.contains(&category.as_str()) {
                        out.push(category.as_str());
                    }
                }
            }
        }
        out
    }

    fn correct_word(&self, word: &str, priority: &[&str]) -> Option<String> {
        if let Some(correction) = self.corrections.get(word) {
            return Some(correction.clone());
        }

        if word.chars().count() < self.config.min_fuzzy_word_len
            || !word.chars().all(char::is_alphabetic)
            || self.fixed_points.contains(word)
        {
            return None;
        }

        let prioritized = priority
            .iter()
            .filter_map(|name| self.categories.get(*name))
            .flatten();
        self.best_match(word, prioritized)
            .or_else(|| self.best_match(word, self.vocabulary.iter()))
    }

    fn best_match<'a>(
        &self,
        word: &str,
        candidates: impl Iterator<Item = &'a String>,
    ) -> Option<String> {
        let mut best: Option<(&String, f64)> = None;
        for candidate in candidates {
            let score = similarity(word, candidate);
            if score < self.config.similarity_threshold {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((candidate, score)),
            }
        }
        best.map(|(c, _)| c.clone())
    }
}

/// Fold text: typographic apostrophes, single spaces, no accents, lowercase
pub fn fold(text: &str) -> String {
    let spaced = text
        .replace(['\u{2019}', '\u{2018}'], "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    spaced
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_assistant_config::DomainConfig;

    fn normalizer() -> TextNormalizer {
        let domain = DomainConfig::embedded().unwrap();
        TextNormalizer::from_config(&domain.vocabulary, NormalizerConfig::default()).unwrap()
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("  Électricité   ET  Gaz "), "electricite et gaz");
        assert_eq!(fold("J\u{2019}ai payé"), "j'ai paye");
    }

    #[test]
    fn test_accent_folding_is_not_a_correction() {
        let n = normalizer().normalize("Quel est mon SOLDE ?");
        assert_eq!(n.corrected, "quel est mon solde ?");
        assert!(!n.was_corrected);
        assert_eq!(n.original, "Quel est mon SOLDE ?");
    }

    #[test]
    fn test_exact_correction() {
        let n = normalizer().normalize("bpnjour, je veux mon slde");
        assert_eq!(n.corrected, "bonjour, je veux mon solde");
        assert!(n.was_corrected);
    }

    #[test]
    fn test_list_correction_uses_first_entry() {
        let n = normalizer().normalize("tous mes comptes");
        assert_eq!(n.corrected, "tous mes comptes");
        assert!(!n.was_corrected);
    }

    #[test]
    fn test_fuzzy_correction() {
        let n = normalizer().normalize("je veux faire un virrement");
        assert_eq!(n.corrected, "je veux faire un virement");
        assert!(n.was_corrected);
    }

    #[test]
    fn test_tokens_with_digits_untouched() {
        let n = normalizer().normalize("je veux faire un virement de 600dt");
        assert_eq!(n.corrected, "je veux faire un virement de 600dt");
        assert!(!n.was_corrected);
    }

    #[test]
    fn test_names_are_not_months() {
        let n = normalizer().normalize("vers Juliette compte 1984573201694");
        assert_eq!(n.corrected, "vers juliette compte 1984573201694");
    }

    #[test]
    fn test_folded_text_keeps_names() {
        let n = normalizer().normalize("virrement vers Julie Dupont");
        assert_eq!(n.folded, "virrement vers julie dupont");
        assert!(n.corrected.starts_with("virement vers"));
        assert!(n.was_corrected);
    }

    #[test]
    fn test_idempotence() {
        let normalizer = normalizer();
        for input in [
            "bpnjour je veux consultr mon slde",
            "je veux faire un virrement de 600dt vers Juliette",
            "payer ma fatcure STEG 45dt",
            "Historiqe des transations du mois de mars",
            "  ",
        ] {
            let first = normalizer.normalize(input);
            let second = normalizer.normalize(&first.corrected);
            assert_eq!(second.corrected, first.corrected, "{input}");
            assert!(!second.was_corrected, "{input}");
        }
    }

    #[test]
    fn test_empty_input() {
        let n = normalizer().normalize("   ");
        assert_eq!(n.corrected, "");
        assert!(!n.was_corrected);
    }
}
