//! Spelling correction vocabulary

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Vocabulary configuration loaded from vocabulary.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// Exact misspelling table
    #[serde(default)]
    pub corrections: BTreeMap<String, Correction>,
    /// Fuzzy-correction targets by category
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    /// Fixed points that are never correction targets
    #[serde(default)]
    pub protected: Vec<String>,
    /// Topic cues selecting the categories searched first
    #[serde(default)]
    pub topics: Vec<TopicRule>,
}

/// A correction is a single word or an ordered list of alternatives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Correction {
    Single(String),
    Alternatives(Vec<String>),
}

impl Correction {
    /// The correction that is applied
    pub fn preferred(&self) -> Option<&str> {
        match self {
            Correction::Single(s) => Some(s.as_str()),
            Correction::Alternatives(v) => v.first().map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRule {
    pub pattern: String,
    pub categories: Vec<String>,
}

impl VocabularyConfig {
    /// Words that normalization leaves untouched
    pub fn fixed_points(&self) -> HashSet<&str> {
        self.categories
            .values()
            .flatten()
            .chain(self.protected.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn category(&self, name: &str) -> &[String] {
        self.categories
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
