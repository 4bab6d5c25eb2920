//! Bill number extraction
//!
//! Provider-specific structures (STEG, SONEDE, Tunisie Telecom, Ooredoo,
//! Orange) are tried before generic references. Candidates are upper-cased
//! and must match one anchored shape.

use regex::Regex;

use bank_assistant_config::domain::BillNumberPatterns;

use crate::error::Result;
use crate::pattern;

pub struct BillNumberExtractor {
    patterns: Vec<Regex>,
    valid_shapes: Vec<Regex>,
    min_len: usize,
    max_len: usize,
}

impl BillNumberExtractor {
    pub fn from_config(config: &BillNumberPatterns) -> Result<Self> {
        Ok(Self {
            patterns: pattern::compile_all(&config.patterns)?,
            valid_shapes: pattern::compile_all(&config.valid_shapes)?,
            min_len: config.min_len,
            max_len: config.max_len,
        })
    }

    pub fn extract(&self, text: &str) -> Option<String> {
        self.patterns.iter().find_map(|re| {
            re.captures_iter(text)
                .filter_map(|caps| caps.name("value"))
                .map(|m| m.as_str().to_uppercase())
                .find(|candidate| self.is_valid(candidate))
        })
    }

    pub fn is_valid(&self, candidate: &str) -> bool {
        let len = candidate.chars().count();
        len >= self.min_len
            && len <= self.max_len
            && self.valid_shapes.iter().any(|re| re.is_match(candidate))
    }
}
