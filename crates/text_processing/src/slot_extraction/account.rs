//! Account number extraction

use regex::Regex;

use bank_assistant_config::domain::AccountPatterns;

use crate::error::Result;
use crate::pattern;

pub struct AccountExtractor {
    patterns: Vec<Regex>,
    valid_lengths: Vec<usize>,
}

impl AccountExtractor {
    pub fn from_config(config: &AccountPatterns) -> Result<Self> {
        Ok(Self {
            patterns: pattern::compile_all(&config.patterns)?,
            valid_lengths: config.valid_lengths.clone(),
        })
    }

    /// First valid account number, keyworded forms before bare digit runs
    pub fn extract(&self, text: &str) -> Option<String> {
        self.patterns.iter().find_map(|re| {
            re.captures_iter(text)
                .filter_map(|caps| caps.name("value").map(|m| m.as_str()))
                .find(|candidate| self.is_valid(candidate))
                .map(str::to_string)
        })
    }

    /// All digits with an accepted length (13 or 20)
    pub fn is_valid(&self, candidate: &str) -> bool {
        is_valid_account_number(candidate, &self.valid_lengths)
    }
}

pub fn is_valid_account_number(candidate: &str, valid_lengths: &[usize]) -> bool {
    !candidate.is_empty()
        && candidate.chars().all(|c| c.is_ascii_digit())
        && valid_lengths.contains(&candidate.len())
}
