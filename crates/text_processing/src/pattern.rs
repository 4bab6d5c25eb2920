//! Pattern compilation
//!
//! Every configured pattern runs case-insensitively against normalized
//! text. Compilation happens once, when an engine component is built.

use regex::{Regex, RegexBuilder};

use crate::error::{Result, TextProcessingError};

/// Compile a single configured pattern
pub fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| TextProcessingError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// Compile a list of patterns, keeping their order
pub fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(p.as_ref())).collect()
}

/// Word-boundary pattern for a literal phrase
pub fn literal_word(phrase: &str) -> Result<Regex> {
    compile(&format!(r"\b{}\b", regex::escape(phrase.trim())))
}

/// Whether any pattern matches
pub fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|p| p.is_match(text))
}

/// Whether every pattern matches; false for an empty list
pub fn all_match(patterns: &[Regex], text: &str) -> bool {
    !patterns.is_empty() && patterns.iter().all(|p| p.is_match(text))
}
