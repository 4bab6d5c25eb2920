//! Recipient name extraction
//!
//! A [`NameExtractor`] answers with a bare name or the sentinel `NONE`,
//! the contract a generative lookup would follow. The answer is always
//! sanitized before it becomes a slot.

use regex::Regex;
use std::collections::HashSet;

use bank_assistant_config::domain::NamePatterns;

use crate::error::Result;
use crate::pattern;

use super::account::is_valid_account_number;
use super::title_case;

/// Sentinel answer meaning "no name in this text"
pub const NO_NAME: &str = "NONE";

/// Source of raw recipient names
pub trait NameExtractor: Send + Sync {
    /// Bare name found in `text`, or [`NO_NAME`]
    fn lookup(&self, text: &str) -> String;
}

/// Prepositional heuristic over normalized text
pub struct HeuristicNameExtractor {
    patterns: Vec<Regex>,
    stop_words: HashSet<String>,
}

impl HeuristicNameExtractor {
    pub fn from_config(config: &NamePatterns) -> Result<Self> {
        Ok(Self {
            patterns: pattern::compile_all(&config.patterns)?,
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
        })
    }

    fn truncate(&self, fragment: &str) -> String {
        fragment
            .split_whitespace()
            .take_while(|w| !self.stop_words.contains(&w.to_lowercase()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl NameExtractor for HeuristicNameExtractor {
    fn lookup(&self, text: &str) -> String {
        for re in &self.patterns {
            for caps in re.captures_iter(text) {
                if let Some(m) = caps.name("value") {
                    let name = self.truncate(m.as_str());
                    if !name.is_empty() {
                        return name;
                    }
                }
            }
        }
        NO_NAME.to_string()
    }
}

/// A reply that is nothing but a name, as in "Juliette Martin" or
/// "c'est Juliette", given when the assistant asked for the recipient
pub struct BareNameMatcher {
    lead_ins: Vec<Regex>,
    stop_words: HashSet<String>,
    fillers: HashSet<String>,
    max_words: usize,
}

impl BareNameMatcher {
    pub fn from_config(config: &NamePatterns) -> Result<Self> {
        Ok(Self {
            lead_ins: pattern::compile_all(&config.lead_ins)?,
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            fillers: config.fillers.iter().map(|w| w.to_lowercase()).collect(),
            max_words: config.max_bare_words,
        })
    }

    /// Raw name candidate in folded `text`, or [`NO_NAME`]
    ///
    /// Tokens carrying digits (an account number given with the name) are
    /// ignored; every remaining word must look like a name word.
    pub fn candidate(&self, text: &str) -> String {
        let mut rest = text.trim();
        if let Some(m) = self.lead_ins.iter().find_map(|re| re.find(rest)) {
            rest = &rest[m.end()..];
        }

        let words: Vec<&str> = rest
            .split_whitespace()
            .filter(|w| !w.chars().any(|c| c.is_ascii_digit()))
            .map(|w| w.trim_matches(|c: char| !c.is_alphabetic()))
            .filter(|w| !w.is_empty())
            .collect();

        if words.is_empty() || words.len() > self.max_words {
            return NO_NAME.to_string();
        }
        let all_name_words = words.iter().all(|w| {
            let lower = w.to_lowercase();
            w.chars().all(|c| c.is_alphabetic() || c == '-' || c == '\'')
                && !self.stop_words.contains(&lower)
                && !self.fillers.contains(&lower)
        });
        if !all_name_words {
            return NO_NAME.to_string();
        }
        words.join(" ")
    }
}

/// Cleans raw answers into accepted names
pub struct NameSanitizer {
    rejected: HashSet<String>,
    account_lengths: Vec<usize>,
    min_len: usize,
    max_len: usize,
}

impl NameSanitizer {
    pub fn new(config: &NamePatterns, account_lengths: &[usize]) -> Self {
        Self {
            rejected: config.rejected.iter().map(|w| w.to_lowercase()).collect(),
            account_lengths: account_lengths.to_vec(),
            min_len: config.min_len,
            max_len: config.max_len,
        }
    }

    /// First line, name characters only, title-cased
    pub fn sanitize(&self, raw: &str) -> Option<String> {
        let line = raw.lines().next().unwrap_or_default().trim();
        if line.is_empty() || line.eq_ignore_ascii_case(NO_NAME) {
            return None;
        }

        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        if is_valid_account_number(&compact, &self.account_lengths) {
            return None;
        }

        let cleaned: String = line
            .chars()
            .filter(|c| c.is_alphabetic() || c.is_whitespace() || *c == '-' || *c == '\'')
            .collect();
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        let cleaned = cleaned.trim_matches(|c| c == '-' || c == '\'');

        if cleaned
            .split_whitespace()
            .any(|w| self.rejected.contains(&w.to_lowercase()))
        {
            return None;
        }

        let len = cleaned.chars().count();
        if len < self.min_len || len > self.max_len {
            return None;
        }

        Some(title_case(cleaned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_assistant_config::DomainConfig;

    fn parts() -> (HeuristicNameExtractor, NameSanitizer) {
        let domain = DomainConfig::embedded().unwrap();
        let names = &domain.extraction.recipient_name;
        (
            HeuristicNameExtractor::from_config(names).unwrap(),
            NameSanitizer::new(names, &domain.extraction.account.valid_lengths),
        )
    }

    #[test]
    fn test_name_before_account_keyword() {
        let (ex, _) = parts();
        assert_eq!(ex.lookup("vers juliette compte 1984573201694"), "juliette");
    }

    #[test]
    fn test_name_stops_at_stop_words() {
        let (ex, _) = parts();
        assert_eq!(
            ex.lookup("virement de 200dt pour ahmed ben ali avec le rib 12345"),
            "ahmed ben ali"
        );
        assert_eq!(ex.lookup("beneficiaire: sami trabelsi"), "sami trabelsi");
        assert_eq!(ex.lookup("au nom de leila"), "leila");
    }

    #[test]
    fn test_no_name() {
        let (ex, _) = parts();
        assert_eq!(ex.lookup("je veux faire un virement de 600dt"), NO_NAME);
        assert_eq!(ex.lookup("virement vers compte 1984573201694"), NO_NAME);
    }

    #[test]
    fn test_beneficiaire_est() {
        let (ex, _) = parts();
        assert_eq!(ex.lookup("le beneficiaire est juliette"), "juliette");
        assert_eq!(ex.lookup("pour juliette c'est urgent"), "juliette");
    }

    fn bare() -> BareNameMatcher {
        let domain = DomainConfig::embedded().unwrap();
        BareNameMatcher::from_config(&domain.extraction.recipient_name).unwrap()
    }

    #[test]
    fn test_bare_name_replies() {
        let m = bare();
        assert_eq!(m.candidate("juliette"), "juliette");
        assert_eq!(m.candidate("juliette martin"), "juliette martin");
        assert_eq!(m.candidate("c'est juliette"), "juliette");
        assert_eq!(m.candidate("le beneficiaire est juliette"), "juliette");
        assert_eq!(m.candidate("il s'appelle ahmed ben ali."), "ahmed ben ali");
        assert_eq!(m.candidate("juliette 1984573201694"), "juliette");
    }

    #[test]
    fn test_bare_name_rejects_sentences() {
        let m = bare();
        for reply in [
            "oui",
            "d'accord",
            "a mon frere",
            "quel est mon solde",
            "600 dt",
            "compte 1984573201694",
            "je ne sais pas encore le nom exact",
            "",
        ] {
            assert_eq!(m.candidate(reply), NO_NAME, "{reply}");
        }
    }

    #[test]
    fn test_sanitize() {
        let (_, sanitizer) = parts();
        assert_eq!(sanitizer.sanitize("juliette"), Some("Juliette".to_string()));
        assert_eq!(
            sanitizer.sanitize("ahmed ben-ali\nsecond line"),
            Some("Ahmed Ben-ali".to_string())
        );
        assert_eq!(sanitizer.sanitize("NONE"), None);
        assert_eq!(sanitizer.sanitize("1984573201694"), None);
        assert_eq!(sanitizer.sanitize("compte"), None);
        assert_eq!(sanitizer.sanitize("x"), None);
    }
}
