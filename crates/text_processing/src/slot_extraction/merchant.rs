//! Merchant / biller extraction
//!
//! Known Tunisian providers are matched first and mapped to their display
//! name. Otherwise a prepositional fragment is taken and title-cased.

use regex::Regex;
use std::collections::HashSet;

use bank_assistant_config::domain::MerchantPatterns;

use crate::error::Result;
use crate::normalizer::fold;
use crate::pattern;

use super::title_case;

/// Extracted merchant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantMatch {
    pub name: String,
    /// Recognized provider; no bill number is needed to pay it
    pub is_known_service: bool,
}

struct Provider {
    key: Regex,
    name: String,
}

pub struct MerchantExtractor {
    /// Longest keys first
    providers: Vec<Provider>,
    patterns: Vec<Regex>,
    stop_words: HashSet<String>,
    known_services: Vec<Regex>,
}

impl MerchantExtractor {
    pub fn from_config(config: &MerchantPatterns) -> Result<Self> {
        let mut keys: Vec<(&str, &str)> = config
            .providers
            .iter()
            .flat_map(|p| p.keys.iter().map(move |k| (k.as_str(), p.name.as_str())))
            .collect();
        keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let providers = keys
            .into_iter()
            .map(|(key, name)| {
                Ok(Provider {
                    key: pattern::literal_word(key)?,
                    name: name.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let known_services = config
            .known_services
            .iter()
            .map(|k| pattern::literal_word(k))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            providers,
            patterns: pattern::compile_all(&config.patterns)?,
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            known_services,
        })
    }

    pub fn extract(&self, text: &str) -> Option<MerchantMatch> {
        self.extract_with(text, text)
    }

    /// Providers are looked up in `corrected`; a free-text merchant is read
    /// from `folded`, before spelling correction
    pub fn extract_with(&self, corrected: &str, folded: &str) -> Option<MerchantMatch> {
        if let Some(name) = self.provider(corrected) {
            return Some(MerchantMatch {
                name: name.to_string(),
                is_known_service: true,
            });
        }

        for re in &self.patterns {
            for caps in re.captures_iter(folded) {
                let Some(m) = caps.name("value") else {
                    continue;
                };
                let fragment = self.truncate(m.as_str());
                if fragment.chars().count() < 2 {
                    continue;
                }
                if let Some(name) = self.provider(&fragment) {
                    return Some(MerchantMatch {
                        name: name.to_string(),
                        is_known_service: true,
                    });
                }
                return Some(MerchantMatch {
                    name: title_case(&fragment),
                    is_known_service: false,
                });
            }
        }
        None
    }

    /// Whether a merchant name mentions a provider that needs no bill number
    pub fn is_known_service(&self, merchant: &str) -> bool {
        let folded = fold(merchant);
        self.known_services.iter().any(|re| re.is_match(&folded))
    }

    fn provider(&self, text: &str) -> Option<&str> {
        self.providers
            .iter()
            .find(|p| p.key.is_match(text))
            .map(|p| p.name.as_str())
    }

    fn truncate(&self, fragment: &str) -> String {
        fragment
            .split_whitespace()
            .take_while(|w| !self.stop_words.contains(&w.to_lowercase()))
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches(|c: char| c == '.' || c == '-' || c == '\'')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_assistant_config::DomainConfig;

    fn extractor() -> MerchantExtractor {
        let domain = DomainConfig::embedded().unwrap();
        MerchantExtractor::from_config(&domain.extraction.merchant).unwrap()
    }

    #[test]
    fn test_known_provider() {
        let m = extractor().extract("payer ma facture steg 45dt").unwrap();
        assert_eq!(m.name, "STEG (Électricité et Gaz)");
        assert!(m.is_known_service);
    }

    #[test]
    fn test_longest_key_wins() {
        let m = extractor().extract("facture tunisie telecom").unwrap();
        assert_eq!(m.name, "Tunisie Telecom");
        let m = extractor().extract("regler la facture d'eau").unwrap();
        assert_eq!(m.name, "SONEDE (Eau)");
    }

    #[test]
    fn test_provider_needs_word_boundary() {
        assert!(extractor().extract("payer au bureau").is_none());
    }

    #[test]
    fn test_prepositional_merchant() {
        let m = extractor()
            .extract("payer la facture de garage ben salah pour 120 dt")
            .unwrap();
        assert_eq!(m.name, "Garage Ben Salah");
        assert!(!m.is_known_service);

        let m = extractor().extract("payer chez pharmacie centrale").unwrap();
        assert_eq!(m.name, "Pharmacie Centrale");
    }

    #[test]
    fn test_free_text_merchant_is_read_uncorrected() {
        let m = extractor()
            .extract_with(
                "payer la facture de garage oublie pour 120 dt",
                "payer la facture de garage julie pour 120 dt",
            )
            .unwrap();
        assert_eq!(m.name, "Garage Julie");

        let m = extractor()
            .extract_with("payer ma facture steg", "payer ma facture stge")
            .unwrap();
        assert_eq!(m.name, "STEG (Électricité et Gaz)");
    }

    #[test]
    fn test_is_known_service() {
        let ex = extractor();
        assert!(ex.is_known_service("STEG (Électricité et Gaz)"));
        assert!(ex.is_known_service("Ooredoo Tunisie"));
        assert!(!ex.is_known_service("Garage Ben Salah"));
    }
}
