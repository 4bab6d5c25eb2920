//! Parameter extraction patterns
//!
//! Raw pattern strings and lookup tables for the slot extractors. Every
//! extraction pattern exposes the extracted text as the named group
//! `value`; the extractors compile them case-insensitively.

use bank_assistant_core::Frequency;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extraction configuration loaded from extraction.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub amount: AmountPatterns,
    pub account: AccountPatterns,
    pub recipient_name: NamePatterns,
    pub merchant: MerchantPatterns,
    pub bill_number: BillNumberPatterns,
    pub frequency: Vec<FrequencyPattern>,
    pub exact_date: Vec<String>,
    pub services: Vec<ServiceEntry>,
    pub history: HistoryPatterns,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountPatterns {
    pub account_like: String,
    pub currency_patterns: Vec<String>,
    pub bare_number: String,
    #[serde(default = "default_bare_digits")]
    pub bare_max_integer_digits: usize,
    pub bare_guard: String,
    #[serde(default = "default_guard_window")]
    pub guard_window: usize,
    #[serde(default = "default_max_amount")]
    pub max: f64,
}

fn default_bare_digits() -> usize {
    6
}

fn default_guard_window() -> usize {
    12
}

fn default_max_amount() -> f64 {
    1_000_000.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPatterns {
    pub patterns: Vec<String>,
    #[serde(default = "default_account_lengths")]
    pub valid_lengths: Vec<usize>,
}

fn default_account_lengths() -> Vec<usize> {
    vec![13, 20]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamePatterns {
    pub patterns: Vec<String>,
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub rejected: Vec<String>,
    #[serde(default = "default_name_min")]
    pub min_len: usize,
    #[serde(default = "default_name_max")]
    pub max_len: usize,
    /// Phrases stripped from the start of a reply that is only a name
    #[serde(default)]
    pub lead_ins: Vec<String>,
    /// Words that make a reply not a name ("oui", "d'accord")
    #[serde(default)]
    pub fillers: Vec<String>,
    #[serde(default = "default_bare_words")]
    pub max_bare_words: usize,
}

fn default_bare_words() -> usize {
    4
}

fn default_name_min() -> usize {
    2
}

fn default_name_max() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantPatterns {
    pub providers: Vec<ProviderEntry>,
    pub patterns: Vec<String>,
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub known_services: Vec<String>,
}

/// Known Tunisian provider and the phrases that name it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub keys: Vec<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillNumberPatterns {
    pub patterns: Vec<String>,
    pub valid_shapes: Vec<String>,
    #[serde(default = "default_bill_min")]
    pub min_len: usize,
    #[serde(default = "default_bill_max")]
    pub max_len: usize,
}

fn default_bill_min() -> usize {
    6
}

fn default_bill_max() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyPattern {
    pub pattern: String,
    pub value: Frequency,
}

/// Recurring payment service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPatterns {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "default_max_limit")]
    pub max_limit: i64,
    pub count_patterns: Vec<String>,
    #[serde(default)]
    pub single_patterns: Vec<String>,
    /// Uses the named groups `day`, `month` and `year`
    pub date_pattern: String,
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    pub months: BTreeMap<String, u32>,
    pub transaction_types: Vec<TypePattern>,
}

fn default_limit() -> i64 {
    10
}

fn default_max_limit() -> i64 {
    100
}

fn default_min_year() -> i32 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypePattern {
    pub pattern: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_pattern_deserialization() {
        let yaml = r#"
- { pattern: '\bmensuel\b', value: monthly }
- { pattern: '\bsemestriel\b', value: semestrially }
"#;
        let patterns: Vec<FrequencyPattern> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(patterns[0].value, Frequency::Monthly);
        assert_eq!(patterns[1].value, Frequency::Semestrially);
    }

    #[test]
    fn test_amount_defaults() {
        let yaml = r#"
account_like: '\d{13,20}'
currency_patterns: ['(?P<value>\d+)\s*dt']
bare_number: '\d+'
bare_guard: 'compte'
"#;
        let amount: AmountPatterns = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(amount.max, 1_000_000.0);
        assert_eq!(amount.guard_window, 12);
        assert_eq!(amount.bare_max_integer_digits, 6);
    }
}
