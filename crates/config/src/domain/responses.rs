//! Response texts, slot phrases and confidence levels

use bank_assistant_core::{Intent, Slot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Responses configuration loaded from responses.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesConfig {
    pub confidence: ResponseConfidence,
    pub slot_phrases: BTreeMap<Slot, String>,
    #[serde(default)]
    pub slot_phrase_overrides: BTreeMap<Intent, BTreeMap<Slot, String>>,
    #[serde(default)]
    pub slot_labels: BTreeMap<Slot, String>,
    pub confirmations: BTreeMap<String, String>,
    pub prompts: BTreeMap<String, String>,
    pub suffixes: BTreeMap<String, String>,
    pub messages: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfidence {
    pub first_turn_incomplete: f32,
    pub continuation_incomplete: f32,
    pub continuation_complete: f32,
    pub recurring_complete: f32,
    pub recurring_incomplete: f32,
    pub general_inquiry: f32,
}

impl ResponsesConfig {
    /// French phrase asking for `slot`, honoring per-intent overrides
    pub fn slot_phrase(&self, intent: Intent, slot: Slot) -> String {
        self.slot_phrase_overrides
            .get(&intent)
            .and_then(|o| o.get(&slot))
            .or_else(|| self.slot_phrases.get(&slot))
            .cloned()
            .unwrap_or_else(|| slot.as_str().replace('_', " "))
    }

    pub fn slot_label(&self, slot: Slot) -> Option<&str> {
        self.slot_labels.get(&slot).map(String::as_str)
    }

    pub fn confirmation(&self, key: &str) -> &str {
        lookup(&self.confirmations, key)
    }

    pub fn prompt(&self, key: &str) -> &str {
        lookup(&self.prompts, key)
    }

    pub fn suffix(&self, key: &str) -> &str {
        lookup(&self.suffixes, key)
    }

    pub fn message(&self, key: &str) -> &str {
        lookup(&self.messages, key)
    }

    /// Keys the orchestrator relies on; checked when the tables are loaded
    pub const REQUIRED_KEYS: &'static [(&'static str, &'static [&'static str])] = &[
        (
            "confirmations",
            &[
                "check_balance",
                "get_accounts",
                "transfer_money",
                "payment",
                "payment_bill",
                "history_single",
                "history_count",
                "history_date",
                "history_period",
                "history_default",
                "recurring_header",
                "recurring_amount",
                "recurring_service",
                "recurring_recipient",
                "recurring_frequency",
                "recurring_monthly_date",
                "recurring_date",
                "recurring_footer",
            ],
        ),
        (
            "prompts",
            &[
                "transfer_with_provided",
                "transfer",
                "payment",
                "payment_continuation",
                "recurring",
                "continuation_added",
                "continuation",
                "generic",
            ],
        ),
        ("suffixes", &["attention", "note", "recurring_attention"]),
        ("messages", &["empty_input", "cancelled", "general_inquiry"]),
    ];

    /// Names of required keys absent from the tables, as `table.key`
    pub fn missing_keys(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for (table, keys) in Self::REQUIRED_KEYS {
            let map = match *table {
                "confirmations" => &self.confirmations,
                "prompts" => &self.prompts,
                "suffixes" => &self.suffixes,
                _ => &self.messages,
            };
            for key in *keys {
                if !map.contains_key(*key) {
                    missing.push(format!("{table}.{key}"));
                }
            }
        }
        missing
    }
}

fn lookup<'a>(map: &'a BTreeMap<String, String>, key: &str) -> &'a str {
    map.get(key).map(String::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResponsesConfig {
        let yaml = r#"
confidence:
  first_turn_incomplete: 0.85
  continuation_incomplete: 0.90
  continuation_complete: 0.95
  recurring_complete: 0.95
  recurring_incomplete: 0.90
  general_inquiry: 0.70
slot_phrases:
  amount: "le montant exact"
  merchant: "le nom complet ou raison sociale"
slot_phrase_overrides:
  payment:
    merchant: "le nom complet du fournisseur"
confirmations:
  check_balance: "Je consulte le solde de votre compte principal..."
prompts: {}
suffixes: {}
messages: {}
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_slot_phrase_overrides() {
        let responses = sample();
        assert_eq!(
            responses.slot_phrase(Intent::Payment, Slot::Merchant),
            "le nom complet du fournisseur"
        );
        assert_eq!(
            responses.slot_phrase(Intent::RecurringPayment, Slot::Merchant),
            "le nom complet ou raison sociale"
        );
        assert_eq!(
            responses.slot_phrase(Intent::Payment, Slot::BillNumber),
            "bill number"
        );
    }

    #[test]
    fn test_missing_keys_reported() {
        let responses = sample();
        let missing = responses.missing_keys();
        assert!(missing.contains(&"prompts.transfer".to_string()));
        assert!(!missing.contains(&"confirmations.check_balance".to_string()));
    }
}
