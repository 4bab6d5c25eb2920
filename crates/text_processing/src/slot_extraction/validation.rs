//! Slot validation
//!
//! Invalid values never block a turn: they are dropped or clamped and a
//! French warning is reported alongside the decision.

use bank_assistant_core::{Intent, Parameters, Slot};

use super::account::is_valid_account_number;
use super::format::format_amount;

/// Above this, a bill payment amount is flagged as unusual
pub const UNUSUAL_BILL_AMOUNT: f64 = 50_000.0;

pub const WARN_AMOUNT_NOT_POSITIVE: &str = "Le montant doit être positif";
pub const WARN_UNUSUAL_BILL_AMOUNT: &str = "Montant inhabituellement élevé pour une facture";
pub const WARN_INVALID_DAY: &str = "Jour invalide (doit être entre 1 et 31)";
pub const WARN_INVALID_ACCOUNT: &str = "Numéro de compte invalide (13 ou 20 chiffres attendus)";
pub const WARN_INVERTED_PERIOD: &str =
    "Période invalide : la date de début est postérieure à la date de fin";

#[derive(Debug, Clone)]
pub struct SlotValidator {
    pub max_amount: f64,
    pub account_lengths: Vec<usize>,
    pub default_limit: i64,
    pub max_limit: i64,
}

impl SlotValidator {
    /// Drop or clamp invalid slots; returns the warnings
    pub fn validate(&self, intent: Intent, params: &mut Parameters) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(amount) = params.amount() {
            if amount <= 0.0 {
                params.remove(Slot::Amount);
                warnings.push(WARN_AMOUNT_NOT_POSITIVE.to_string());
            } else if amount > self.max_amount {
                params.remove(Slot::Amount);
                warnings.push(format!(
                    "Le montant dépasse le plafond autorisé ({})",
                    format_amount(self.max_amount)
                ));
            } else if intent == Intent::Payment && amount > UNUSUAL_BILL_AMOUNT {
                warnings.push(WARN_UNUSUAL_BILL_AMOUNT.to_string());
            }
        } else if params.contains(Slot::Amount) {
            params.remove(Slot::Amount);
        }

        if let Some(account) = params.get(Slot::RecipientAccount) {
            let valid = params
                .text(Slot::RecipientAccount)
                .is_some_and(|a| is_valid_account_number(a, &self.account_lengths));
            if !valid {
                tracing::debug!(value = ?account, "Dropping invalid recipient account");
                params.remove(Slot::RecipientAccount);
                warnings.push(WARN_INVALID_ACCOUNT.to_string());
            }
        }

        if params.contains(Slot::ExactDate) {
            let day = params.integer(Slot::ExactDate);
            if !day.is_some_and(|d| (1..=31).contains(&d)) {
                params.remove(Slot::ExactDate);
                warnings.push(WARN_INVALID_DAY.to_string());
            }
        }

        if intent == Intent::TransactionHistory {
            self.validate_history(params, &mut warnings);
        }

        warnings
    }

    fn validate_history(&self, params: &mut Parameters, warnings: &mut Vec<String>) {
        match params.integer(Slot::Limit) {
            Some(limit) if limit < 1 => {
                params.insert(Slot::Limit, self.default_limit);
                warnings.push(format!(
                    "Nombre de transactions invalide, {} transactions affichées",
                    self.default_limit
                ));
            }
            Some(limit) if limit > self.max_limit => {
                params.insert(Slot::Limit, self.max_limit);
                warnings.push(format!(
                    "Nombre de transactions limité à {}",
                    self.max_limit
                ));
            }
            Some(_) => {}
            None => params.insert(Slot::Limit, self.default_limit),
        }

        if let (Some(start), Some(end)) = (
            params.timestamp(Slot::StartDate),
            params.timestamp(Slot::EndDate),
        ) {
            if start > end {
                params.remove(Slot::StartDate);
                params.remove(Slot::EndDate);
                params.remove(Slot::SpecificDate);
                params.remove(Slot::PeriodName);
                warnings.push(WARN_INVERTED_PERIOD.to_string());
            }
        }
    }
}
