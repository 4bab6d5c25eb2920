//! Response and validation orchestration
//!
//! Decides whether a request is complete and renders the French text of
//! the envelope: a confirmation when every required slot is present, a
//! missing-information prompt otherwise. All texts come from
//! `responses.yaml`.

use std::collections::BTreeMap;

use bank_assistant_config::domain::ResponsesConfig;
use bank_assistant_config::DomainConfig;
use bank_assistant_core::{
    DecisionSource, Frequency, Intent, IntentDecision, Parameters, Slot, SlotValue, UserContext,
};
use bank_assistant_text_processing::format_amount;

/// Soft warning for a history request on a multi-account customer
pub const WARN_DEFAULT_ACCOUNT: &str =
    "Aucun compte précisé : le compte principal sera utilisé";

/// How the parameters of a decision were obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnKind {
    /// Fresh request classified by the rules
    FirstTurn,
    /// Slots added to a pending request
    Continuation { added: Vec<Slot> },
    /// Envelope returned by the LLM fallback
    Fallback,
}

impl TurnKind {
    fn source(&self) -> DecisionSource {
        match self {
            TurnKind::FirstTurn => DecisionSource::Rules,
            TurnKind::Continuation { .. } => DecisionSource::Continuation,
            TurnKind::Fallback => DecisionSource::Fallback,
        }
    }
}

pub struct ResponseOrchestrator {
    responses: ResponsesConfig,
    required: BTreeMap<Intent, Vec<Slot>>,
}

impl ResponseOrchestrator {
    pub fn from_domain(domain: &DomainConfig) -> Self {
        let required = domain
            .patterns
            .intents
            .iter()
            .map(|(intent, patterns)| (*intent, patterns.required_slots.clone()))
            .collect();
        Self {
            responses: domain.responses.clone(),
            required,
        }
    }

    pub fn responses(&self) -> &ResponsesConfig {
        &self.responses
    }

    /// Required slots still absent, in configured order.
    ///
    /// `bill_waived` is true when the payment merchant is a known provider.
    pub fn missing_slots(&self, intent: Intent, params: &Parameters, bill_waived: bool) -> Vec<Slot> {
        let mut missing: Vec<Slot> = self
            .required
            .get(&intent)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(|slot| !is_satisfied(*slot, params))
            .collect();

        match intent {
            Intent::Payment if bill_waived => missing.retain(|s| *s != Slot::BillNumber),
            Intent::RecurringPayment => {
                let to_person = params.contains(Slot::RecipientName)
                    && !params.flag(Slot::IsServicePayment)
                    && !params.contains(Slot::ServiceName);
                if to_person
                    && !params.contains(Slot::RecipientAccount)
                    && !missing.contains(&Slot::RecipientAccount)
                {
                    missing.push(Slot::RecipientAccount);
                }
            }
            _ => {}
        }
        missing
    }

    /// Warnings that never block a request
    pub fn soft_warnings(&self, intent: Intent, params: &Parameters, user: &UserContext) -> Vec<String> {
        if intent == Intent::TransactionHistory
            && user.accounts.len() > 1
            && !params.contains(Slot::AccountNumber)
        {
            return vec![WARN_DEFAULT_ACCOUNT.to_string()];
        }
        Vec::new()
    }

    /// Build the envelope for `intent` once completeness is known
    pub fn decide(
        &self,
        intent: Intent,
        parameters: Parameters,
        warnings: Vec<String>,
        missing: Vec<Slot>,
        kind: &TurnKind,
        scored_confidence: f32,
    ) -> IntentDecision {
        let confidence = self.confidence(intent, missing.is_empty(), kind, scored_confidence);

        let decision = if missing.is_empty() {
            let mut text = self.confirmation(intent, &parameters);
            if !warnings.is_empty() {
                let key = if intent == Intent::RecurringPayment {
                    "recurring_attention"
                } else {
                    "note"
                };
                text.push_str(&self.suffix(key, &warnings));
            }
            if intent.is_banking_action() {
                IntentDecision::action(intent, confidence, text, parameters)
            } else {
                IntentDecision::reply(intent, confidence, text)
            }
        } else {
            let mut text = self.missing_prompt(intent, &parameters, &missing, kind);
            if !warnings.is_empty() {
                let key = if intent == Intent::RecurringPayment {
                    "recurring_attention"
                } else {
                    "attention"
                };
                text.push_str(&self.suffix(key, &warnings));
            }
            IntentDecision::incomplete(intent, confidence, text, parameters, missing)
        };

        decision.with_warnings(warnings).with_source(kind.source())
    }

    fn confidence(&self, intent: Intent, complete: bool, kind: &TurnKind, scored: f32) -> f32 {
        let levels = &self.responses.confidence;
        match (kind, complete) {
            (TurnKind::Fallback, _) => scored,
            (_, true) if intent == Intent::RecurringPayment => levels.recurring_complete,
            (_, false) if intent == Intent::RecurringPayment => levels.recurring_incomplete,
            (TurnKind::Continuation { .. }, true) => levels.continuation_complete,
            (TurnKind::Continuation { .. }, false) => levels.continuation_incomplete,
            (TurnKind::FirstTurn, true) => scored,
            (TurnKind::FirstTurn, false) => levels.first_turn_incomplete,
        }
    }

    /// Deterministic confirmation embedding the key slots.
    ///
    /// Worded as an action in progress, never as a completed one.
    pub fn confirmation(&self, intent: Intent, params: &Parameters) -> String {
        let r = &self.responses;
        match intent {
            Intent::CheckBalance | Intent::GetAccounts => r.confirmation(intent.as_str()).to_string(),
            Intent::TransferMoney => fill(
                r.confirmation("transfer_money"),
                &[
                    ("amount", amount_text(params)),
                    ("recipient_name", text_of(params, Slot::RecipientName)),
                    ("recipient_account", text_of(params, Slot::RecipientAccount)),
                ],
            ),
            Intent::Payment => {
                let bill = params
                    .text(Slot::BillNumber)
                    .map(|b| fill(r.confirmation("payment_bill"), &[("bill_number", b.to_string())]))
                    .unwrap_or_default();
                fill(
                    r.confirmation("payment"),
                    &[
                        ("amount", amount_text(params)),
                        ("merchant", text_of(params, Slot::Merchant)),
                        ("bill", bill),
                    ],
                )
            }
            Intent::RecurringPayment => self.recurring_summary(params),
            Intent::TransactionHistory => self.history_confirmation(params),
            _ => r.message("general_inquiry").to_string(),
        }
    }

    fn recurring_summary(&self, params: &Parameters) -> String {
        let r = &self.responses;
        let mut lines = vec![r.confirmation("recurring_header").to_string()];

        if params.amount().is_some() {
            lines.push(fill(r.confirmation("recurring_amount"), &[("amount", amount_text(params))]));
        }
        if let Some(service) = params.text(Slot::ServiceName) {
            lines.push(fill(r.confirmation("recurring_service"), &[("service", service.to_string())]));
        } else if let Some(name) = params.text(Slot::RecipientName).or(params.text(Slot::Merchant)) {
            let recipient = match params.text(Slot::RecipientAccount) {
                Some(account) => format!("{name} (compte {account})"),
                None => name.to_string(),
            };
            lines.push(fill(r.confirmation("recurring_recipient"), &[("recipient", recipient)]));
        }
        let frequency = params.frequency();
        if let Some(f) = frequency {
            lines.push(fill(
                r.confirmation("recurring_frequency"),
                &[("frequency", f.french_label().to_string())],
            ));
        }
        if let Some(day) = params.integer(Slot::ExactDate) {
            let key = if frequency == Some(Frequency::Monthly) {
                "recurring_monthly_date"
            } else {
                "recurring_date"
            };
            lines.push(fill(r.confirmation(key), &[("day", day.to_string())]));
        }
        lines.push(String::new());
        lines.push(r.confirmation("recurring_footer").to_string());
        lines.join("\n")
    }

    fn history_confirmation(&self, params: &Parameters) -> String {
        let r = &self.responses;
        if params.flag(Slot::UserRequestedCount) {
            let count = params.integer(Slot::Limit).unwrap_or(1);
            if count == 1 {
                return r.confirmation("history_single").to_string();
            }
            return fill(r.confirmation("history_count"), &[("count", count.to_string())]);
        }
        if params.flag(Slot::SpecificDate) {
            if let Some(start) = params.timestamp(Slot::StartDate) {
                return fill(
                    r.confirmation("history_date"),
                    &[("date", start.format("%d/%m/%Y").to_string())],
                );
            }
        }
        if let Some(period) = params.text(Slot::PeriodName) {
            return fill(r.confirmation("history_period"), &[("period", period.to_string())]);
        }
        r.confirmation("history_default").to_string()
    }

    /// Missing slots named through the phrase table, joined "a, b et c"
    pub fn format_missing(&self, intent: Intent, missing: &[Slot]) -> String {
        let phrases: Vec<String> = missing
            .iter()
            .map(|slot| self.responses.slot_phrase(intent, *slot))
            .collect();
        join_french(&phrases)
    }

    /// Acknowledgment labels ("montant: 600.00 DT") for the given slots
    fn acknowledged(&self, params: &Parameters, slots: &[Slot]) -> Vec<String> {
        slots
            .iter()
            .filter_map(|slot| {
                let label = self.responses.slot_label(*slot)?;
                let value = display_value(*slot, params)?;
                Some(fill(label, &[("value", value)]))
            })
            .collect()
    }

    pub fn missing_prompt(
        &self,
        intent: Intent,
        params: &Parameters,
        missing: &[Slot],
        kind: &TurnKind,
    ) -> String {
        let r = &self.responses;
        let missing_text = self.format_missing(intent, missing);

        if let TurnKind::Continuation { added } = kind {
            let acks = self.acknowledged(params, added);
            if !acks.is_empty() {
                return fill(
                    r.prompt("continuation_added"),
                    &[("added", acks.join(", ")), ("missing", missing_text)],
                );
            }
            let key = if intent == Intent::Payment {
                "payment_continuation"
            } else {
                "continuation"
            };
            return fill(r.prompt(key), &[("missing", missing_text)]);
        }

        match intent {
            Intent::TransferMoney => {
                let provided: Vec<Slot> = params.slots().collect();
                let acks = self.acknowledged(params, &provided);
                if acks.is_empty() {
                    fill(r.prompt("transfer"), &[("missing", missing_text)])
                } else {
                    fill(
                        r.prompt("transfer_with_provided"),
                        &[("provided", acks.join(", ")), ("missing", missing_text)],
                    )
                }
            }
            Intent::Payment => fill(r.prompt("payment"), &[("missing", missing_text)]),
            Intent::RecurringPayment => fill(r.prompt("recurring"), &[("missing", missing_text)]),
            _ => fill(r.prompt("generic"), &[("missing", missing_text)]),
        }
    }

    fn suffix(&self, key: &str, warnings: &[String]) -> String {
        fill(self.responses.suffix(key), &[("warnings", warnings.join(", "))])
    }
}

fn is_satisfied(slot: Slot, params: &Parameters) -> bool {
    match slot {
        Slot::RecipientOrService => {
            params.contains(Slot::RecipientName)
                || params.contains(Slot::ServiceName)
                || params.contains(Slot::Merchant)
        }
        other => params.contains(other),
    }
}

fn fill(template: &str, values: &[(&str, String)]) -> String {
    values.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{key}}}"), value)
    })
}

fn amount_text(params: &Parameters) -> String {
    params.amount().map(format_amount).unwrap_or_default()
}

fn text_of(params: &Parameters, slot: Slot) -> String {
    params.text(slot).unwrap_or_default().to_string()
}

fn display_value(slot: Slot, params: &Parameters) -> Option<String> {
    if slot == Slot::Amount {
        return params.amount().map(format_amount);
    }
    match params.get(slot)? {
        SlotValue::Text(s) => Some(s.clone()),
        SlotValue::Integer(n) => Some(n.to_string()),
        SlotValue::Number(n) => Some(n.to_string()),
        SlotValue::Frequency(f) => Some(f.french_label().to_string()),
        SlotValue::Timestamp(ts) => Some(ts.format("%d/%m/%Y").to_string()),
        SlotValue::Flag(_) => None,
    }
}

/// "a", "a et b", "a, b et c"
pub fn join_french(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} et {}", init.join(", "), last),
    }
}
