//! Typed parameter slots
//!
//! A turn's extracted values live in [`Parameters`], a map from a closed
//! [`Slot`] set to a typed [`SlotValue`]. Pending conversation state only
//! ever grows through [`Parameters::merge_absent`], so a slot that is
//! already present is never overwritten by a later turn.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Named parameter slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Amount,
    RecipientAccount,
    RecipientName,
    Merchant,
    BillNumber,
    Frequency,
    ExactDate,
    StartDate,
    EndDate,
    ServiceName,
    IsServicePayment,
    IsKnownService,
    AccountNumber,
    Limit,
    UserRequestedCount,
    TransactionType,
    SpecificDate,
    PeriodName,
    /// Composite requirement of recurring payments: a recipient name or a
    /// service. Reported as missing, never stored.
    RecipientOrService,
}

impl Slot {
    pub const ALL: [Slot; 19] = [
        Slot::Amount,
        Slot::RecipientAccount,
        Slot::RecipientName,
        Slot::Merchant,
        Slot::BillNumber,
        Slot::Frequency,
        Slot::ExactDate,
        Slot::StartDate,
        Slot::EndDate,
        Slot::ServiceName,
        Slot::IsServicePayment,
        Slot::IsKnownService,
        Slot::AccountNumber,
        Slot::Limit,
        Slot::UserRequestedCount,
        Slot::TransactionType,
        Slot::SpecificDate,
        Slot::PeriodName,
        Slot::RecipientOrService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Amount => "amount",
            Slot::RecipientAccount => "recipient_account",
            Slot::RecipientName => "recipient_name",
            Slot::Merchant => "merchant",
            Slot::BillNumber => "bill_number",
            Slot::Frequency => "frequency",
            Slot::ExactDate => "exact_date",
            Slot::StartDate => "start_date",
            Slot::EndDate => "end_date",
            Slot::ServiceName => "service_name",
            Slot::IsServicePayment => "is_service_payment",
            Slot::IsKnownService => "is_known_service",
            Slot::AccountNumber => "account_number",
            Slot::Limit => "limit",
            Slot::UserRequestedCount => "user_requested_count",
            Slot::TransactionType => "transaction_type",
            Slot::SpecificDate => "specific_date",
            Slot::PeriodName => "period_name",
            Slot::RecipientOrService => "recipient_or_service",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::ALL
            .iter()
            .copied()
            .find(|slot| slot.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownSlot(s.to_string()))
    }
}

/// Recurrence of a scheduled payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Semestrially,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Semestrially => "semestrially",
            Frequency::Yearly => "yearly",
        }
    }

    /// French adjective used in confirmations
    pub fn french_label(&self) -> &'static str {
        match self {
            Frequency::Daily => "quotidien",
            Frequency::Weekly => "hebdomadaire",
            Frequency::Monthly => "mensuel",
            Frequency::Quarterly => "trimestriel",
            Frequency::Semestrially => "semestriel",
            Frequency::Yearly => "annuel",
        }
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "quotidien" => Ok(Frequency::Daily),
            "weekly" | "hebdomadaire" => Ok(Frequency::Weekly),
            "monthly" | "mensuel" => Ok(Frequency::Monthly),
            "quarterly" | "trimestriel" => Ok(Frequency::Quarterly),
            "semestrially" | "semestriel" => Ok(Frequency::Semestrially),
            "yearly" | "annuel" => Ok(Frequency::Yearly),
            other => Err(Error::InvalidDecision(format!("unknown frequency '{other}'"))),
        }
    }
}

/// Typed slot value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Flag(bool),
    Integer(i64),
    Number(f64),
    Frequency(Frequency),
    Timestamp(DateTime<FixedOffset>),
    Text(String),
}

impl From<bool> for SlotValue {
    fn from(v: bool) -> Self {
        SlotValue::Flag(v)
    }
}

impl From<i64> for SlotValue {
    fn from(v: i64) -> Self {
        SlotValue::Integer(v)
    }
}

impl From<f64> for SlotValue {
    fn from(v: f64) -> Self {
        SlotValue::Number(v)
    }
}

impl From<Frequency> for SlotValue {
    fn from(v: Frequency) -> Self {
        SlotValue::Frequency(v)
    }
}

impl From<DateTime<FixedOffset>> for SlotValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        SlotValue::Timestamp(v)
    }
}

impl From<String> for SlotValue {
    fn from(v: String) -> Self {
        SlotValue::Text(v)
    }
}

impl From<&str> for SlotValue {
    fn from(v: &str) -> Self {
        SlotValue::Text(v.to_string())
    }
}

/// Parameters collected for an intent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<Slot, SlotValue>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, slot: Slot, value: impl Into<SlotValue>) -> Self {
        self.0.insert(slot, value.into());
        self
    }

    /// Set a slot, replacing any previous value
    pub fn insert(&mut self, slot: Slot, value: impl Into<SlotValue>) {
        self.0.insert(slot, value.into());
    }

    /// Set a slot only if it is not present yet; returns whether it was set
    pub fn insert_if_absent(&mut self, slot: Slot, value: impl Into<SlotValue>) -> bool {
        if self.0.contains_key(&slot) {
            return false;
        }
        self.0.insert(slot, value.into());
        true
    }

    /// Merge `other` into `self` without overwriting existing slots.
    ///
    /// Returns the slots that were added, in slot order.
    pub fn merge_absent(&mut self, other: Parameters) -> Vec<Slot> {
        let mut added = Vec::new();
        for (slot, value) in other.0 {
            if self.insert_if_absent(slot, value) {
                added.push(slot);
            }
        }
        added
    }

    pub fn remove(&mut self, slot: Slot) -> Option<SlotValue> {
        self.0.remove(&slot)
    }

    pub fn get(&self, slot: Slot) -> Option<&SlotValue> {
        self.0.get(&slot)
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.0.contains_key(&slot)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Slot, &SlotValue)> {
        self.0.iter()
    }

    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.0.keys().copied()
    }

    pub fn amount(&self) -> Option<f64> {
        match self.0.get(&Slot::Amount)? {
            SlotValue::Number(n) => Some(*n),
            SlotValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn text(&self, slot: Slot) -> Option<&str> {
        match self.0.get(&slot)? {
            SlotValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn integer(&self, slot: Slot) -> Option<i64> {
        match self.0.get(&slot)? {
            SlotValue::Integer(n) => Some(*n),
            SlotValue::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    /// Missing flags read as false
    pub fn flag(&self, slot: Slot) -> bool {
        matches!(self.0.get(&slot), Some(SlotValue::Flag(true)))
    }

    pub fn timestamp(&self, slot: Slot) -> Option<DateTime<FixedOffset>> {
        match self.0.get(&slot)? {
            SlotValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn frequency(&self) -> Option<Frequency> {
        match self.0.get(&Slot::Frequency)? {
            SlotValue::Frequency(f) => Some(*f),
            SlotValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
