//! Parameter extraction
//!
//! One extractor per slot, each a cascade of configured patterns with a
//! validity predicate. [`SlotExtractor`] runs the extractors an intent
//! needs and validates the result.
//!
//! All extractors work on folded text (accents removed, lowercase).
//! Recipient names and free-text merchants are read before spelling
//! correction, everything else after it; see [`MessageText`].

mod account;
mod amount;
mod bill;
mod format;
mod history;
mod merchant;
mod name;
mod schedule;
mod validation;

pub use account::{is_valid_account_number, AccountExtractor};
pub use amount::{parse_amount, AmountExtractor};
pub use bill::BillNumberExtractor;
pub use format::format_amount;
pub use history::HistoryExtractor;
pub use merchant::{MerchantExtractor, MerchantMatch};
pub use name::{BareNameMatcher, HeuristicNameExtractor, NameExtractor, NameSanitizer, NO_NAME};
pub use schedule::ScheduleExtractor;
pub use validation::{
    SlotValidator, UNUSUAL_BILL_AMOUNT, WARN_AMOUNT_NOT_POSITIVE, WARN_INVALID_ACCOUNT,
    WARN_INVALID_DAY, WARN_INVERTED_PERIOD, WARN_UNUSUAL_BILL_AMOUNT,
};

use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;

use bank_assistant_config::domain::ExtractionConfig;
use bank_assistant_core::{Intent, Parameters, Slot};

use crate::error::{Result, TextProcessingError};
use crate::normalizer::Normalized;

/// One message as the extractors see it
#[derive(Debug, Clone, Copy)]
pub struct MessageText<'a> {
    /// Folded and spelling-corrected
    pub corrected: &'a str,
    /// Folded only
    pub folded: &'a str,
    /// Raw answer of a name lookup that already ran for this message
    pub resolved_name: Option<&'a str>,
}

impl<'a> MessageText<'a> {
    /// Same text for both views, for input that needs no correction
    pub fn plain(text: &'a str) -> Self {
        Self {
            corrected: text,
            folded: text,
            resolved_name: None,
        }
    }

    pub fn with_resolved_name(mut self, name: Option<&'a str>) -> Self {
        self.resolved_name = name;
        self
    }
}

impl<'a> From<&'a str> for MessageText<'a> {
    fn from(text: &'a str) -> Self {
        Self::plain(text)
    }
}

impl<'a> From<&'a Normalized> for MessageText<'a> {
    fn from(normalized: &'a Normalized) -> Self {
        Self {
            corrected: &normalized.corrected,
            folded: &normalized.folded,
            resolved_name: None,
        }
    }
}

/// Parameters found in one message
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub parameters: Parameters,
    pub warnings: Vec<String>,
}

/// Runs the slot extractors relevant to an intent
pub struct SlotExtractor {
    amount: AmountExtractor,
    account: AccountExtractor,
    names: Arc<dyn NameExtractor>,
    bare_names: BareNameMatcher,
    sanitizer: NameSanitizer,
    merchant: MerchantExtractor,
    bill: BillNumberExtractor,
    schedule: ScheduleExtractor,
    history: HistoryExtractor,
    validator: SlotValidator,
    offset: FixedOffset,
}

impl SlotExtractor {
    /// Build with the heuristic name extractor
    pub fn from_config(config: &ExtractionConfig, utc_offset_minutes: i32) -> Result<Self> {
        let names = Arc::new(HeuristicNameExtractor::from_config(&config.recipient_name)?);
        Self::with_name_extractor(config, utc_offset_minutes, names)
    }

    pub fn with_name_extractor(
        config: &ExtractionConfig,
        utc_offset_minutes: i32,
        names: Arc<dyn NameExtractor>,
    ) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            TextProcessingError::InvalidConfig(format!(
                "utc offset out of range: {utc_offset_minutes} minutes"
            ))
        })?;

        let history = HistoryExtractor::from_config(&config.history)?;
        let validator = SlotValidator {
            max_amount: config.amount.max,
            account_lengths: config.account.valid_lengths.clone(),
            default_limit: history.default_limit(),
            max_limit: history.max_limit(),
        };

        Ok(Self {
            amount: AmountExtractor::from_config(&config.amount)?,
            account: AccountExtractor::from_config(&config.account)?,
            names,
            bare_names: BareNameMatcher::from_config(&config.recipient_name)?,
            sanitizer: NameSanitizer::new(&config.recipient_name, &config.account.valid_lengths),
            merchant: MerchantExtractor::from_config(&config.merchant)?,
            bill: BillNumberExtractor::from_config(&config.bill_number)?,
            schedule: ScheduleExtractor::from_config(
                &config.frequency,
                &config.exact_date,
                &config.services,
            )?,
            history,
            validator,
            offset,
        })
    }

    /// The bank's local offset
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Current time in the bank's local offset
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    pub fn merchant(&self) -> &MerchantExtractor {
        &self.merchant
    }

    pub fn validator(&self) -> &SlotValidator {
        &self.validator
    }

    /// Extract and validate the slots of `intent`
    pub fn extract<'a>(&self, intent: Intent, text: impl Into<MessageText<'a>>) -> Extraction {
        self.extract_at(intent, text, self.now())
    }

    /// Same as [`extract`](Self::extract) with an explicit clock
    pub fn extract_at<'a>(
        &self,
        intent: Intent,
        message: impl Into<MessageText<'a>>,
        now: DateTime<FixedOffset>,
    ) -> Extraction {
        let message = message.into();
        let text = message.corrected;
        let mut params = Parameters::new();

        match intent {
            Intent::TransferMoney => {
                self.fill_amount(text, &mut params);
                self.fill_account(text, &mut params);
                self.fill_name(message, &mut params);
            }
            Intent::Payment => {
                self.fill_amount(text, &mut params);
                if let Some(m) = self.merchant.extract_with(text, message.folded) {
                    params.insert(Slot::Merchant, m.name);
                    if m.is_known_service {
                        params.insert(Slot::IsKnownService, true);
                    }
                }
                if let Some(bill) = self.bill.extract(text) {
                    params.insert(Slot::BillNumber, bill);
                }
            }
            Intent::RecurringPayment => {
                self.fill_amount(text, &mut params);
                if let Some(frequency) = self.schedule.frequency(text) {
                    params.insert(Slot::Frequency, frequency);
                }
                if let Some(day) = self.schedule.exact_date(text) {
                    params.insert(Slot::ExactDate, day);
                }
                if let Some(service) = self.schedule.service(text) {
                    params.insert(Slot::ServiceName, service);
                    params.insert(Slot::IsServicePayment, true);
                } else {
                    self.fill_name(message, &mut params);
                }
                self.fill_account(text, &mut params);
            }
            Intent::TransactionHistory => {
                self.history.extract(text, now, &mut params);
                if let Some(account) = self.account.extract(text) {
                    params.insert(Slot::AccountNumber, account);
                }
            }
            Intent::CheckBalance => {
                if let Some(account) = self.account.extract(text) {
                    params.insert(Slot::AccountNumber, account);
                }
            }
            _ => {}
        }

        let warnings = self.validator.validate(intent, &mut params);
        if !params.is_empty() {
            tracing::debug!(
                intent = %intent,
                slots = ?params.slots().collect::<Vec<_>>(),
                warnings = warnings.len(),
                "Extracted parameters"
            );
        }
        Extraction {
            parameters: params,
            warnings,
        }
    }

    fn fill_amount(&self, text: &str, params: &mut Parameters) {
        if let Some(amount) = self.amount.extract(text) {
            params.insert(Slot::Amount, amount);
        }
    }

    fn fill_account(&self, text: &str, params: &mut Parameters) {
        if let Some(account) = self.account.extract(text) {
            params.insert(Slot::RecipientAccount, account);
        }
    }

    /// A resolved lookup answer wins, `NONE` included; the configured
    /// extractor only runs when no lookup answered
    fn fill_name(&self, message: MessageText<'_>, params: &mut Parameters) {
        let raw = match message.resolved_name {
            Some(answer) => answer.to_string(),
            None => self.names.lookup(message.folded),
        };
        if let Some(name) = self.sanitizer.sanitize(&raw) {
            params.insert(Slot::RecipientName, name);
        }
    }

    /// Read a whole reply as the recipient name.
    ///
    /// Only meaningful right after the assistant asked for the name; `text`
    /// is folded, uncorrected text.
    pub fn bare_name(&self, text: &str) -> Option<String> {
        self.sanitizer.sanitize(&self.bare_names.candidate(text))
    }

    /// Whether a payment to `params` needs no bill number
    pub fn bill_waived(&self, params: &Parameters) -> bool {
        params.flag(Slot::IsKnownService)
            || params
                .text(Slot::Merchant)
                .is_some_and(|m| self.merchant.is_known_service(m))
    }
}

/// Upper-case the first letter of every word, lower-case the rest
pub(crate) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
