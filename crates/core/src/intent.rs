//! The closed set of intents the assistant understands

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Banking intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CheckBalance,
    GetAccounts,
    TransferMoney,
    Payment,
    RecurringPayment,
    TransactionHistory,
    Greeting,
    Goodbye,
    /// Courtesy reply to a thank-you
    Acknowledgment,
    /// Only produced in envelopes (empty input, LLM small talk)
    GeneralInquiry,
    /// Only produced in envelopes (technical difficulty)
    Error,
}

impl Intent {
    pub const ALL: [Intent; 11] = [
        Intent::CheckBalance,
        Intent::GetAccounts,
        Intent::TransferMoney,
        Intent::Payment,
        Intent::RecurringPayment,
        Intent::TransactionHistory,
        Intent::Greeting,
        Intent::Goodbye,
        Intent::Acknowledgment,
        Intent::GeneralInquiry,
        Intent::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::CheckBalance => "check_balance",
            Intent::GetAccounts => "get_accounts",
            Intent::TransferMoney => "transfer_money",
            Intent::Payment => "payment",
            Intent::RecurringPayment => "recurring_payment",
            Intent::TransactionHistory => "transaction_history",
            Intent::Greeting => "greeting",
            Intent::Goodbye => "goodbye",
            Intent::Acknowledgment => "acknowledgment",
            Intent::GeneralInquiry => "general_inquiry",
            Intent::Error => "error",
        }
    }

    /// Intents answered with a canned reply, bypassing scoring and state
    pub fn is_fast_path(&self) -> bool {
        matches!(
            self,
            Intent::Greeting | Intent::Goodbye | Intent::Acknowledgment
        )
    }

    /// Intents that map to a banking action handed to execution
    pub fn is_banking_action(&self) -> bool {
        matches!(
            self,
            Intent::CheckBalance
                | Intent::GetAccounts
                | Intent::TransferMoney
                | Intent::Payment
                | Intent::RecurringPayment
                | Intent::TransactionHistory
        )
    }

    /// Intents that move money and therefore go through slot filling
    pub fn moves_money(&self) -> bool {
        matches!(
            self,
            Intent::TransferMoney | Intent::Payment | Intent::RecurringPayment
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Intent::ALL
            .iter()
            .copied()
            .find(|intent| intent.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownIntent(s.to_string()))
    }
}
