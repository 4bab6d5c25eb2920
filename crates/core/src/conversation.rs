//! Conversation transcript and caller context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Speaker of a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// A single transcript turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

/// Bounded transcript keeping the most recent turns
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    turns: VecDeque<Turn>,
    limit: usize,
}

impl Transcript {
    pub fn new(limit: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(limit.min(64)),
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, turn: Turn) {
        while self.turns.len() >= self.limit {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// An account owned by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_number: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
}

fn default_currency() -> String {
    "TND".to_string()
}

/// Authenticated caller, supplied by the surrounding back-end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub accounts: Vec<AccountSummary>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn has_accounts(&self) -> bool {
        !self.accounts.is_empty()
    }

    pub fn primary_account(&self) -> Option<&AccountSummary> {
        self.accounts
            .iter()
            .find(|a| a.is_primary)
            .or_else(|| self.accounts.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_drops_oldest() {
        let mut transcript = Transcript::new(3);
        for i in 0..5 {
            transcript.push(Turn::user(format!("message {i}")));
        }
        assert_eq!(transcript.len(), 3);
        let first = transcript.turns().next().unwrap();
        assert_eq!(first.content, "message 2");
    }

    #[test]
    fn test_primary_account_falls_back_to_first() {
        let mut user = UserContext::new("u-1");
        assert!(user.primary_account().is_none());
        user.accounts.push(AccountSummary {
            account_number: "1234567890123".to_string(),
            ..Default::default()
        });
        user.accounts.push(AccountSummary {
            account_number: "12345678901234567890".to_string(),
            is_primary: true,
            ..Default::default()
        });
        assert_eq!(
            user.primary_account().unwrap().account_number,
            "12345678901234567890"
        );
    }

    #[test]
    fn test_user_context_deserializes_with_defaults() {
        let user: UserContext = serde_json::from_str(
            r#"{"user_id": "42", "accounts": [{"account_number": "1984573201694"}]}"#,
        )
        .unwrap();
        assert!(user.has_accounts());
        assert_eq!(user.accounts[0].currency, "TND");
    }
}
