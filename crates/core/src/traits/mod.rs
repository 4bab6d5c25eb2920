//! Collaborator traits
//!
//! The engine reaches the outside world through narrow seams:
//!
//! ```text
//!   BankingExecutor: performs a complete banking action (ledger side)
//!   LlmFallback:     decides a turn the rules could not classify
//!   NameLookup:      finds the recipient name in a message
//! ```
//!
//! These are the only places where a turn may suspend; callers wrap them in
//! a bounded timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::{Turn, UserContext};
use crate::decision::IntentDecision;
use crate::error::Result;
use crate::intent::Intent;
use crate::parameters::Parameters;

/// Result reported by the banking back-end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Banking execution interface.
///
/// Implementations own all ledger effects; the engine never mutates
/// account state itself.
#[async_trait]
pub trait BankingExecutor: Send + Sync + 'static {
    async fn execute(
        &self,
        action: Intent,
        parameters: &Parameters,
        user: &UserContext,
    ) -> Result<ExecutionOutcome>;

    fn name(&self) -> &str;
}

/// Generative fallback for turns below the confidence floor.
///
/// Receives the normalized text and the recent transcript and must return a
/// decision in the same envelope the rule engine produces.
#[async_trait]
pub trait LlmFallback: Send + Sync + 'static {
    async fn decide(
        &self,
        normalized_text: &str,
        transcript: &[Turn],
        user: &UserContext,
    ) -> Result<IntentDecision>;

    /// Whether the fallback can currently be reached
    async fn is_available(&self) -> bool {
        true
    }
}

/// Generative recipient-name lookup.
///
/// Answers with the bare name found in `text` or the sentinel `NONE`;
/// callers sanitize the answer before trusting it.
#[async_trait]
pub trait NameLookup: Send + Sync + 'static {
    async fn lookup_name(&self, text: &str) -> Result<String>;
}
