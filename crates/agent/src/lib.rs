//! Conversational layer of the banking assistant
//!
//! Features:
//! - Per-session conversation state (IDLE / AWAITING_SLOTS) with
//!   accumulation-only slot merging and pending-request expiry
//! - Response orchestration: completeness rules, confirmations and
//!   missing-information prompts
//! - [`BankingAssistant::handle_turn`], the single entry point per message
//! - Session registry with background cleanup
//! - Banking execution adapters (HTTP and dry run)

pub mod assistant;
pub mod conversation;
pub mod executor;
pub mod orchestrator;
pub mod session;

pub use assistant::{AssistantConfig, BankingAssistant, TurnResult};
pub use conversation::{ConversationPhase, ConversationState, PendingRequest};
pub use executor::{DryRunExecutor, HttpBankingExecutor};
pub use orchestrator::{ResponseOrchestrator, TurnKind};
pub use session::{Session, SessionRegistry, SessionSummary};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Max sessions reached ({0})")]
    CapacityReached(usize),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

impl From<bank_assistant_text_processing::TextProcessingError> for AgentError {
    fn from(err: bank_assistant_text_processing::TextProcessingError) -> Self {
        AgentError::Initialization(err.to_string())
    }
}

impl From<bank_assistant_config::DomainConfigError> for AgentError {
    fn from(err: bank_assistant_config::DomainConfigError) -> Self {
        AgentError::Initialization(err.to_string())
    }
}

impl From<bank_assistant_llm::LlmError> for AgentError {
    fn from(err: bank_assistant_llm::LlmError) -> Self {
        AgentError::Initialization(err.to_string())
    }
}
