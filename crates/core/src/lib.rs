//! Core types and traits for the banking assistant
//!
//! This crate provides the types shared by every other crate:
//! - The closed [`Intent`] set and typed parameter [`Slot`]s
//! - The [`IntentDecision`] envelope returned for every turn
//! - Caller context and the bounded conversation transcript
//! - Collaborator traits for banking execution, the LLM fallback and the
//!   recipient-name lookup
//! - Error types

pub mod conversation;
pub mod decision;
pub mod error;
pub mod intent;
pub mod parameters;
pub mod traits;

pub use conversation::{AccountSummary, Transcript, Turn, TurnRole, UserContext};
pub use decision::{
    CorrectionInfo, DecisionSource, IntentDecision, TECHNICAL_DIFFICULTY_RESPONSE,
};
pub use error::{Error, Result};
pub use intent::Intent;
pub use parameters::{Frequency, Parameters, Slot, SlotValue};
pub use traits::{BankingExecutor, ExecutionOutcome, LlmFallback, NameLookup};
