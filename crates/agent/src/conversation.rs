//! Conversation State
//!
//! At most one pending request per session. A request that could not run
//! because slots were missing waits in [`PendingRequest`]; later turns may
//! only add slots to it, never replace them.
//!
//! ```text
//!   IDLE --(intent detected, slots missing)--> AWAITING_SLOTS
//!   AWAITING_SLOTS --(complete)--> IDLE
//!   AWAITING_SLOTS --(cancel | greeting | goodbye | expiry | other intent)--> IDLE
//! ```

use serde::Serialize;
use std::time::{Duration, Instant};

use bank_assistant_core::{Intent, Parameters, Slot, Transcript, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    Idle,
    AwaitingSlots,
}

/// A request waiting for more slots
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub intent: Intent,
    pub parameters: Parameters,
    pub missing: Vec<Slot>,
    pub last_request_time: Instant,
}

impl PendingRequest {
    pub fn new(intent: Intent, parameters: Parameters, missing: Vec<Slot>, now: Instant) -> Self {
        Self {
            intent,
            parameters,
            missing,
            last_request_time: now,
        }
    }

    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_request_time) > ttl
    }
}

/// Per-session state owned by the session
#[derive(Debug, Clone)]
pub struct ConversationState {
    pending: Option<PendingRequest>,
    transcript: Transcript,
    turn_count: usize,
}

impl ConversationState {
    pub fn new(transcript_limit: usize) -> Self {
        Self {
            pending: None,
            transcript: Transcript::new(transcript_limit),
            turn_count: 0,
        }
    }

    pub fn phase(&self) -> ConversationPhase {
        if self.pending.is_some() {
            ConversationPhase::AwaitingSlots
        } else {
            ConversationPhase::Idle
        }
    }

    pub fn is_waiting_for_info(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn set_pending(&mut self, pending: Option<PendingRequest>) {
        self.pending = pending;
    }

    pub fn clear_pending(&mut self) -> Option<PendingRequest> {
        self.pending.take()
    }

    /// Drop a pending request older than `ttl`; returns its intent
    pub fn expire_pending(&mut self, ttl: Duration, now: Instant) -> Option<Intent> {
        if self.pending.as_ref().is_some_and(|p| p.is_expired(ttl, now)) {
            return self.pending.take().map(|p| p.intent);
        }
        None
    }

    pub fn record_exchange(&mut self, user: &str, assistant: &str) {
        self.transcript.push(Turn::user(user));
        self.transcript.push(Turn::assistant(assistant));
        self.turn_count += 1;
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn turn_count(&self) -> usize {
        self.turn_count
    }

    /// Back to IDLE with an empty transcript
    pub fn reset(&mut self) {
        self.pending = None;
        self.transcript.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_follows_pending() {
        let mut state = ConversationState::new(30);
        assert_eq!(state.phase(), ConversationPhase::Idle);

        state.set_pending(Some(PendingRequest::new(
            Intent::TransferMoney,
            Parameters::new().with(Slot::Amount, 600.0),
            vec![Slot::RecipientAccount, Slot::RecipientName],
            Instant::now(),
        )));
        assert_eq!(state.phase(), ConversationPhase::AwaitingSlots);
        assert!(state.is_waiting_for_info());

        let pending = state.clear_pending().unwrap();
        assert_eq!(pending.intent, Intent::TransferMoney);
        assert_eq!(state.phase(), ConversationPhase::Idle);
    }

    #[test]
    fn test_expiry() {
        let mut state = ConversationState::new(30);
        let created = Instant::now();
        state.set_pending(Some(PendingRequest::new(
            Intent::Payment,
            Parameters::new(),
            vec![Slot::Amount],
            created,
        )));

        let ttl = Duration::from_secs(600);
        assert_eq!(state.expire_pending(ttl, created + Duration::from_secs(599)), None);
        assert!(state.is_waiting_for_info());
        assert_eq!(
            state.expire_pending(ttl, created + Duration::from_secs(601)),
            Some(Intent::Payment)
        );
        assert!(!state.is_waiting_for_info());
    }

    #[test]
    fn test_transcript_is_bounded() {
        let mut state = ConversationState::new(4);
        for i in 0..5 {
            state.record_exchange(&format!("message {i}"), "ok");
        }
        assert_eq!(state.turn_count(), 5);
        assert_eq!(state.transcript().len(), 4);

        state.reset();
        assert!(state.transcript().is_empty());
        assert_eq!(state.turn_count(), 5);
    }
}
