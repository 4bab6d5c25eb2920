//! The banking assistant
//!
//! One message in, one [`IntentDecision`] out. Per turn:
//!
//! 1. empty input short-circuits
//! 2. normalization and spelling correction
//! 3. recipient-name lookup, when configured and the turn may name one
//! 4. fast path (greeting, goodbye, thanks)
//! 5. continuation of a pending request, or cancellation
//! 6. otherwise intent scoring and slot extraction
//! 7. completeness check and response rendering
//! 8. below the confidence floor, the LLM fallback
//!
//! Steps 2 and 4 to 7 are pure and run under `catch_unwind`: a panic yields
//! the technical-difficulty decision and leaves the session untouched.

use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bank_assistant_config::{DomainConfig, Settings};
use bank_assistant_core::{
    BankingExecutor, CorrectionInfo, DecisionSource, ExecutionOutcome, Intent, IntentDecision,
    LlmFallback, NameLookup, Parameters, Slot, UserContext,
};
use bank_assistant_llm::{LlmFallbackClient, LlmNameLookup};
use bank_assistant_text_processing::{MessageText, NluPipeline, Normalized};

use crate::conversation::{ConversationState, PendingRequest};
use crate::executor::{self, DryRunExecutor};
use crate::orchestrator::{ResponseOrchestrator, TurnKind};
use crate::session::SessionRegistry;
use crate::AgentError;

/// Timeouts and lifetimes of a turn
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub pending_state_ttl: Duration,
    pub llm_timeout: Duration,
    pub name_lookup_timeout: Duration,
    pub execution_timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for AssistantConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            pending_state_ttl: Duration::from_secs(settings.sessions.pending_state_ttl_secs),
            llm_timeout: Duration::from_millis(settings.llm.timeout_ms),
            name_lookup_timeout: Duration::from_millis(settings.llm.name_lookup_timeout_ms),
            execution_timeout: Duration::from_millis(settings.execution.timeout_ms),
        }
    }
}

/// Decision plus the execution outcome, when an action ran
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    pub decision: IntentDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ExecutionOutcome>,
}

enum Plan {
    Decided {
        decision: IntentDecision,
        pending: Option<PendingRequest>,
    },
    /// Nothing cleared the floor; ask the LLM
    Defer { normalized: String },
}

struct PlannedTurn {
    plan: Plan,
    correction: Option<CorrectionInfo>,
}

struct PreparedTurn {
    normalized: Normalized,
    /// The message may name a recipient
    wants_name: bool,
}

pub struct BankingAssistant {
    nlu: Arc<NluPipeline>,
    orchestrator: ResponseOrchestrator,
    fallback: Option<Arc<dyn LlmFallback>>,
    names: Option<Arc<dyn NameLookup>>,
    executor: Arc<dyn BankingExecutor>,
    sessions: Arc<SessionRegistry>,
    config: AssistantConfig,
}

impl BankingAssistant {
    /// Rules only: no LLM fallback, dry-run execution
    pub fn new(
        nlu: Arc<NluPipeline>,
        orchestrator: ResponseOrchestrator,
        sessions: Arc<SessionRegistry>,
        config: AssistantConfig,
    ) -> Self {
        Self {
            nlu,
            orchestrator,
            fallback: None,
            names: None,
            executor: Arc::new(DryRunExecutor),
            sessions,
            config,
        }
    }

    /// Rules only, built from domain tables and settings
    pub fn from_domain(domain: &DomainConfig, settings: &Settings) -> Result<Self, AgentError> {
        let nlu = Arc::new(NluPipeline::new(domain, &settings.engine)?);
        Ok(Self::new(
            nlu,
            ResponseOrchestrator::from_domain(domain),
            Arc::new(SessionRegistry::new(&settings.sessions)),
            AssistantConfig::from(settings),
        ))
    }

    /// Fully wired from settings: domain tables, LLM fallback and executor
    pub fn from_settings(settings: &Settings) -> Result<Self, AgentError> {
        let domain = DomainConfig::load_or_embedded(settings.engine.domain_dir.as_deref())?;
        let mut assistant = Self::from_domain(&domain, settings)?;

        if settings.llm.enabled {
            let offset = assistant.nlu.extractor.offset();
            let client = LlmFallbackClient::from_settings(&settings.llm, offset)?;
            tracing::info!(model = %client.model_name(), "LLM fallback enabled");
            assistant = assistant.with_fallback(Arc::new(client));

            if settings.llm.name_lookup {
                let names = LlmNameLookup::from_settings(&settings.llm)?;
                tracing::info!("LLM recipient-name lookup enabled");
                assistant = assistant.with_name_lookup(Arc::new(names));
            }
        }
        let executor = executor::from_config(&settings.execution)?;
        tracing::info!(executor = %executor.name(), "Banking execution configured");
        Ok(assistant.with_executor(executor))
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn LlmFallback>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Recipient names come from `names` first, from the heuristic
    /// extractor when it fails or times out
    pub fn with_name_lookup(mut self, names: Arc<dyn NameLookup>) -> Self {
        self.names = Some(names);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn BankingExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn nlu(&self) -> &NluPipeline {
        &self.nlu
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub async fn fallback_available(&self) -> bool {
        match &self.fallback {
            Some(fallback) => fallback.is_available().await,
            None => false,
        }
    }

    /// Process one message of a session
    pub async fn handle_turn(
        &self,
        session_id: &str,
        text: &str,
        user: &UserContext,
    ) -> Result<IntentDecision, AgentError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))?;

        let _turn = session.lock_turn().await;
        session.touch();
        let started = Instant::now();

        if text.trim().is_empty() {
            let responses = self.orchestrator.responses();
            let decision = IntentDecision::reply(
                Intent::GeneralInquiry,
                responses.confidence.general_inquiry,
                responses.message("empty_input"),
            )
            .with_source(DecisionSource::Guard);
            record_turn(&decision, started);
            return Ok(decision);
        }

        let mut state = session.snapshot();
        let now = Instant::now();
        if let Some(intent) = state.expire_pending(self.config.pending_state_ttl, now) {
            tracing::info!(session_id = %session_id, intent = %intent, "Pending request expired");
        }

        let prepared = match catch_unwind(AssertUnwindSafe(|| self.prepare(text, &state))) {
            Ok(prepared) => prepared,
            Err(_) => return Ok(contained_panic(session_id, started)),
        };

        let resolved_name = if prepared.wants_name {
            self.lookup_name(&prepared.normalized.original).await
        } else {
            None
        };

        let planned = catch_unwind(AssertUnwindSafe(|| {
            self.plan(&prepared.normalized, resolved_name.as_deref(), &state, user, now)
        }));
        let planned = match planned {
            Ok(planned) => planned,
            Err(_) => return Ok(contained_panic(session_id, started)),
        };

        let (decision, pending) = match planned.plan {
            Plan::Decided { decision, pending } => (decision, pending),
            Plan::Defer { normalized } => self.consult_fallback(&normalized, &state, user, now).await,
        };
        let decision = decision.with_correction(planned.correction);

        state.set_pending(pending);
        state.record_exchange(text, decision.response());
        let pending_missing = state.pending().map(|p| p.missing.clone());
        session.commit(state);

        tracing::info!(
            session_id = %session_id,
            intent = %decision.intent(),
            confidence = decision.confidence(),
            source = decision.source().as_str(),
            requires_action = decision.requires_action(),
            missing = ?pending_missing,
            "Turn handled"
        );
        record_turn(&decision, started);
        Ok(decision)
    }

    /// Handle a turn, then hand a complete action to banking execution
    pub async fn handle_and_execute(
        &self,
        session_id: &str,
        text: &str,
        user: &UserContext,
    ) -> Result<TurnResult, AgentError> {
        let decision = self.handle_turn(session_id, text, user).await?;
        let outcome = self.execute(&decision, user).await;
        Ok(TurnResult { decision, outcome })
    }

    /// Run the action of a decision, bounded by the execution timeout
    pub async fn execute(&self, decision: &IntentDecision, user: &UserContext) -> Option<ExecutionOutcome> {
        if !decision.requires_action() {
            return None;
        }
        let action = decision.action_type()?;

        let result = tokio::time::timeout(
            self.config.execution_timeout,
            self.executor.execute(action, decision.parameters(), user),
        )
        .await;

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(action = %action, error = %e, "Banking execution failed");
                ExecutionOutcome::failed(e.to_string())
            }
            Err(_) => {
                tracing::warn!(action = %action, "Banking execution timed out");
                ExecutionOutcome::failed(format!(
                    "timeout after {} ms",
                    self.config.execution_timeout.as_millis()
                ))
            }
        };
        metrics::counter!(
            "assistant_executions_total",
            "action" => action.as_str(),
            "success" => if outcome.success { "true" } else { "false" }
        )
        .increment(1);
        Some(outcome)
    }

    fn prepare(&self, text: &str, state: &ConversationState) -> PreparedTurn {
        let normalized = self.nlu.normalizer.normalize(text);
        let wants_name = self.names.is_some() && self.may_name_recipient(&normalized, state);
        PreparedTurn {
            normalized,
            wants_name,
        }
    }

    /// Whether a name lookup is worth its latency for this message
    fn may_name_recipient(&self, normalized: &Normalized, state: &ConversationState) -> bool {
        let message = MessageText::from(normalized);
        let text = message.corrected;
        match state.pending() {
            Some(pending) if self.is_awaited_name(pending, message) => true,
            Some(pending) => {
                awaits_name(pending)
                    && self.nlu.fast_path.check(text).is_none()
                    && !self.nlu.is_cancel(text)
            }
            None => {
                self.nlu.fast_path.check(text).is_none()
                    && self.nlu.scorer.detect(text).is_some_and(|scored| {
                        matches!(scored.intent, Intent::TransferMoney | Intent::RecurringPayment)
                    })
            }
        }
    }

    /// A reply that reads as the awaited recipient name before correction.
    ///
    /// Such a reply is never taken for a courtesy or a cancellation, even
    /// when correction turned it into one ("julie" into "oublie").
    fn is_awaited_name(&self, pending: &PendingRequest, message: MessageText<'_>) -> bool {
        awaits_name(pending)
            && self.nlu.fast_path.check(message.folded).is_none()
            && !self.nlu.is_cancel(message.folded)
            && self.nlu.extractor.bare_name(message.folded).is_some()
    }

    async fn lookup_name(&self, text: &str) -> Option<String> {
        let names = self.names.as_ref()?;
        let lookup = names.lookup_name(text);
        match tokio::time::timeout(self.config.name_lookup_timeout, lookup).await {
            Ok(Ok(answer)) => {
                record_name_lookup("answered");
                Some(answer)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Name lookup failed, using heuristic");
                record_name_lookup("failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.name_lookup_timeout.as_millis() as u64,
                    "Name lookup timed out, using heuristic"
                );
                record_name_lookup("timeout");
                None
            }
        }
    }

    fn plan(
        &self,
        normalized: &Normalized,
        resolved_name: Option<&str>,
        state: &ConversationState,
        user: &UserContext,
        now: Instant,
    ) -> PlannedTurn {
        let correction = normalized.was_corrected.then(|| CorrectionInfo {
            original: normalized.original.clone(),
            corrected: normalized.corrected.clone(),
        });
        let message = MessageText::from(normalized).with_resolved_name(resolved_name);

        PlannedTurn {
            plan: self.route(message, state, user, now),
            correction,
        }
    }

    fn route(
        &self,
        message: MessageText<'_>,
        state: &ConversationState,
        user: &UserContext,
        now: Instant,
    ) -> Plan {
        let text = message.corrected;
        let awaited_name = state
            .pending()
            .is_some_and(|pending| self.is_awaited_name(pending, message));

        if let Some(hit) = self.nlu.fast_path.check(text).filter(|_| !awaited_name) {
            // Thanks keep a pending request; greeting and goodbye drop it
            let pending = match hit.intent {
                Intent::Acknowledgment => state.pending().cloned(),
                _ => None,
            };
            let decision = IntentDecision::reply(hit.intent, hit.confidence, hit.reply(state.turn_count()))
                .with_source(DecisionSource::FastPath);
            return Plan::Decided { decision, pending };
        }

        if let Some(pending) = state.pending() {
            if self.nlu.is_cancel(text) && !awaited_name {
                tracing::info!(intent = %pending.intent, "Pending request cancelled");
                let responses = self.orchestrator.responses();
                let decision = IntentDecision::reply(
                    Intent::GeneralInquiry,
                    responses.confidence.general_inquiry,
                    responses.message("cancelled"),
                )
                .with_source(DecisionSource::Guard);
                return Plan::Decided {
                    decision,
                    pending: None,
                };
            }
            if let Some(plan) = self.continue_pending(pending, message, user, now) {
                return plan;
            }
        }

        self.fresh_request(message, state.turn_count(), user, now)
    }

    /// Merge the new turn into the pending request.
    ///
    /// Returns `None` when the turn added nothing and the scorer recognizes
    /// another intent: the pending request is then abandoned.
    fn continue_pending(
        &self,
        pending: &PendingRequest,
        message: MessageText<'_>,
        user: &UserContext,
        now: Instant,
    ) -> Option<Plan> {
        let text = message.corrected;
        let mut extraction = self.nlu.extractor.extract(pending.intent, message);
        let found = &extraction.parameters;
        let named = found.contains(Slot::RecipientName) || found.contains(Slot::ServiceName);
        if awaits_name(pending) && !named {
            if let Some(name) = self.bare_name_reply(pending.intent, message) {
                extraction.parameters.insert(Slot::RecipientName, name);
            }
        }
        let mut parameters = pending.parameters.clone();
        let added = parameters.merge_absent(extraction.parameters);

        if added.is_empty() {
            if let Some(other) = self.nlu.scorer.detect(text) {
                if other.intent != pending.intent {
                    tracing::info!(
                        from = %pending.intent,
                        to = %other.intent,
                        "Switching away from pending request"
                    );
                    return None;
                }
            }
        }

        let mut warnings = extraction.warnings;
        warnings.extend(self.orchestrator.soft_warnings(pending.intent, &parameters, user));
        let missing = self.missing_slots(pending.intent, &parameters);

        let decision = self.orchestrator.decide(
            pending.intent,
            parameters.clone(),
            warnings,
            missing.clone(),
            &TurnKind::Continuation { added },
            0.0,
        );
        let pending = (!missing.is_empty())
            .then(|| PendingRequest::new(pending.intent, parameters, missing, now));
        Some(Plan::Decided { decision, pending })
    }

    /// The whole reply read as the awaited recipient name, unless it is
    /// recognized as another request
    fn bare_name_reply(&self, intent: Intent, message: MessageText<'_>) -> Option<String> {
        if let Some(other) = self.nlu.scorer.detect(message.corrected) {
            if other.intent != intent {
                return None;
            }
        }
        let name = self.nlu.extractor.bare_name(message.folded)?;
        tracing::debug!(intent = %intent, "Reply read as the recipient name");
        Some(name)
    }

    fn fresh_request(
        &self,
        message: MessageText<'_>,
        turn: usize,
        user: &UserContext,
        now: Instant,
    ) -> Plan {
        let text = message.corrected;
        let Some(scored) = self.nlu.scorer.detect(text) else {
            return Plan::Defer {
                normalized: text.to_string(),
            };
        };
        let intent = scored.intent;

        if intent.is_fast_path() {
            let decision = match self.nlu.fast_path.replies_for(intent) {
                Some(replies) => IntentDecision::reply(intent, scored.confidence, replies.reply(turn)),
                None => IntentDecision::reply(
                    intent,
                    scored.confidence,
                    self.orchestrator.responses().message("general_inquiry"),
                ),
            };
            return Plan::Decided {
                decision: decision.with_source(DecisionSource::Rules),
                pending: None,
            };
        }

        let extraction = self.nlu.extractor.extract(intent, message);
        let parameters = extraction.parameters;
        let mut warnings = extraction.warnings;
        warnings.extend(self.orchestrator.soft_warnings(intent, &parameters, user));
        let missing = self.missing_slots(intent, &parameters);

        let decision = self.orchestrator.decide(
            intent,
            parameters.clone(),
            warnings,
            missing.clone(),
            &TurnKind::FirstTurn,
            scored.confidence,
        );
        let pending = (!missing.is_empty()).then(|| PendingRequest::new(intent, parameters, missing, now));
        Plan::Decided { decision, pending }
    }

    fn missing_slots(&self, intent: Intent, parameters: &Parameters) -> Vec<Slot> {
        let waived = self.nlu.extractor.bill_waived(parameters);
        self.orchestrator.missing_slots(intent, parameters, waived)
    }

    async fn consult_fallback(
        &self,
        normalized: &str,
        state: &ConversationState,
        user: &UserContext,
        now: Instant,
    ) -> (IntentDecision, Option<PendingRequest>) {
        let Some(fallback) = &self.fallback else {
            tracing::warn!("No intent above the confidence floor and no LLM fallback configured");
            record_fallback("disabled");
            return (IntentDecision::technical_error(), None);
        };

        let transcript = state.transcript().to_vec();
        let result = tokio::time::timeout(
            self.config.llm_timeout,
            fallback.decide(normalized, &transcript, user),
        )
        .await;

        match result {
            Ok(Ok(decision)) => {
                record_fallback("accepted");
                self.revalidate(decision, user, now)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "LLM fallback failed");
                record_fallback("failed");
                (IntentDecision::technical_error(), None)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.llm_timeout.as_millis() as u64,
                    "LLM fallback timed out"
                );
                record_fallback("timeout");
                (IntentDecision::technical_error(), None)
            }
        }
    }

    /// Money-moving LLM decisions go through the same completeness rules
    fn revalidate(
        &self,
        decision: IntentDecision,
        user: &UserContext,
        now: Instant,
    ) -> (IntentDecision, Option<PendingRequest>) {
        let intent = decision.intent();
        if !intent.moves_money() {
            return (decision, None);
        }

        let mut parameters = decision.parameters().clone();
        let mut warnings = self.nlu.extractor.validator().validate(intent, &mut parameters);
        warnings.extend(self.orchestrator.soft_warnings(intent, &parameters, user));
        let missing = self.missing_slots(intent, &parameters);

        let revalidated = self.orchestrator.decide(
            intent,
            parameters.clone(),
            warnings,
            missing.clone(),
            &TurnKind::Fallback,
            decision.confidence(),
        );
        let pending = (!missing.is_empty()).then(|| PendingRequest::new(intent, parameters, missing, now));
        (revalidated, pending)
    }
}

fn awaits_name(pending: &PendingRequest) -> bool {
    pending
        .missing
        .iter()
        .any(|slot| matches!(slot, Slot::RecipientName | Slot::RecipientOrService))
}

fn contained_panic(session_id: &str, started: Instant) -> IntentDecision {
    tracing::error!(session_id = %session_id, "Turn pipeline panicked");
    let decision = IntentDecision::technical_error();
    record_turn(&decision, started);
    decision
}

fn record_turn(decision: &IntentDecision, started: Instant) {
    metrics::counter!(
        "assistant_turns_total",
        "intent" => decision.intent().as_str(),
        "source" => decision.source().as_str()
    )
    .increment(1);
    metrics::histogram!("assistant_turn_latency_seconds").record(started.elapsed().as_secs_f64());
}

fn record_fallback(outcome: &'static str) {
    metrics::counter!("assistant_fallback_total", "outcome" => outcome).increment(1);
}

fn record_name_lookup(outcome: &'static str) {
    metrics::counter!("assistant_name_lookup_total", "outcome" => outcome).increment(1);
}
