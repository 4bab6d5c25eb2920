//! End-to-end conversations through the banking assistant
//!
//! Runs the embedded domain tables with scripted collaborators in place of
//! the LLM and the banking back-end.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use bank_assistant_agent::{
    AgentError, AssistantConfig, BankingAssistant, ConversationPhase, ResponseOrchestrator,
    SessionRegistry,
};
use bank_assistant_config::{DomainConfig, Settings};
use bank_assistant_core::{
    BankingExecutor, DecisionSource, Error, ExecutionOutcome, Intent, IntentDecision, LlmFallback,
    NameLookup, Parameters, Result, Slot, Turn, UserContext,
};
use bank_assistant_text_processing::{NameExtractor, NluPipeline};

fn assistant_with(settings: &Settings) -> BankingAssistant {
    let domain = DomainConfig::embedded().unwrap();
    BankingAssistant::from_domain(&domain, settings).unwrap()
}

fn assistant() -> BankingAssistant {
    assistant_with(&Settings::default())
}

fn user() -> UserContext {
    UserContext::new("client-42")
}

/// Returns a fixed decision and remembers what it was asked
struct ScriptedFallback {
    decision: IntentDecision,
    delay: Duration,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedFallback {
    fn new(decision: IntentDecision) -> Self {
        Self {
            decision,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn slow(decision: IntentDecision, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(decision)
        }
    }
}

#[async_trait]
impl LlmFallback for ScriptedFallback {
    async fn decide(
        &self,
        normalized_text: &str,
        transcript: &[Turn],
        _user: &UserContext,
    ) -> Result<IntentDecision> {
        self.calls
            .lock()
            .push((normalized_text.to_string(), transcript.len()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.decision.clone())
    }
}

struct FailingFallback;

#[async_trait]
impl LlmFallback for FailingFallback {
    async fn decide(&self, _: &str, _: &[Turn], _: &UserContext) -> Result<IntentDecision> {
        Err(Error::Llm("connection refused".to_string()))
    }
}

/// Records executed actions
#[derive(Default)]
struct RecordingExecutor {
    executed: Mutex<Vec<(Intent, Parameters)>>,
}

#[async_trait]
impl BankingExecutor for RecordingExecutor {
    async fn execute(
        &self,
        action: Intent,
        parameters: &Parameters,
        _user: &UserContext,
    ) -> Result<ExecutionOutcome> {
        self.executed.lock().push((action, parameters.clone()));
        Ok(ExecutionOutcome::ok(serde_json::json!({ "reference": "TX-1" })))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct RejectingExecutor;

#[async_trait]
impl BankingExecutor for RejectingExecutor {
    async fn execute(&self, _: Intent, _: &Parameters, _: &UserContext) -> Result<ExecutionOutcome> {
        Err(Error::Execution("ledger unavailable".to_string()))
    }

    fn name(&self) -> &str {
        "rejecting"
    }
}

/// Answers every name lookup the same way and records the texts it saw
struct ScriptedNames {
    answer: Option<&'static str>,
    delay: Duration,
    seen: Mutex<Vec<String>>,
}

impl ScriptedNames {
    fn answering(answer: &'static str) -> Self {
        Self {
            answer: Some(answer),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            answer: None,
            ..Self::answering("")
        }
    }

    fn slow(answer: &'static str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::answering(answer)
        }
    }
}

#[async_trait]
impl NameLookup for ScriptedNames {
    async fn lookup_name(&self, text: &str) -> Result<String> {
        self.seen.lock().push(text.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer
            .map(str::to_string)
            .ok_or_else(|| Error::Llm("connection refused".to_string()))
    }
}

struct PanickingNames;

impl NameExtractor for PanickingNames {
    fn lookup(&self, _text: &str) -> String {
        panic!("name lookup blew up");
    }
}

#[tokio::test]
async fn test_single_balance() {
    let assistant = assistant();
    let session = assistant.sessions().create().unwrap();

    let decision = assistant
        .handle_turn(&session.id, "Quel est mon solde ?", &user())
        .await
        .unwrap();

    assert_eq!(decision.intent(), Intent::CheckBalance);
    assert!(decision.confidence() >= 0.85);
    assert!(decision.requires_action());
    assert_eq!(decision.action_type(), Some(Intent::CheckBalance));
    assert_eq!(decision.source(), DecisionSource::Rules);
}

#[tokio::test]
async fn test_all_accounts() {
    let assistant = assistant();
    let session = assistant.sessions().create().unwrap();

    let decision = assistant
        .handle_turn(&session.id, "solde de tous mes comptes", &user())
        .await
        .unwrap();

    assert_eq!(decision.intent(), Intent::GetAccounts);
    assert!(decision.confidence() >= 0.9);
    assert!(decision.requires_action());
    assert_eq!(decision.action_type(), Some(Intent::GetAccounts));
}

#[tokio::test]
async fn test_incremental_transfer() {
    let assistant = assistant();
    let session = assistant.sessions().create().unwrap();

    let first = assistant
        .handle_turn(&session.id, "je veux faire un virement de 600dt", &user())
        .await
        .unwrap();
    assert_eq!(first.intent(), Intent::TransferMoney);
    assert!(!first.requires_action());
    assert_eq!(first.confidence(), 0.85);
    assert_eq!(first.missing(), &[Slot::RecipientAccount, Slot::RecipientName]);
    assert_eq!(first.parameters().amount(), Some(600.0));
    assert!(first.response().contains("600.00 DT"));

    let summary = session.summary();
    assert_eq!(summary.phase, ConversationPhase::AwaitingSlots);
    assert_eq!(summary.pending_intent, Some(Intent::TransferMoney));

    let second = assistant
        .handle_turn(&session.id, "vers Juliette compte 1984573201694", &user())
        .await
        .unwrap();
    assert_eq!(second.intent(), Intent::TransferMoney);
    assert!(second.requires_action());
    assert_eq!(second.action_type(), Some(Intent::TransferMoney));
    assert_eq!(second.confidence(), 0.95);
    assert_eq!(second.source(), DecisionSource::Continuation);
    assert_eq!(second.parameters().amount(), Some(600.0));
    assert_eq!(second.parameters().text(Slot::RecipientName), Some("Juliette"));
    assert_eq!(
        second.parameters().text(Slot::RecipientAccount),
        Some("1984573201694")
    );
    assert!(second.response().starts_with("Parfait ! Je procède au virement de 600.00 DT"));

    let summary = session.summary();
    assert_eq!(summary.phase, ConversationPhase::Idle);
    assert_eq!(summary.turn_count, 2);
}

#[tokio::test]
async fn test_known_service_payment_is_complete() {
    let assistant = assistant();
    let session = assistant.sessions().create().unwrap();

    let decision = assistant
        .handle_turn(&session.id, "payer ma facture steg 45dt", &user())
        .await
        .unwrap();

    assert_eq!(decision.intent(), Intent::Payment);
    assert!(decision.requires_action());
    assert_eq!(decision.parameters().amount(), Some(45.0));
    assert_eq!(
        decision.parameters().text(Slot::Merchant),
        Some("STEG (Électricité et Gaz)")
    );
    assert!(!decision.parameters().contains(Slot::BillNumber));
    assert_eq!(session.summary().phase, ConversationPhase::Idle);
}

#[tokio::test]
async fn test_greeting_fast_path() {
    let assistant = assistant();
    let session = assistant.sessions().create().unwrap();

    let decision = assistant
        .handle_turn(&session.id, "Bonjour", &user())
        .await
        .unwrap();

    assert_eq!(decision.intent(), Intent::Greeting);
    assert_eq!(decision.confidence(), 0.95);
    assert_eq!(decision.source(), DecisionSource::FastPath);
    assert!(!decision.requires_action());
    assert!(!decision.response().is_empty());
}

#[tokio::test]
async fn test_greeting_drops_pending_request() {
    let assistant = assistant();
    let session = assistant.sessions().create().unwrap();

    assistant
        .handle_turn(&session.id, "je veux faire un virement de 600dt", &user())
        .await
        .unwrap();
    assistant
        .handle_turn(&session.id, "bonjour", &user())
        .await
        .unwrap();

    assert_eq!(session.summary().phase, ConversationPhase::Idle);
}

#[tokio::test]
async fn test_thanks_keep_pending_request() {
    let assistant = assistant();
    let session = assistant.sessions().create().unwrap();

    assistant
        .handle_turn(&session.id, "je veux faire un virement de 600dt", &user())
        .await
        .unwrap();
    let thanks = assistant
        .handle_turn(&session.id, "merci beaucoup", &user())
        .await
        .unwrap();
    assert_eq!(thanks.intent(), Intent::Acknowledgment);
    assert_eq!(session.summary().phase, ConversationPhase::AwaitingSlots);

    let done = assistant
        .handle_turn(&session.id, "vers Juliette compte 1984573201694", &user())
        .await
        .unwrap();
    assert!(done.requires_action());
    assert_eq!(done.parameters().amount(), Some(600.0));
}

#[tokio::test]
async fn test_cancel_pending_request() {
    let assistant = assistant();
    let session = assistant.sessions().create().unwrap();

    assistant
        .handle_turn(&session.id, "je veux faire un virement de 600dt", &user())
        .await
        .unwrap();
    let cancelled = assistant
        .handle_turn(&session.id, "annuler", &user())
        .await
        .unwrap();

    assert_eq!(cancelled.intent(), Intent::GeneralInquiry);
    assert!(!cancelled.requires_action());
    assert!(cancelled.response().contains("annulé"));
    assert_eq!(session.summary().phase, ConversationPhase::Idle);
}

#[tokio::test]
async fn test_expired_pending_request_is_not_continued() {
    let mut settings = Settings::default();
    settings.sessions.pending_state_ttl_secs = 0;
    let assistant = assistant_with(&settings);
    let session = assistant.sessions().create().unwrap();

    assistant
        .handle_turn(&session.id, "je veux faire un virement de 600dt", &user())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let decision = assistant
        .handle_turn(&session.id, "vers Juliette compte 1984573201694", &user())
        .await
        .unwrap();
    assert!(!decision.parameters().contains(Slot::Amount));
    assert!(!decision.requires_action());
}

#[tokio::test]
async fn test_empty_input() {
    let assistant = assistant();
    let session = assistant.sessions().create().unwrap();

    let decision = assistant.handle_turn(&session.id, "   ", &user()).await.unwrap();

    assert_eq!(decision.intent(), Intent::GeneralInquiry);
    assert_eq!(decision.confidence(), 0.70);
    assert_eq!(decision.source(), DecisionSource::Guard);
    assert_eq!(session.summary().turn_count, 0);
}

#[tokio::test]
async fn test_unknown_session() {
    let assistant = assistant();
    let result = assistant.handle_turn("no-such-session", "solde", &user()).await;
    assert!(matches!(result, Err(AgentError::SessionNotFound(id)) if id == "no-such-session"));
}

#[tokio::test]
async fn test_below_floor_without_fallback_is_technical_error() {
    let assistant = assistant();
    let session = assistant.sessions().create().unwrap();

    let decision = assistant
        .handle_turn(&session.id, "quelle est la meteo demain", &user())
        .await
        .unwrap();

    assert_eq!(decision.intent(), Intent::Error);
    assert_eq!(decision.confidence(), 0.0);
    assert!(!decision.requires_action());
}

#[tokio::test]
async fn test_below_floor_consults_fallback() {
    let reply = IntentDecision::from_parts(
        Intent::GeneralInquiry,
        0.6,
        "Je ne peux vous renseigner que sur vos opérations bancaires.",
        Parameters::new(),
        false,
        None,
    )
    .unwrap();
    let fallback = Arc::new(ScriptedFallback::new(reply));
    let assistant = assistant().with_fallback(fallback.clone());
    let session = assistant.sessions().create().unwrap();

    assistant
        .handle_turn(&session.id, "Bonjour", &user())
        .await
        .unwrap();
    let decision = assistant
        .handle_turn(&session.id, "quelle est la meteo demain", &user())
        .await
        .unwrap();

    assert_eq!(decision.intent(), Intent::GeneralInquiry);
    assert_eq!(decision.source(), DecisionSource::Fallback);
    assert_eq!(decision.confidence(), 0.6);

    let calls = fallback.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "quelle est la meteo demain");
    // Greeting exchange: one user turn, one assistant turn
    assert_eq!(calls[0].1, 2);
}

#[tokio::test]
async fn test_rule_hits_never_reach_fallback() {
    let reply = IntentDecision::from_parts(Intent::GeneralInquiry, 0.6, "non", Parameters::new(), false, None)
        .unwrap();
    let fallback = Arc::new(ScriptedFallback::new(reply));
    let assistant = assistant().with_fallback(fallback.clone());
    let session = assistant.sessions().create().unwrap();

    assistant
        .handle_turn(&session.id, "quel est mon solde", &user())
        .await
        .unwrap();
    assert!(fallback.calls.lock().is_empty());
}

#[tokio::test]
async fn test_fallback_transfer_is_revalidated() {
    // The LLM claims a complete transfer but gives no recipient
    let claimed = IntentDecision::from_parts(
        Intent::TransferMoney,
        0.9,
        "Je procède au virement.",
        Parameters::new().with(Slot::Amount, 200.0),
        true,
        Some(Intent::TransferMoney),
    )
    .unwrap();
    let assistant = assistant().with_fallback(Arc::new(ScriptedFallback::new(claimed)));
    let session = assistant.sessions().create().unwrap();

    let decision = assistant
        .handle_turn(&session.id, "quelle est la meteo demain", &user())
        .await
        .unwrap();

    assert_eq!(decision.intent(), Intent::TransferMoney);
    assert!(!decision.requires_action());
    assert_eq!(decision.source(), DecisionSource::Fallback);
    assert!(decision.missing().contains(&Slot::RecipientAccount));
    assert_eq!(session.summary().phase, ConversationPhase::AwaitingSlots);
}

#[tokio::test]
async fn test_fallback_error_is_technical_error() {
    let assistant = assistant().with_fallback(Arc::new(FailingFallback));
    let session = assistant.sessions().create().unwrap();

    let decision = assistant
        .handle_turn(&session.id, "quelle est la meteo demain", &user())
        .await
        .unwrap();
    assert_eq!(decision.intent(), Intent::Error);
}

#[tokio::test]
async fn test_fallback_timeout_is_technical_error() {
    let mut settings = Settings::default();
    settings.llm.timeout_ms = 50;
    let reply = IntentDecision::from_parts(Intent::GeneralInquiry, 0.6, "trop tard", Parameters::new(), false, None)
        .unwrap();
    let assistant = assistant_with(&settings).with_fallback(Arc::new(ScriptedFallback::slow(
        reply,
        Duration::from_secs(5),
    )));
    let session = assistant.sessions().create().unwrap();

    let decision = assistant
        .handle_turn(&session.id, "quelle est la meteo demain", &user())
        .await
        .unwrap();
    assert_eq!(decision.intent(), Intent::Error);
}

#[tokio::test]
async fn test_complete_action_is_executed() {
    let executor = Arc::new(RecordingExecutor::default());
    let assistant = assistant().with_executor(executor.clone());
    let session = assistant.sessions().create().unwrap();

    let result = assistant
        .handle_and_execute(&session.id, "quel est mon solde", &user())
        .await
        .unwrap();

    let outcome = result.outcome.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.data["reference"], "TX-1");
    let executed = executor.executed.lock();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].0, Intent::CheckBalance);
}

#[tokio::test]
async fn test_incomplete_action_is_not_executed() {
    let executor = Arc::new(RecordingExecutor::default());
    let assistant = assistant().with_executor(executor.clone());
    let session = assistant.sessions().create().unwrap();

    let result = assistant
        .handle_and_execute(&session.id, "je veux faire un virement de 600dt", &user())
        .await
        .unwrap();

    assert!(result.outcome.is_none());
    assert!(executor.executed.lock().is_empty());
}

#[tokio::test]
async fn test_execution_error_becomes_failed_outcome() {
    let assistant = assistant().with_executor(Arc::new(RejectingExecutor));
    let session = assistant.sessions().create().unwrap();

    let result = assistant
        .handle_and_execute(&session.id, "quel est mon solde", &user())
        .await
        .unwrap();

    let outcome = result.outcome.unwrap();
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("ledger unavailable"));
}

#[tokio::test]
async fn test_panic_is_contained() {
    let settings = Settings::default();
    let domain = DomainConfig::embedded().unwrap();
    let nlu = NluPipeline::with_name_extractor(&domain, &settings.engine, Arc::new(PanickingNames))
        .unwrap();
    let assistant = BankingAssistant::new(
        Arc::new(nlu),
        ResponseOrchestrator::from_domain(&domain),
        Arc::new(SessionRegistry::new(&settings.sessions)),
        AssistantConfig::from(&settings),
    );
    let session = assistant.sessions().create().unwrap();

    let decision = assistant
        .handle_turn(&session.id, "je veux faire un virement de 600dt", &user())
        .await
        .unwrap();
    assert_eq!(decision.intent(), Intent::Error);
    assert_eq!(session.summary().turn_count, 0);

    // The session is still usable
    let next = assistant
        .handle_turn(&session.id, "quel est mon solde", &user())
        .await
        .unwrap();
    assert_eq!(next.intent(), Intent::CheckBalance);
}

#[tokio::test]
async fn test_reset_clears_pending_request() {
    let assistant = assistant();
    let session = assistant.sessions().create().unwrap();

    assistant
        .handle_turn(&session.id, "je veux faire un virement de 600dt", &user())
        .await
        .unwrap();
    session.reset().await;

    let summary = session.summary();
    assert_eq!(summary.phase, ConversationPhase::Idle);
    assert!(summary.missing.is_empty());
}

async fn transfer_awaiting_name(assistant: &BankingAssistant, session_id: &str) {
    let first = assistant
        .handle_turn(session_id, "je veux faire un virement de 600dt", &user())
        .await
        .unwrap();
    assert_eq!(first.missing(), &[Slot::RecipientAccount, Slot::RecipientName]);

    let second = assistant
        .handle_turn(session_id, "1984573201694", &user())
        .await
        .unwrap();
    assert_eq!(second.missing(), &[Slot::RecipientName]);
    assert_eq!(
        second.parameters().text(Slot::RecipientAccount),
        Some("1984573201694")
    );
}

#[tokio::test]
async fn test_bare_name_completes_transfer() {
    for (reply, expected) in [
        ("Juliette Martin", "Juliette Martin"),
        ("juliette", "Juliette"),
        ("c'est Juliette", "Juliette"),
        ("le bénéficiaire est Juliette", "Juliette"),
        ("Julie", "Julie"),
    ] {
        let assistant = assistant();
        let session = assistant.sessions().create().unwrap();
        transfer_awaiting_name(&assistant, &session.id).await;

        let decision = assistant
            .handle_turn(&session.id, reply, &user())
            .await
            .unwrap();
        assert_eq!(decision.intent(), Intent::TransferMoney, "{reply}");
        assert!(decision.requires_action(), "{reply}");
        assert_eq!(decision.parameters().text(Slot::RecipientName), Some(expected));
        assert_eq!(decision.parameters().amount(), Some(600.0));
        assert_eq!(session.summary().phase, ConversationPhase::Idle);
    }
}

#[tokio::test]
async fn test_filler_reply_is_not_a_name() {
    let assistant = assistant();
    let session = assistant.sessions().create().unwrap();
    transfer_awaiting_name(&assistant, &session.id).await;

    let decision = assistant
        .handle_turn(&session.id, "d'accord", &user())
        .await
        .unwrap();
    assert!(!decision.requires_action());
    assert!(!decision.parameters().contains(Slot::RecipientName));
    assert_eq!(session.summary().pending_intent, Some(Intent::TransferMoney));
}

#[tokio::test]
async fn test_corrected_sentence_keeps_recipient_name() {
    for name in ["Julie", "Sophie Martin", "Mounir", "Laurent"] {
        let assistant = assistant();
        let session = assistant.sessions().create().unwrap();

        let text = format!("je veux faire un virrement de 600 dt vers {name} compte 1984573201694");
        let decision = assistant
            .handle_turn(&session.id, &text, &user())
            .await
            .unwrap();
        assert_eq!(decision.intent(), Intent::TransferMoney);
        assert_eq!(decision.parameters().text(Slot::RecipientName), Some(name));
        assert!(decision.requires_action());
    }
}

#[tokio::test]
async fn test_name_lookup_answer_is_used() {
    let names = Arc::new(ScriptedNames::answering("Julie Ben Ali"));
    let assistant = assistant().with_name_lookup(names.clone());
    let session = assistant.sessions().create().unwrap();

    let decision = assistant
        .handle_turn(&session.id, "Virement de 600 dt vers Julie compte 1984573201694", &user())
        .await
        .unwrap();
    assert_eq!(decision.parameters().text(Slot::RecipientName), Some("Julie Ben Ali"));
    assert_eq!(
        names.seen.lock().as_slice(),
        &["Virement de 600 dt vers Julie compte 1984573201694".to_string()]
    );
}

#[tokio::test]
async fn test_name_lookup_skipped_without_recipient() {
    let names = Arc::new(ScriptedNames::answering("Julie"));
    let assistant = assistant().with_name_lookup(names.clone());
    let session = assistant.sessions().create().unwrap();

    let decision = assistant
        .handle_turn(&session.id, "quel est mon solde", &user())
        .await
        .unwrap();
    assert_eq!(decision.intent(), Intent::CheckBalance);
    assert!(names.seen.lock().is_empty());
}

#[tokio::test]
async fn test_name_lookup_failure_uses_heuristic() {
    let assistant = assistant().with_name_lookup(Arc::new(ScriptedNames::failing()));
    let session = assistant.sessions().create().unwrap();

    let decision = assistant
        .handle_turn(&session.id, "virement de 600 dt vers Julie compte 1984573201694", &user())
        .await
        .unwrap();
    assert_eq!(decision.parameters().text(Slot::RecipientName), Some("Julie"));
    assert!(decision.requires_action());
}

#[tokio::test]
async fn test_name_lookup_timeout_uses_heuristic() {
    let mut settings = Settings::default();
    settings.llm.name_lookup_timeout_ms = 50;
    let names = ScriptedNames::slow("Quelqu'un D'autre", Duration::from_secs(5));
    let assistant = assistant_with(&settings).with_name_lookup(Arc::new(names));
    let session = assistant.sessions().create().unwrap();
    transfer_awaiting_name(&assistant, &session.id).await;

    let decision = assistant
        .handle_turn(&session.id, "Sonia", &user())
        .await
        .unwrap();
    assert_eq!(decision.parameters().text(Slot::RecipientName), Some("Sonia"));
    assert!(decision.requires_action());
}
