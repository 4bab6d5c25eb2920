//! [`LlmFallback`] implementation over an [`LlmBackend`]

use async_trait::async_trait;
use chrono::FixedOffset;
use std::sync::Arc;

use bank_assistant_config::LlmSettings;
use bank_assistant_core::{IntentDecision, LlmFallback, Turn, UserContext};

use crate::backend::{LlmBackend, LlmConfig, OllamaBackend};
use crate::envelope::EnvelopeParser;
use crate::prompt::FallbackPrompt;
use crate::LlmError;

/// Asks the model for an envelope and validates it
pub struct LlmFallbackClient {
    backend: Arc<dyn LlmBackend>,
    parser: EnvelopeParser,
}

impl LlmFallbackClient {
    pub fn new(backend: Arc<dyn LlmBackend>, offset: FixedOffset) -> Result<Self, LlmError> {
        Ok(Self {
            backend,
            parser: EnvelopeParser::new(offset)?,
        })
    }

    /// Ollama-backed client built from settings
    pub fn from_settings(settings: &LlmSettings, offset: FixedOffset) -> Result<Self, LlmError> {
        let backend = OllamaBackend::new(LlmConfig::from(settings))?;
        Self::new(Arc::new(backend), offset)
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    async fn ask(
        &self,
        normalized_text: &str,
        transcript: &[Turn],
        user: &UserContext,
    ) -> Result<IntentDecision, LlmError> {
        let messages = FallbackPrompt::new()
            .system_prompt(user)
            .history(transcript)
            .user_message(normalized_text)
            .build();

        let raw = self.backend.generate(&messages).await?;
        let decision = self.parser.parse(&raw)?;

        tracing::debug!(
            model = %self.backend.model_name(),
            intent = %decision.intent(),
            confidence = decision.confidence(),
            requires_action = decision.requires_action(),
            "LLM envelope accepted"
        );
        Ok(decision)
    }
}

#[async_trait]
impl LlmFallback for LlmFallbackClient {
    async fn decide(
        &self,
        normalized_text: &str,
        transcript: &[Turn],
        user: &UserContext,
    ) -> bank_assistant_core::Result<IntentDecision> {
        self.ask(normalized_text, transcript, user)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "LLM fallback failed");
                e.into()
            })
    }

    async fn is_available(&self) -> bool {
        self.backend.is_available().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{Message, Role};
    use bank_assistant_core::{DecisionSource, Intent};
    use std::sync::Mutex;

    struct ScriptedBackend {
        reply: Result<String, ()>,
        seen: Mutex<Vec<Message>>,
    }

    impl ScriptedBackend {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn generate(&self, messages: &[Message]) -> Result<String, LlmError> {
            *self.seen.lock().unwrap() = messages.to_vec();
            self.reply
                .clone()
                .map_err(|_| LlmError::Network("connection refused".into()))
        }

        async fn is_available(&self) -> bool {
            self.reply.is_ok()
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    #[tokio::test]
    async fn test_decide_accepts_valid_envelope() {
        let backend = Arc::new(ScriptedBackend::replying(
            r#"{"intent": "general_inquiry", "confidence": 0.7, "response": "Nos agences ouvrent à 8h.", "parameters": {}, "requires_action": false, "action_type": null}"#,
        ));
        let client = LlmFallbackClient::new(backend.clone(), offset()).unwrap();

        let transcript = vec![Turn::user("bonjour"), Turn::assistant("Bonjour !")];
        let decision = client
            .decide("a quelle heure ouvre l'agence", &transcript, &UserContext::new("1"))
            .await
            .unwrap();

        assert_eq!(decision.intent(), Intent::GeneralInquiry);
        assert_eq!(decision.source(), DecisionSource::Fallback);
        assert!(client.is_available().await);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].role, Role::System);
        assert_eq!(seen[3].content, "a quelle heure ouvre l'agence");
    }

    #[tokio::test]
    async fn test_decide_rejects_prose() {
        let client = LlmFallbackClient::new(
            Arc::new(ScriptedBackend::replying("Désolé, je ne comprends pas.")),
            offset(),
        )
        .unwrap();
        let err = client
            .decide("xyz", &[], &UserContext::new("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, bank_assistant_core::Error::Llm(_)));
    }

    #[tokio::test]
    async fn test_backend_failure_is_reported() {
        let backend = Arc::new(ScriptedBackend {
            reply: Err(()),
            seen: Mutex::new(Vec::new()),
        });
        let client = LlmFallbackClient::new(backend, offset()).unwrap();
        assert!(!client.is_available().await);
        assert!(client.decide("xyz", &[], &UserContext::new("1")).await.is_err());
    }
}
