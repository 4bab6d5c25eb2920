//! Recipient-name lookup over an [`LlmBackend`]
//!
//! The model is asked for the bare name or `NONE`, with few-shot examples.
//! Only the first line of the answer is kept; the caller sanitizes it.

use async_trait::async_trait;
use std::sync::Arc;

use bank_assistant_config::LlmSettings;
use bank_assistant_core::NameLookup;

use crate::backend::{LlmBackend, LlmConfig, OllamaBackend};
use crate::prompt::Message;
use crate::LlmError;

const NAME_PROMPT: &str = r#"Tu es un extracteur de texte.
Tâche : identifier un nom de bénéficiaire dans une phrase.
Règles :
- Si un nom de personne existe, réponds uniquement par ce nom.
- Si aucun nom n'existe, réponds exactement : NONE.
- Ne réponds jamais avec une phrase ou une explication.

Exemples :
Texte: "je veux effectuer un virement"
Réponse: NONE

Texte: "destinataire Juliette avec numéro de compte 1984573201694"
Réponse: Juliette

Texte: "vers Raouf Sahli numéro de compte 0012345678901"
Réponse: Raouf Sahli

Texte: "à mon frère"
Réponse: NONE"#;

pub struct LlmNameLookup {
    backend: Arc<dyn LlmBackend>,
}

impl LlmNameLookup {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    /// Ollama-backed lookup built from settings
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let backend = OllamaBackend::new(LlmConfig::from(settings))?;
        Ok(Self::new(Arc::new(backend)))
    }

    fn messages(text: &str) -> Vec<Message> {
        vec![
            Message::system(NAME_PROMPT),
            Message::user(format!("Texte à analyser: \"{}\"\nRéponse:", text.trim())),
        ]
    }

    async fn ask(&self, text: &str) -> Result<String, LlmError> {
        let raw = self.backend.generate_text(&Self::messages(text)).await?;
        let answer = raw
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("NONE");
        let answer = answer
            .strip_prefix("Réponse:")
            .or_else(|| answer.strip_prefix("Reponse:"))
            .unwrap_or(answer)
            .trim()
            .trim_matches('"');
        tracing::debug!(
            model = %self.backend.model_name(),
            answer = %answer,
            "Name lookup answered"
        );
        Ok(answer.to_string())
    }
}

#[async_trait]
impl NameLookup for LlmNameLookup {
    async fn lookup_name(&self, text: &str) -> bank_assistant_core::Result<String> {
        self.ask(text).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Role;
    use std::sync::Mutex;

    struct TextBackend {
        reply: Option<&'static str>,
        seen: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl LlmBackend for TextBackend {
        async fn generate(&self, _messages: &[Message]) -> Result<String, LlmError> {
            Err(LlmError::Api("json output not expected".into()))
        }

        async fn generate_text(&self, messages: &[Message]) -> Result<String, LlmError> {
            *self.seen.lock().unwrap() = messages.to_vec();
            self.reply
                .map(str::to_string)
                .ok_or_else(|| LlmError::Network("connection refused".into()))
        }

        async fn is_available(&self) -> bool {
            self.reply.is_some()
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn lookup(reply: Option<&'static str>) -> (LlmNameLookup, Arc<TextBackend>) {
        let backend = Arc::new(TextBackend {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        (LlmNameLookup::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_first_line_is_the_answer() {
        let (names, backend) = lookup(Some("\n  Julie Dupont\nC'est le nom trouvé."));
        let answer = names.lookup_name("vers julie dupont").await.unwrap();
        assert_eq!(answer, "Julie Dupont");

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].role, Role::System);
        assert!(seen[0].content.contains("NONE"));
        assert!(seen[1].content.contains("\"vers julie dupont\""));
    }

    #[tokio::test]
    async fn test_answer_prefix_and_quotes_are_dropped() {
        let (names, _) = lookup(Some("Réponse: \"Sonia\""));
        assert_eq!(names.lookup_name("pour sonia").await.unwrap(), "Sonia");
    }

    #[tokio::test]
    async fn test_empty_answer_means_none() {
        let (names, _) = lookup(Some("   "));
        assert_eq!(names.lookup_name("virement").await.unwrap(), "NONE");
    }

    #[tokio::test]
    async fn test_backend_failure_is_an_error() {
        let (names, _) = lookup(None);
        let err = names.lookup_name("vers julie").await.unwrap_err();
        assert!(matches!(err, bank_assistant_core::Error::Llm(_)));
    }
}
