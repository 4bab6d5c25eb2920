//! Prompt Building
//!
//! Constructs the fallback prompt: a French system message describing the
//! envelope, the caller context, the recent transcript, then the message.

use serde::{Deserialize, Serialize};
use std::fmt;

use bank_assistant_core::{Intent, Turn, TurnRole, UserContext};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

const SYSTEM_PROMPT: &str = r#"Tu es l'assistant bancaire virtuel d'Amen Bank (Tunisie).

Tes capacités :
- Consulter le solde d'un compte
- Lister les comptes du client
- Préparer des virements
- Préparer des paiements de factures
- Configurer des paiements récurrents
- Consulter l'historique des transactions
- Répondre aux questions bancaires générales

Tu ne dois JAMAIS affirmer qu'une opération a été effectuée : tu prépares
seulement la demande.

Réponds UNIQUEMENT avec un objet JSON valide, sans texte autour :
{
  "intent": "<intention>",
  "confidence": <nombre entre 0 et 1>,
  "response": "<réponse courte en français>",
  "parameters": {
    "amount": <montant numérique>,
    "recipient_account": "<13 ou 20 chiffres>",
    "recipient_name": "<nom du bénéficiaire>",
    "merchant": "<fournisseur>",
    "bill_number": "<numéro de facture>",
    "frequency": "<daily|weekly|monthly|quarterly|semestrially|yearly>"
  },
  "requires_action": <true|false>,
  "action_type": "<action ou null>"
}

N'inclus dans "parameters" que les valeurs présentes dans le message.
"requires_action" vaut true uniquement si toutes les informations
nécessaires sont connues ; "action_type" est alors égal à "intent"."#;

fn intents_line() -> String {
    let intents: Vec<&str> = Intent::ALL
        .iter()
        .filter(|i| **i != Intent::Error)
        .map(|i| i.as_str())
        .collect();
    let actions: Vec<&str> = Intent::ALL
        .iter()
        .filter(|i| i.is_banking_action())
        .map(|i| i.as_str())
        .collect();
    format!(
        "Intentions disponibles : {}\nActions disponibles : {}",
        intents.join(", "),
        actions.join(", ")
    )
}

/// Builder for the fallback conversation
#[derive(Debug, Default)]
pub struct FallbackPrompt {
    messages: Vec<Message>,
}

impl FallbackPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// System instructions plus the caller context
    pub fn system_prompt(mut self, user: &UserContext) -> Self {
        let mut system = format!("{}\n\n{}", SYSTEM_PROMPT, intents_line());

        let mut context = Vec::new();
        if let Some(name) = user.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            context.push(format!("Client : {}", name.trim()));
        }
        if user.has_accounts() {
            context.push(format!("Nombre de comptes : {}", user.accounts.len()));
        }
        if let Some(primary) = user.primary_account() {
            context.push(format!(
                "Compte principal : {} ({})",
                primary.account_number, primary.currency
            ));
        }
        if !context.is_empty() {
            system.push_str("\n\nContexte :\n");
            system.push_str(&context.join("\n"));
        }

        self.messages.push(Message::system(system));
        self
    }

    /// Replay the recent transcript, oldest first
    pub fn history(mut self, transcript: &[Turn]) -> Self {
        self.messages.extend(
            transcript
                .iter()
                .filter(|t| !t.content.trim().is_empty())
                .map(|t| Message {
                    role: t.role.into(),
                    content: t.content.clone(),
                }),
        );
        self
    }

    pub fn user_message(mut self, text: &str) -> Self {
        self.messages.push(Message::user(text));
        self
    }

    pub fn build(self) -> Vec<Message> {
        self.messages
    }
}
