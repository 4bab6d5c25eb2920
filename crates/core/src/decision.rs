//! The uniform response envelope returned for every turn

use serde::Serialize;

use crate::error::{Error, Result};
use crate::intent::Intent;
use crate::parameters::{Parameters, Slot};

/// Reply sent when the engine cannot produce a trustworthy decision
pub const TECHNICAL_DIFFICULTY_RESPONSE: &str =
    "Je rencontre un problème technique. Pouvez-vous reformuler votre demande ?";

/// Which stage of the pipeline produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Greeting, goodbye or acknowledgment canned reply
    FastPath,
    /// Weighted pattern scoring on a fresh turn
    Rules,
    /// Slot filling of a pending intent
    Continuation,
    /// LLM fallback below the confidence floor
    Fallback,
    /// Empty input, cancellation or technical failure
    Guard,
}

impl DecisionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionSource::FastPath => "fast_path",
            DecisionSource::Rules => "rules",
            DecisionSource::Continuation => "continuation",
            DecisionSource::Fallback => "fallback",
            DecisionSource::Guard => "guard",
        }
    }
}

/// Spelling corrections applied to the user text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionInfo {
    pub original: String,
    pub corrected: String,
}

/// Intent decision envelope.
///
/// Fields are private: a decision is validated when built and never
/// changes afterwards. `requires_action` always implies `action_type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentDecision {
    intent: Intent,
    confidence: f32,
    response: String,
    parameters: Parameters,
    requires_action: bool,
    action_type: Option<Intent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing: Vec<Slot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    source: DecisionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    correction: Option<CorrectionInfo>,
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

impl IntentDecision {
    /// A reply that does not trigger any banking action
    pub fn reply(intent: Intent, confidence: f32, response: impl Into<String>) -> Self {
        Self {
            intent,
            confidence: clamp_confidence(confidence),
            response: response.into(),
            parameters: Parameters::new(),
            requires_action: false,
            action_type: None,
            missing: Vec::new(),
            warnings: Vec::new(),
            source: DecisionSource::Rules,
            correction: None,
        }
    }

    /// A complete request ready to be handed to banking execution
    pub fn action(
        intent: Intent,
        confidence: f32,
        response: impl Into<String>,
        parameters: Parameters,
    ) -> Self {
        Self {
            parameters,
            requires_action: true,
            action_type: Some(intent),
            ..Self::reply(intent, confidence, response)
        }
    }

    /// An incomplete request waiting for more slots
    pub fn incomplete(
        intent: Intent,
        confidence: f32,
        response: impl Into<String>,
        parameters: Parameters,
        missing: Vec<Slot>,
    ) -> Self {
        Self {
            parameters,
            missing,
            ..Self::reply(intent, confidence, response)
        }
    }

    /// Decision returned on any internal failure
    pub fn technical_error() -> Self {
        Self::reply(Intent::Error, 0.0, TECHNICAL_DIFFICULTY_RESPONSE)
            .with_source(DecisionSource::Guard)
    }

    /// Build from untrusted parts (e.g. an LLM envelope), checking invariants
    pub fn from_parts(
        intent: Intent,
        confidence: f32,
        response: impl Into<String>,
        parameters: Parameters,
        requires_action: bool,
        action_type: Option<Intent>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidDecision(format!(
                "confidence {confidence} outside [0, 1]"
            )));
        }
        if requires_action && action_type.is_none() {
            return Err(Error::InvalidDecision(
                "requires_action without action_type".to_string(),
            ));
        }
        let response = response.into();
        if response.trim().is_empty() {
            return Err(Error::InvalidDecision("empty response".to_string()));
        }
        Ok(Self {
            intent,
            confidence,
            response,
            parameters,
            requires_action,
            action_type,
            missing: Vec::new(),
            warnings: Vec::new(),
            source: DecisionSource::Fallback,
            correction: None,
        })
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_source(mut self, source: DecisionSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_correction(mut self, correction: Option<CorrectionInfo>) -> Self {
        self.correction = correction;
        self
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn requires_action(&self) -> bool {
        self.requires_action
    }

    pub fn action_type(&self) -> Option<Intent> {
        self.action_type
    }

    pub fn missing(&self) -> &[Slot] {
        &self.missing
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn source(&self) -> DecisionSource {
        self.source
    }

    pub fn correction(&self) -> Option<&CorrectionInfo> {
        self.correction.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_sets_action_type() {
        let decision = IntentDecision::action(
            Intent::CheckBalance,
            0.9,
            "Je consulte le solde de votre compte principal...",
            Parameters::new(),
        );
        assert!(decision.requires_action());
        assert_eq!(decision.action_type(), Some(Intent::CheckBalance));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let decision = IntentDecision::reply(Intent::Greeting, 1.7, "Bonjour");
        assert_eq!(decision.confidence(), 1.0);
        let decision = IntentDecision::reply(Intent::Greeting, f32::NAN, "Bonjour");
        assert_eq!(decision.confidence(), 0.0);
    }

    #[test]
    fn test_from_parts_rejects_action_without_type() {
        let result = IntentDecision::from_parts(
            Intent::TransferMoney,
            0.8,
            "ok",
            Parameters::new(),
            true,
            None,
        );
        assert!(result.is_err());

        let result = IntentDecision::from_parts(
            Intent::Greeting,
            1.2,
            "ok",
            Parameters::new(),
            false,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_technical_error_envelope() {
        let decision = IntentDecision::technical_error();
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["intent"], "error");
        assert_eq!(json["confidence"], 0.0);
        assert_eq!(json["requires_action"], false);
        assert!(json["action_type"].is_null());
        assert_eq!(json["response"], TECHNICAL_DIFFICULTY_RESPONSE);
        assert!(json.get("missing").is_none());
    }
}
