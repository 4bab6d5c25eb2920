//! LLM envelope parsing
//!
//! The model is asked for a bare JSON object but often wraps it in prose or
//! a markdown fence. Candidates are tried in order:
//!
//! 1. the whole reply
//! 2. the first fenced ```` ```json ```` block
//! 3. the first balanced `{...}` object
//!
//! The first candidate that parses is validated against [`envelope_schema`]
//! and converted into an [`IntentDecision`]. Parameters are mapped onto the
//! known slots; unknown keys and ill-typed values are dropped.

use chrono::{DateTime, FixedOffset, NaiveDate};
use jsonschema::JSONSchema;
use serde_json::{json, Map, Value};

use bank_assistant_core::{Frequency, Intent, IntentDecision, Parameters, Slot, SlotValue};

use crate::LlmError;

/// JSON Schema every envelope must satisfy
pub fn envelope_schema() -> Value {
    let intents: Vec<&str> = Intent::ALL.iter().map(|i| i.as_str()).collect();
    let actions: Vec<&str> = Intent::ALL
        .iter()
        .filter(|i| i.is_banking_action())
        .map(|i| i.as_str())
        .collect();

    json!({
        "type": "object",
        "required": ["intent", "confidence", "response", "requires_action"],
        "properties": {
            "intent": { "type": "string", "enum": intents },
            "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
            "response": { "type": "string", "minLength": 1 },
            "parameters": { "type": ["object", "null"] },
            "requires_action": { "type": "boolean" },
            "action_type": {
                "anyOf": [
                    { "type": "null" },
                    { "type": "string", "enum": actions }
                ]
            }
        }
    })
}

/// Parses and validates raw model output
pub struct EnvelopeParser {
    schema: JSONSchema,
    offset: FixedOffset,
}

impl EnvelopeParser {
    /// `offset` anchors bare `YYYY-MM-DD` dates
    pub fn new(offset: FixedOffset) -> Result<Self, LlmError> {
        let schema = envelope_schema();
        let compiled = JSONSchema::compile(&schema)
            .map_err(|e| LlmError::Configuration(format!("envelope schema: {}", e)))?;
        Ok(Self {
            schema: compiled,
            offset,
        })
    }

    pub fn parse(&self, raw: &str) -> Result<IntentDecision, LlmError> {
        let mut value = extract_json(raw).ok_or_else(|| {
            LlmError::InvalidResponse(format!("no JSON object in reply ({} chars)", raw.len()))
        })?;
        normalize_action_type(&mut value);

        if let Err(errors) = self.schema.validate(&value) {
            let details: Vec<String> = errors
                .map(|e| format!("{}: {}", e.instance_path, e))
                .collect();
            return Err(LlmError::NonConforming(details.join("; ")));
        }

        // The schema guarantees the shape of the fields read below
        let intent = str_field(&value, "intent")
            .parse::<Intent>()
            .map_err(|e| LlmError::NonConforming(e.to_string()))?;
        let action_type = match value.get("action_type").and_then(Value::as_str) {
            Some(action) => Some(
                action
                    .parse::<Intent>()
                    .map_err(|e| LlmError::NonConforming(e.to_string()))?,
            ),
            None => None,
        };
        if let Some(action) = action_type {
            if action != intent {
                return Err(LlmError::NonConforming(format!(
                    "action_type {} differs from intent {}",
                    action, intent
                )));
            }
        }

        let confidence = value
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or_default() as f32;
        let requires_action = value
            .get("requires_action")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let parameters = match value.get("parameters") {
            Some(Value::Object(map)) => self.map_parameters(map),
            _ => Parameters::new(),
        };

        IntentDecision::from_parts(
            intent,
            confidence,
            str_field(&value, "response").trim(),
            parameters,
            requires_action,
            action_type,
        )
        .map_err(|e| LlmError::NonConforming(e.to_string()))
    }

    /// Keep known slots with a usable value
    pub fn map_parameters(&self, map: &Map<String, Value>) -> Parameters {
        let mut params = Parameters::new();
        for (key, value) in map {
            let Ok(slot) = key.parse::<Slot>() else {
                tracing::debug!(key = %key, "Dropping unknown LLM parameter");
                continue;
            };
            if slot == Slot::RecipientOrService || value.is_null() {
                continue;
            }
            match self.slot_value(slot, value) {
                Some(v) => params.insert(slot, v),
                None => tracing::debug!(slot = %slot, value = %value, "Dropping ill-typed LLM parameter"),
            }
        }
        params
    }

    fn slot_value(&self, slot: Slot, value: &Value) -> Option<SlotValue> {
        match slot {
            Slot::Amount => number(value).map(SlotValue::Number),
            Slot::ExactDate | Slot::Limit => integer(value).map(SlotValue::Integer),
            Slot::Frequency => value
                .as_str()
                .and_then(|s| s.parse::<Frequency>().ok())
                .map(SlotValue::Frequency),
            Slot::StartDate | Slot::EndDate => value
                .as_str()
                .and_then(|s| self.timestamp(s))
                .map(SlotValue::Timestamp),
            Slot::IsServicePayment
            | Slot::IsKnownService
            | Slot::UserRequestedCount
            | Slot::SpecificDate => value.as_bool().map(SlotValue::Flag),
            Slot::RecipientAccount | Slot::AccountNumber | Slot::BillNumber => match value {
                Value::String(s) => non_empty(s.chars().filter(|c| !c.is_whitespace()).collect()),
                Value::Number(n) if n.is_u64() => Some(SlotValue::Text(n.to_string())),
                _ => None,
            },
            _ => value.as_str().and_then(|s| non_empty(s.trim().to_string())),
        }
    }

    fn timestamp(&self, text: &str) -> Option<DateTime<FixedOffset>> {
        let text = text.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
            return Some(ts);
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?
            .and_local_timezone(self.offset)
            .single()
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn non_empty(text: String) -> Option<SlotValue> {
    (!text.is_empty()).then_some(SlotValue::Text(text))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
                .collect();
            cleaned.replace(',', ".").parse().ok()
        }
        _ => None,
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Models write "", "none" or "null" for a missing action
fn normalize_action_type(value: &mut Value) {
    if let Some(action) = value.get_mut("action_type") {
        let empty = action
            .as_str()
            .map(|s| matches!(s.trim().to_lowercase().as_str(), "" | "none" | "null"))
            .unwrap_or(false);
        if empty {
            *action = Value::Null;
        }
    }
}

/// First JSON object found in a model reply
pub fn extract_json(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    parse_object(raw)
        .or_else(|| fenced_block(raw).and_then(parse_object))
        .or_else(|| balanced_object(raw).and_then(parse_object))
}

fn parse_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text.trim())
        .ok()
        .filter(Value::is_object)
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let header = after[..body_start].trim();
    if !header.is_empty() && !header.eq_ignore_ascii_case("json") {
        return None;
    }
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
