//! PII masking for logged reasoning traces.
//!
//! Reasoning traces are free-form model output and may quote user text, so
//! they are scrubbed before persistence. The ID rule is case-insensitive and
//! also hits ordinary long words; traces are internal artifacts and tolerate
//! the over-masking.

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{IntentError, Result};

const EMAIL_PATTERN: &str = r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}";
const PHONE_PATTERN: &str = r"\+?\d[\d\- ]{7,}\d";
const ID_PATTERN: &str = r"(?i)\b[A-Z0-9]{6,}\b";
const NAME_PATTERN: &str = r"\b([A-Z][a-z]{2,})(\s+[A-Z][a-z]{2,})?\b";

const EMAIL_TOKEN: &str = "[EMAIL_MASKED]";
const PHONE_TOKEN: &str = "[PHONE_MASKED]";
const ID_TOKEN: &str = "[ID_MASKED]";
const NAME_TOKEN: &str = "[NAME_MASKED]";

/// Masks emails, phone numbers, ID-like tokens and capitalized name pairs.
///
/// Rule order matters: emails first (their local parts would otherwise be
/// shredded by the ID rule), then phones, IDs, names.
#[derive(Debug, Clone)]
pub struct PiiMasker {
    email: Regex,
    phone: Regex,
    id: Regex,
    name: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| IntentError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

impl PiiMasker {
    pub fn new() -> Result<Self> {
        Ok(Self {
            email: compile(EMAIL_PATTERN)?,
            phone: compile(PHONE_PATTERN)?,
            id: compile(ID_PATTERN)?,
            name: compile(NAME_PATTERN)?,
        })
    }

    /// Replace every PII match in a string with its mask token.
    pub fn mask_text(&self, text: &str) -> String {
        let masked = self.email.replace_all(text, EMAIL_TOKEN);
        let masked = self.phone.replace_all(&masked, PHONE_TOKEN);
        let masked = self.id.replace_all(&masked, ID_TOKEN);
        let masked = self.name.replace_all(&masked, NAME_TOKEN);
        masked.into_owned()
    }

    /// Mask a nested reasoning trace.
    ///
    /// Objects are walked recursively; strings inside objects and lists are
    /// masked, other primitives pass through. A non-object at the top level
    /// is returned unchanged.
    pub fn mask_reasoning(&self, reasoning: &Value) -> Value {
        let Value::Object(map) = reasoning else {
            return reasoning.clone();
        };

        let mut masked = Map::new();
        for (key, value) in map {
            let replacement = match value {
                Value::String(text) => Value::String(self.mask_text(text)),
                Value::Object(_) => self.mask_reasoning(value),
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::String(text) => Value::String(self.mask_text(text)),
                            Value::Object(_) => self.mask_reasoning(item),
                            other => other.clone(),
                        })
                        .collect(),
                ),
                other => other.clone(),
            };
            masked.insert(key.clone(), replacement);
        }
        Value::Object(masked)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
