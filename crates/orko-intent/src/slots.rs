//! Slot filling: resolving workflow parameters from layered sources.
//!
//! Every key seen in any source is resolved with a fixed priority:
//! intent-supplied > ambient context > domain default > template default.
//! A conflict between intent and context is never dropped silently; it is
//! surfaced as an ambiguity entry while the intent value wins. JSON `null`
//! counts as absent at every layer.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::config::WorkflowTemplate;
use crate::telemetry::TelemetrySink;
use crate::types::AmbiguousValue;

/// Built-in per-domain parameter defaults, applied between context values and
/// template defaults.
const DOMAIN_DEFAULTS: &[(&str, &[(&str, &str)])] = &[
    ("finance", &[("currency", "USD")]),
    ("logistics", &[("unit", "tons"), ("region", "global")]),
    ("hr", &[("employment_type", "full_time")]),
    ("it_ops", &[("env", "production")]),
];

fn domain_defaults_for(domain: Option<&str>) -> &'static [(&'static str, &'static str)] {
    let Some(domain) = domain else { return &[] };
    DOMAIN_DEFAULTS
        .iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, defaults)| *defaults)
        .unwrap_or(&[])
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// The resolved slot set for one workflow template.
#[derive(Debug, Clone)]
pub struct SlotFill {
    /// Every considered key, resolved or null.
    pub parameters: Map<String, Value>,
    /// Required keys that resolved to null, sorted.
    pub missing: Vec<String>,
    /// Keys where intent and context disagreed.
    pub ambiguous: BTreeMap<String, AmbiguousValue>,
    /// Completeness of required keys, penalized by ambiguity, in `[0, 1]`.
    pub confidence: f64,
}

/// Resolves template slots and reports completeness.
#[derive(Debug, Clone)]
pub struct SlotFillingEngine {
    telemetry: Arc<TelemetrySink>,
}

impl SlotFillingEngine {
    pub fn new(telemetry: Arc<TelemetrySink>) -> Self {
        Self { telemetry }
    }

    /// Fill the template's slots from intent parameters and ambient context.
    pub fn fill(
        &self,
        template: &WorkflowTemplate,
        domain: Option<&str>,
        parameters: &Map<String, Value>,
        context: &Map<String, Value>,
    ) -> SlotFill {
        let domain_defaults = domain_defaults_for(domain);

        let mut keys: BTreeSet<&str> = BTreeSet::new();
        keys.extend(template.required_parameters.iter().map(String::as_str));
        keys.extend(parameters.keys().map(String::as_str));
        keys.extend(context.keys().map(String::as_str));
        keys.extend(domain_defaults.iter().map(|(k, _)| *k));
        keys.extend(template.defaults.keys().map(String::as_str));

        let mut filled = Map::new();
        let mut missing = Vec::new();
        let mut ambiguous = BTreeMap::new();

        for key in keys {
            let iv = parameters.get(key).filter(|v| !v.is_null());
            let cv = context.get(key).filter(|v| !v.is_null());

            let resolved = match (iv, cv) {
                (Some(iv), Some(cv)) if iv != cv => {
                    ambiguous.insert(
                        key.to_string(),
                        AmbiguousValue {
                            intent_value: iv.clone(),
                            context_value: cv.clone(),
                        },
                    );
                    iv.clone()
                }
                _ => iv
                    .or(cv)
                    .cloned()
                    .or_else(|| {
                        domain_defaults
                            .iter()
                            .find(|(k, _)| *k == key)
                            .map(|(_, v)| json!(v))
                    })
                    .or_else(|| template.defaults.get(key).filter(|v| !v.is_null()).cloned())
                    .unwrap_or(Value::Null),
            };

            if resolved.is_null() && template.required_parameters.iter().any(|r| r == key) {
                missing.push(key.to_string());
            }
            filled.insert(key.to_string(), resolved);
        }

        let total_required = template.required_parameters.len().max(1);
        let completeness = 1.0 - (missing.len() as f64 / total_required as f64);
        let ambiguity_penalty = 1.0 - (ambiguous.len() as f64 * 0.1).min(0.5);
        let confidence = round3(completeness * ambiguity_penalty).clamp(0.0, 1.0);

        let fill = SlotFill {
            parameters: filled,
            missing,
            ambiguous,
            confidence,
        };
        self.emit(domain, &fill);
        fill
    }

    fn emit(&self, domain: Option<&str>, fill: &SlotFill) {
        let mut event = Map::new();
        event.insert("parameters".into(), Value::Object(fill.parameters.clone()));
        event.insert("missing".into(), json!(fill.missing));
        event.insert(
            "ambiguous".into(),
            serde_json::to_value(&fill.ambiguous).unwrap_or(Value::Null),
        );
        event.insert("domain".into(), json!(domain));
        event.insert("confidence".into(), json!(fill.confidence));
        self.telemetry.record("slot_filling", event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
