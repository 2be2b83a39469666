//! Core types for the parsing pipeline.
//!
//! These types model the data flowing from raw command text to a canonical,
//! guardrail-tagged intent and on to workflow mapping.  The parse result is a
//! typed record rather than a free-form map: only [`ParsedIntent::parameters`]
//! and [`IntentContext::extra`] are open string-keyed maps, because their
//! content is inherently caller-defined.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Risk tiers
// ---------------------------------------------------------------------------

/// Advisory risk tier attached to a parsed command.
///
/// Risk never blocks parsing itself; it only informs downstream execution
/// (confirmation prompts, admin routing, blocked-action workflows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// The action is on the allowed list.
    Low,
    /// The action is not registered in any list.
    Medium,
    /// The action is on the risky list.
    High,
    /// The action is on the blocked list.
    Blocked,
}

impl RiskLevel {
    /// The wire representation used in logs and telemetry.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Prompt version tag
// ---------------------------------------------------------------------------

/// Version of the prompt content that was active for the parsed domain.
///
/// Stamped onto every parse so that evaluation regressions can be correlated
/// with prompt changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptVersionTag {
    /// Monotonically increased by hand whenever the domain's exemplars or
    /// prompt rules change.
    #[serde(default = "default_prompt_version")]
    pub version: u32,

    /// ISO-8601 date of the last change; empty when never recorded.
    #[serde(default)]
    pub updated_at: String,
}

fn default_prompt_version() -> u32 {
    1
}

impl Default for PromptVersionTag {
    fn default() -> Self {
        Self {
            version: default_prompt_version(),
            updated_at: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Intent context
// ---------------------------------------------------------------------------

/// Typed context record carried on every [`ParsedIntent`].
///
/// Engine-owned fields (risk, confirmation, fallback markers) are written by
/// the pipeline stages after inbound context has been merged, so callers
/// cannot spoof them through the open [`IntentContext::extra`] map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentContext {
    /// Model (or fallback) confidence, clamped to `[0, 1]` by the engine.
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    /// Advisory safety flags, deduplicated and order-preserving.
    #[serde(default)]
    pub guardrail_flags: Vec<String>,

    /// Risk tier assigned by the guardrail engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,

    /// Whether downstream execution should ask for confirmation.
    #[serde(default)]
    pub requires_confirmation: bool,

    /// Whether downstream execution requires elevated privileges.
    #[serde(default)]
    pub requires_admin: bool,

    /// Whether the heuristic fallback parser produced this result.
    #[serde(default)]
    pub used_fallback_parser: bool,

    /// Set when the model output could not be decoded as JSON.
    #[serde(default, skip_serializing_if = "is_false")]
    pub parse_error: bool,

    /// Prompt version active for the resolved domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_version: Option<PromptVersionTag>,

    /// Open extension map: inbound hints (`domain`, `user_id`), reasoning
    /// traces, and anything else callers attach.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl Default for IntentContext {
    fn default() -> Self {
        Self {
            confidence: default_confidence(),
            guardrail_flags: Vec::new(),
            risk_level: None,
            requires_confirmation: false,
            requires_admin: false,
            used_fallback_parser: false,
            parse_error: false,
            prompt_version: None,
            extra: Map::new(),
        }
    }
}

impl IntentContext {
    /// Append a guardrail flag unless it is already present.
    pub fn add_flag(&mut self, flag: impl Into<String>) {
        let flag = flag.into();
        if !self.guardrail_flags.iter().any(|f| f == &flag) {
            self.guardrail_flags.push(flag);
        }
    }

    /// Merge an inbound context map into this record, inbound values winning
    /// on collision.
    ///
    /// Keys matching typed fields are routed to those fields (leniently for
    /// `confidence`); everything else lands in [`IntentContext::extra`].
    /// Engine-owned fields are set by the pipeline after this merge and
    /// therefore always win.
    pub fn merge_inbound(&mut self, inbound: &Map<String, Value>) {
        for (key, value) in inbound {
            match key.as_str() {
                "confidence" => {
                    if let Some(conf) = lenient_f64(value) {
                        self.confidence = conf;
                    }
                }
                "guardrail_flags" => {
                    if let Some(items) = value.as_array() {
                        self.guardrail_flags = items
                            .iter()
                            .map(|item| match item.as_str() {
                                Some(s) => s.to_string(),
                                None => item.to_string(),
                            })
                            .collect();
                    }
                }
                "risk_level" => {
                    if let Ok(level) = serde_json::from_value::<Option<RiskLevel>>(value.clone()) {
                        self.risk_level = level;
                    }
                }
                "prompt_version" => {
                    if let Ok(tag) =
                        serde_json::from_value::<Option<PromptVersionTag>>(value.clone())
                    {
                        self.prompt_version = tag;
                    }
                }
                "parse_error" => {
                    self.parse_error = value.as_bool().unwrap_or(self.parse_error);
                }
                "used_fallback_parser" => {
                    self.used_fallback_parser =
                        value.as_bool().unwrap_or(self.used_fallback_parser);
                }
                "requires_confirmation" => {
                    self.requires_confirmation =
                        value.as_bool().unwrap_or(self.requires_confirmation);
                }
                "requires_admin" => {
                    self.requires_admin = value.as_bool().unwrap_or(self.requires_admin);
                }
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

fn default_confidence() -> f64 {
    1.0
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Read a number from JSON leniently: accepts numbers and numeric strings,
/// the way upstream model output tends to arrive.
pub(crate) fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Clamp a confidence into `[0.0, 1.0]`; NaN maps to full confidence like
/// other unparseable input.
pub(crate) fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        1.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Parsed intent
// ---------------------------------------------------------------------------

/// A fully parsed command: the canonical `(domain, action, parameters)`
/// triple plus audit context.
///
/// Immutable once returned by the engine; persisted verbatim (reasoning
/// masked) to the parse log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedIntent {
    /// The original command text, echoed for audit.
    pub raw_text: String,

    /// Canonical business domain, `None` when undeterminable.
    pub domain: Option<String>,

    /// Canonical action within the domain, `None` when undeterminable.
    pub action: Option<String>,

    /// Extracted parameters.  Always a map, never null.
    #[serde(default)]
    pub parameters: Map<String, Value>,

    /// Typed audit context.
    #[serde(default)]
    pub context: IntentContext,
}

impl ParsedIntent {
    /// Create an empty intent for the given command text.
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            domain: None,
            action: None,
            parameters: Map::new(),
            context: IntentContext::default(),
        }
    }

    /// True when neither a domain nor an action was produced.
    pub fn is_empty_intent(&self) -> bool {
        none_or_blank(&self.domain) && none_or_blank(&self.action)
    }
}

fn none_or_blank(v: &Option<String>) -> bool {
    v.as_deref().is_none_or(|s| s.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Parse outcome
// ---------------------------------------------------------------------------

/// Why the primary parser output was rejected in favor of the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The completion collaborator itself failed.
    CompletionFailed(String),
    /// The model answered but the answer was not decodable JSON.
    ParseError,
    /// The model answered with neither a domain nor an action.
    EmptyIntent,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::CompletionFailed(reason) => {
                write!(f, "completion failed: {reason}")
            }
            FallbackReason::ParseError => f.write_str("model output was not decodable"),
            FallbackReason::EmptyIntent => f.write_str("model produced neither domain nor action"),
        }
    }
}

/// The classified result of the primary parse attempt.
///
/// The engine never surfaces an unusable model output to callers; it is
/// converted into a [`ParseOutcome::Fallback`] and recovered heuristically.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    /// The primary parser produced something worth keeping.
    Usable(ParsedIntent),
    /// The primary output is unusable; the fallback parser must run.
    Fallback(FallbackReason),
}

impl ParseOutcome {
    /// Classify a raw-parser result.
    ///
    /// Unusable iff the call failed, the parse-error marker is set, or
    /// domain and action are both missing.
    pub fn from_result(result: Result<ParsedIntent>) -> Self {
        match result {
            Err(err) => ParseOutcome::Fallback(FallbackReason::CompletionFailed(err.to_string())),
            Ok(parsed) if parsed.context.parse_error => {
                ParseOutcome::Fallback(FallbackReason::ParseError)
            }
            Ok(parsed) if parsed.is_empty_intent() => {
                ParseOutcome::Fallback(FallbackReason::EmptyIntent)
            }
            Ok(parsed) => ParseOutcome::Usable(parsed),
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow mapping
// ---------------------------------------------------------------------------

/// The canonical intent handed to the mapper.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowIntent {
    /// Intent key, `"{domain}.{action}"` by convention.
    pub name: String,

    /// Canonical domain, used for key resolution and domain defaults.
    pub domain: Option<String>,

    /// Parameters extracted by the parser.
    pub parameters: Map<String, Value>,

    /// Risk tier from the guardrail engine, drives workflow routing.
    pub risk_level: Option<RiskLevel>,

    /// Elevated-privilege marker from the risk policy.
    pub requires_admin: bool,
}

/// A slot value that was supplied both by the intent and the ambient context
/// with different values.  The intent value wins; the conflict is surfaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguousValue {
    /// Value extracted from the command itself.
    pub intent_value: Value,
    /// Conflicting value from the ambient context.
    pub context_value: Value,
}

/// Result of resolving an intent against a workflow template.
#[derive(Debug, Clone, Serialize)]
pub struct MappedIntent {
    /// Selected workflow, after guardrail routing overrides.
    pub workflow_name: String,

    /// Fully resolved parameter set (unresolved required keys map to null).
    pub parameters: Map<String, Value>,

    /// Required parameters that could not be resolved from any source.
    pub missing: Vec<String>,

    /// Parameters with conflicting intent/context values.
    pub ambiguous: BTreeMap<String, AmbiguousValue>,

    /// Mapping confidence in `[0, 1]`: completeness penalized by ambiguity.
    pub confidence: f64,

    /// Mapper result-format version.
    pub version: String,
}

impl MappedIntent {
    /// Reduce to the dispatch shape consumed by the workflow layer.
    pub fn into_binding(self) -> WorkflowBinding {
        WorkflowBinding {
            workflow_name: self.workflow_name,
            parameters: self.parameters,
            missing: self.missing,
            ambiguous: self.ambiguous,
        }
    }
}

/// The minimal dispatch record handed to the (external) workflow runner.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowBinding {
    /// Selected workflow name.
    pub workflow_name: String,
    /// Resolved parameters.
    pub parameters: Map<String, Value>,
    /// Unresolved required parameters.
    pub missing: Vec<String>,
    /// Conflicting parameters, keyed by name.
    pub ambiguous: BTreeMap<String, AmbiguousValue>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
