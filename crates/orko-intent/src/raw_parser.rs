//! Semi-strict, cross-domain command parser.
//!
//! The parser shows the model worked exemplars from ALL configured domains
//! rather than only a guessed one, and any caller-supplied domain is a soft
//! hint the model may override. Unknown actions and parameters are kept
//! fuzzy so the canonicalizer can repair them downstream; the semi-strict
//! catalogs derived from the exemplars (allowed actions, allowed parameter
//! names, canonical defaults) are enforced in post-processing, not in the
//! prompt.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::completion::{CompletionClient, Message};
use crate::error::Result;
use crate::registry::DomainRegistry;
use crate::types::{IntentContext, ParsedIntent, clamp_confidence, lenient_f64};

// ---------------------------------------------------------------------------
// Prompt text
// ---------------------------------------------------------------------------

/// Fixed opening of the system prompt: output contract and JSON shape.
const PROMPT_INTRO: &str = r#"You are ORKO's deterministic command parser.
You MUST output ONLY valid JSON. No explanations, no extra text.

Required JSON structure:
{
  "domain": string | null,
  "action": string | null,
  "parameters": object,
  "context": { "confidence": number }
}
"#;

/// Fixed hint-override policy.
const PROMPT_HINT_POLICY: &str = r#"IMPORTANT:
- Choose the domain based on the ACTUAL command text.
- You MAY override the soft domain hint if the text clearly belongs
  to another domain.
"#;

/// Fixed closing rules: parameters, actions, confidence, hard constraints.
const PROMPT_RULES: &str = r#"PARAMETER RULES:
- "parameters" MUST ALWAYS be a JSON object (never null, never a list).
- When using a canonical action from the examples, try to match parameter names
  from those examples exactly.
- NEVER invent parameters that are obviously unrelated to the command.
- If you are not sure about parameters, use an empty object: {}.

ACTION RULES (VERY IMPORTANT):
- You MUST ALMOST ALWAYS output a non-null "action" when any reasonable
  action can be inferred.
- Only use "action": null when it is ABSOLUTELY IMPOSSIBLE to infer any
  meaningful action.
- NEVER omit the "action" key.

CONFIDENCE RULES:
- High certainty (domain + action + parameters): confidence close to 1.0.
- Uncertain or guessed: confidence <= 0.5.

GLOBAL HARD CONSTRAINTS:
- NO natural language explanations.
- Return ONLY ONE JSON object as the entire response.
"#;

/// Guidance shown when the exemplar catalog carries no actions at all.
const PROMPT_NO_CATALOG: &str = r#"There is currently no registered canonical action list.
You MAY still propose reasonable action names, but:
- Prefer simple verbs like 'generate_report', 'create', 'list', etc.
- If you are very unsure, set "action": null and "parameters": {}.
"#;

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// First-stage parser that turns raw command text into a [`ParsedIntent`].
///
/// Output from here is not yet canonical: the engine runs canonicalization,
/// risk tagging, and fallback handling on top of it.
pub struct RawIntentParser {
    registry: Arc<DomainRegistry>,
    client: Arc<dyn CompletionClient>,
}

impl RawIntentParser {
    /// Create a parser over the given registry and completion backend.
    pub fn new(registry: Arc<DomainRegistry>, client: Arc<dyn CompletionClient>) -> Self {
        Self { registry, client }
    }

    /// Parse one command, applying the inbound ambient context.
    ///
    /// The `domain` key of the context is read as a soft hint. The reply is
    /// decoded best-effort: undecodable output degrades to a parse-error
    /// intent carrying the raw reply instead of failing the call.
    pub async fn parse(&self, command: &str, context: &Map<String, Value>) -> Result<ParsedIntent> {
        let domain_hint = context
            .get("domain")
            .and_then(Value::as_str)
            .map(str::to_string);

        // Always computed so an absolute fallback exists.
        let fallback_domain = self.registry.guess_domain(command);

        let messages = self.build_messages(command, domain_hint.as_deref())?;
        let raw_reply = self.client.complete(&messages).await?;

        debug!(
            command_len = command.len(),
            reply_len = raw_reply.len(),
            "completion reply received"
        );

        let mut intent = self.decode_reply(&raw_reply, &fallback_domain);
        intent.raw_text = command.to_string();
        intent.context.merge_inbound(context);
        self.postprocess(&mut intent, command, domain_hint.as_deref());

        Ok(intent)
    }

    // -----------------------------------------------------------------------
    // Prompt building
    // -----------------------------------------------------------------------

    /// Build the full conversation: system prompt, cross-domain few-shots in
    /// catalog order, then the command itself.
    fn build_messages(&self, command: &str, domain_hint: Option<&str>) -> Result<Vec<Message>> {
        let mut messages = vec![Message::system(self.build_system_prompt(domain_hint))];

        for domain in self.registry.domains() {
            for example in self.registry.examples(domain) {
                messages.push(Message::user(example.command.clone()));
                messages.push(Message::assistant(serde_json::to_string(
                    &example.expected,
                )?));
            }
        }

        messages.push(Message::user(command));
        Ok(messages)
    }

    fn build_system_prompt(&self, domain_hint: Option<&str>) -> String {
        let valid_domains = self.registry.domains().join(", ");
        let overview = self.allowed_actions_overview();

        let hint = domain_hint.unwrap_or("").trim();
        let hint_normalized = if self.registry.is_known_domain(hint) {
            hint
        } else {
            "none"
        };

        format!(
            "{PROMPT_INTRO}\n\
             Valid domains: {valid_domains}\n\
             If user context suggests a domain, it is a soft hint ONLY.\n\
             Current soft domain hint (may be \"none\"): {hint_normalized}\n\
             \n\
             {PROMPT_HINT_POLICY}\n\
             DOMAIN / ACTION GUIDANCE (ALL DOMAINS):\n\
             {overview}\n\
             {PROMPT_RULES}"
        )
    }

    /// Human-readable overview of canonical actions across all domains.
    fn allowed_actions_overview(&self) -> String {
        let mut catalog_domains: Vec<&str> =
            self.registry.domains().iter().map(String::as_str).collect();
        catalog_domains.sort_unstable();

        let mut lines: Vec<String> = Vec::new();
        for domain in catalog_domains {
            let Some(actions) = self.registry.allowed_actions(domain) else {
                continue;
            };
            let mut names: Vec<&str> = actions.iter().map(String::as_str).collect();
            names.sort_unstable();
            lines.push(format!("- {domain}: {}", names.join(", ")));
        }

        if lines.is_empty() {
            return PROMPT_NO_CATALOG.to_string();
        }

        format!(
            "When choosing an \"action\", prefer one of the known canonical actions\n\
             for the chosen domain, taken from this overview:\n\
             {}\n\
             \n\
             You SHOULD NOT invent arbitrary, unrelated action names.\n\
             However, if a close synonym is clearly appropriate (e.g. 'generate_summary'\n\
             vs 'generate_tax_summary'), you MAY use the synonym; downstream\n\
             canonicalization will map it.\n\
             If none of the canonical actions clearly applies, you MAY propose a simple,\n\
             reasonable action name or set \"action\": null and \"parameters\": {{}} AS A LAST RESORT.\n",
            lines.join("\n")
        )
    }

    // -----------------------------------------------------------------------
    // Reply decoding
    // -----------------------------------------------------------------------

    /// Decode the model reply into an intent, best-effort.
    ///
    /// Anything that is not a JSON object becomes a parse-error intent that
    /// keeps the raw reply for diagnosis; a missing `domain` key is filled
    /// with the heuristic fallback domain.
    fn decode_reply(&self, raw_reply: &str, fallback_domain: &str) -> ParsedIntent {
        let stripped = strip_code_fences(raw_reply);

        let decoded = serde_json::from_str::<Value>(stripped).ok();
        let Some(Value::Object(obj)) = decoded else {
            let mut context = IntentContext::default();
            context.parse_error = true;
            context.confidence = 0.0;
            context
                .extra
                .insert("raw".to_string(), Value::String(raw_reply.to_string()));

            return ParsedIntent {
                raw_text: String::new(),
                domain: Some(fallback_domain.to_string()),
                action: None,
                parameters: Map::new(),
                context,
            };
        };

        // A missing key falls back to the heuristic guess; an explicit null
        // stays empty so the soft hint gets a chance in post-processing.
        let domain = match obj.get("domain") {
            None => Some(fallback_domain.to_string()),
            Some(v) => v.as_str().map(str::to_string),
        };

        let action = obj
            .get("action")
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        let parameters = match obj.get("parameters") {
            Some(Value::Object(m)) => m.clone(),
            _ => Map::new(),
        };

        let context = obj
            .get("context")
            .cloned()
            .map(context_from_model)
            .unwrap_or_default();

        ParsedIntent {
            raw_text: String::new(),
            domain,
            action,
            parameters,
            context,
        }
    }

    // -----------------------------------------------------------------------
    // Post-processing (semi-strict)
    // -----------------------------------------------------------------------

    /// Enforce domain, action, and parameter constraints while keeping enough
    /// information for the canonicalizer and evaluator to work with.
    ///
    /// Unrecognized actions are NOT wiped; known canonical actions get their
    /// parameters projected onto the canonical key set, missing keys
    /// backfilled from exemplar defaults, and near-duplicate values
    /// normalized to the canonical spelling.
    fn postprocess(&self, intent: &mut ParsedIntent, command: &str, domain_hint: Option<&str>) {
        // Light domain normalization; the canonicalizer refines this further.
        let raw_domain = intent
            .domain
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| domain_hint.map(str::to_string).filter(|d| !d.is_empty()));

        // A reply with neither a domain nor an action (and no inbound hint)
        // must stay empty: the outcome classifier routes it to the heuristic
        // fallback, which sets the fallback markers. Guessing a domain here
        // would hand the caller a fabricated domain with no markers at all.
        let empty_reply = raw_domain.is_none()
            && intent
                .action
                .as_deref()
                .is_none_or(|a| a.trim().is_empty());

        intent.domain = match raw_domain {
            Some(d) if self.registry.is_known_domain(&d) => Some(d),
            _ if empty_reply => None,
            _ => {
                let guessed = self.registry.guess_domain(command);
                self.registry.is_known_domain(&guessed).then_some(guessed)
            }
        };

        match intent.action.clone().filter(|a| !a.is_empty()) {
            None => {
                // No action at all: truly unknown.
                intent.action = None;
                intent.parameters = Map::new();
                intent.context.add_flag("unknown_action");
            }
            Some(action) => {
                let domain = intent.domain.as_deref().unwrap_or("");
                let known = self
                    .registry
                    .allowed_actions(domain)
                    .is_some_and(|set| set.contains(&action));

                if known {
                    intent.parameters =
                        self.project_parameters(domain, &action, &intent.parameters);
                    intent.action = Some(action);
                } else {
                    // Unregistered action: keep it and its parameters so the
                    // canonicalizer has something to work with.
                    intent.action = Some(action);
                    intent.context.add_flag("unregistered_action");
                }
            }
        }

        intent.context.confidence = clamp_confidence(intent.context.confidence);
    }

    /// Project parameters onto the canonical key set for a known action.
    fn project_parameters(
        &self,
        domain: &str,
        action: &str,
        params: &Map<String, Value>,
    ) -> Map<String, Value> {
        let allowed_keys = match self.registry.allowed_params(domain, action) {
            Some(keys) if !keys.is_empty() => keys,
            // No knowledge about this action's parameters: keep them as-is.
            _ => return params.clone(),
        };
        let defaults = self.registry.default_params(domain, action);

        let mut filtered = Map::new();
        for key in allowed_keys {
            match params.get(key) {
                Some(value) => {
                    let out = match defaults.and_then(|d| d.get(key)) {
                        Some(default) if near_duplicate(value, default) => default.clone(),
                        _ => value.clone(),
                    };
                    filtered.insert(key.clone(), out);
                }
                None => {
                    // Missing key: backfill from exemplar defaults if available.
                    if let Some(default) = defaults.and_then(|d| d.get(key)) {
                        filtered.insert(key.clone(), default.clone());
                    }
                }
            }
        }
        filtered
    }
}

// ---------------------------------------------------------------------------
// Free helpers
// ---------------------------------------------------------------------------

/// Strip markdown code fences the model sometimes wraps JSON in.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Build a typed context from whatever the model put under `context`.
fn context_from_model(value: Value) -> IntentContext {
    let mut context = IntentContext::default();

    let obj = match value {
        Value::Object(obj) => obj,
        Value::Null => return context,
        other => {
            // Non-object context gets preserved under "value".
            context.extra.insert("value".to_string(), other);
            return context;
        }
    };

    for (key, value) in obj {
        match key.as_str() {
            "confidence" => {
                context.confidence = lenient_f64(&value).unwrap_or(1.0);
            }
            "guardrail_flags" => match value {
                Value::Array(items) => {
                    context.guardrail_flags = items.into_iter().map(flag_text).collect();
                }
                Value::Null => {}
                other => context.guardrail_flags = vec![flag_text(other)],
            },
            "parse_error" => {
                context.parse_error = value.as_bool().unwrap_or(false);
            }
            _ => {
                context.extra.insert(key, value);
            }
        }
    }

    context
}

fn flag_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Whether two parameter values are near-duplicates after normalization.
///
/// Strings compare trimmed, lowercased, with underscores and spaces removed;
/// equality or containment either way counts. Non-strings must be equal.
fn near_duplicate(value: &Value, default: &Value) -> bool {
    match (value, default) {
        (Value::String(v), Value::String(d)) => {
            let nv = norm_for_compare(v);
            let nd = norm_for_compare(d);
            nv == nd || nv.contains(&nd) || nd.contains(&nv)
        }
        _ => value == default,
    }
}

fn norm_for_compare(s: &str) -> String {
    s.trim().to_lowercase().replace(['_', ' '], "")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordIndex;
    use async_trait::async_trait;
    use serde_json::json;

    const CATALOG: &str = r#"
logistics:
  examples:
    - command: "Book a truck from Mersin to Berlin"
      expected:
        domain: logistics
        action: book_truck
        parameters:
          origin: "Mersin"
          destination: "Berlin"
finance:
  examples:
    - command: "Generate monthly cashflow report"
      expected:
        domain: finance
        action: generate_cashflow_report
        parameters:
          period: "monthly"
operations:
  examples: []
"#;

    struct StubClient {
        reply: String,
    }

    impl StubClient {
        fn new(reply: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.into(),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, _messages: &[Message]) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    fn registry() -> Arc<DomainRegistry> {
        Arc::new(DomainRegistry::from_yaml_str(CATALOG, Arc::new(KeywordIndex::new())).unwrap())
    }

    fn parser(reply: &str) -> RawIntentParser {
        RawIntentParser::new(registry(), StubClient::new(reply))
    }

    #[tokio::test]
    async fn parses_canonical_reply() {
        let parser = parser(
            r#"{"domain": "logistics", "action": "book_truck",
                "parameters": {"origin": "Mersin", "destination": "Hamburg"},
                "context": {"confidence": 0.9}}"#,
        );

        let intent = parser
            .parse("Book a truck from Mersin to Hamburg", &Map::new())
            .await
            .unwrap();

        assert_eq!(intent.domain.as_deref(), Some("logistics"));
        assert_eq!(intent.action.as_deref(), Some("book_truck"));
        assert_eq!(intent.parameters.get("destination"), Some(&json!("Hamburg")));
        assert!((intent.context.confidence - 0.9).abs() < 1e-9);
        assert!(!intent.context.parse_error);
    }

    #[tokio::test]
    async fn near_duplicate_values_normalize_to_canonical() {
        let parser = parser(
            r#"{"domain": "logistics", "action": "book_truck",
                "parameters": {"origin": "  mersin ", "destination": "berlin"}}"#,
        );

        let intent = parser.parse("book a truck", &Map::new()).await.unwrap();

        assert_eq!(intent.parameters.get("origin"), Some(&json!("Mersin")));
        assert_eq!(intent.parameters.get("destination"), Some(&json!("Berlin")));
    }

    #[tokio::test]
    async fn missing_allowed_key_backfills_from_defaults() {
        let parser = parser(
            r#"{"domain": "logistics", "action": "book_truck",
                "parameters": {"destination": "Hamburg"}}"#,
        );

        let intent = parser.parse("book a truck", &Map::new()).await.unwrap();

        assert_eq!(intent.parameters.get("origin"), Some(&json!("Mersin")));
        assert_eq!(intent.parameters.get("destination"), Some(&json!("Hamburg")));
    }

    #[tokio::test]
    async fn unregistered_action_is_kept_and_flagged() {
        let parser = parser(
            r#"{"domain": "logistics", "action": "teleport_cargo",
                "parameters": {"speed": "fast"}}"#,
        );

        let intent = parser.parse("teleport the cargo", &Map::new()).await.unwrap();

        assert_eq!(intent.action.as_deref(), Some("teleport_cargo"));
        assert_eq!(intent.parameters.get("speed"), Some(&json!("fast")));
        assert!(
            intent
                .context
                .guardrail_flags
                .iter()
                .any(|f| f == "unregistered_action")
        );
    }

    #[tokio::test]
    async fn null_action_clears_parameters_and_flags_unknown() {
        let parser = parser(
            r#"{"domain": "finance", "action": null, "parameters": {"period": "monthly"}}"#,
        );

        let intent = parser.parse("do finance things", &Map::new()).await.unwrap();

        assert!(intent.action.is_none());
        assert!(intent.parameters.is_empty());
        assert!(
            intent
                .context
                .guardrail_flags
                .iter()
                .any(|f| f == "unknown_action")
        );
    }

    #[tokio::test]
    async fn explicit_null_reply_stays_empty_for_the_fallback() {
        use crate::types::{FallbackReason, ParseOutcome};

        // Keywords in the command must not fabricate a domain when the model
        // answered with neither a domain nor an action.
        let parser = parser(r#"{"domain": null, "action": null, "parameters": {}}"#);

        let intent = parser
            .parse("book a truck to Berlin", &Map::new())
            .await
            .unwrap();

        assert!(intent.domain.is_none());
        assert!(intent.action.is_none());
        assert!(intent.is_empty_intent());
        match ParseOutcome::from_result(Ok(intent)) {
            ParseOutcome::Fallback(FallbackReason::EmptyIntent) => {}
            other => panic!("expected empty-intent fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_reply_degrades_to_parse_error() {
        let parser = parser("I am sorry, I cannot parse that.");

        let intent = parser
            .parse("book a truck to Berlin", &Map::new())
            .await
            .unwrap();

        assert!(intent.context.parse_error);
        assert_eq!(intent.context.confidence, 0.0);
        // The heuristic guess still fills the domain.
        assert_eq!(intent.domain.as_deref(), Some("logistics"));
        assert_eq!(
            intent.context.extra.get("raw"),
            Some(&json!("I am sorry, I cannot parse that."))
        );
    }

    #[tokio::test]
    async fn fenced_reply_is_stripped_before_decoding() {
        let parser = parser(
            "```json\n{\"domain\": \"finance\", \"action\": \"generate_cashflow_report\", \"parameters\": {}}\n```",
        );

        let intent = parser.parse("cashflow please", &Map::new()).await.unwrap();

        assert!(!intent.context.parse_error);
        assert_eq!(intent.domain.as_deref(), Some("finance"));
    }

    #[tokio::test]
    async fn unknown_domain_is_reguessed_from_text() {
        let parser = parser(r#"{"domain": "astrology", "action": "chart", "parameters": {}}"#);

        let intent = parser
            .parse("check the invoice backlog", &Map::new())
            .await
            .unwrap();

        // "invoice" keyword wins; "astrology" is not configured.
        assert_eq!(intent.domain.as_deref(), Some("finance"));
    }

    #[tokio::test]
    async fn missing_domain_key_falls_back_to_guess() {
        let parser = parser(r#"{"action": "book_truck", "parameters": {}}"#);

        let intent = parser
            .parse("book a truck to Berlin", &Map::new())
            .await
            .unwrap();

        assert_eq!(intent.domain.as_deref(), Some("logistics"));
    }

    #[tokio::test]
    async fn inbound_context_merges_and_wins() {
        let parser = parser(
            r#"{"domain": "logistics", "action": "book_truck", "parameters": {},
                "context": {"confidence": 0.9, "session": "old"}}"#,
        );

        let mut inbound = Map::new();
        inbound.insert("user_id".into(), json!("u-42"));
        inbound.insert("session".into(), json!("new"));

        let intent = parser.parse("book a truck", &inbound).await.unwrap();

        assert_eq!(intent.context.extra.get("user_id"), Some(&json!("u-42")));
        assert_eq!(intent.context.extra.get("session"), Some(&json!("new")));
    }

    #[tokio::test]
    async fn string_confidence_is_read_leniently() {
        let parser = parser(
            r#"{"domain": "finance", "action": "generate_cashflow_report",
                "parameters": {}, "context": {"confidence": "0.35"}}"#,
        );

        let intent = parser.parse("cashflow", &Map::new()).await.unwrap();
        assert!((intent.context.confidence - 0.35).abs() < 1e-9);
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_clamped() {
        let parser = parser(
            r#"{"domain": "finance", "action": "generate_cashflow_report",
                "parameters": {}, "context": {"confidence": 3.5}}"#,
        );

        let intent = parser.parse("cashflow", &Map::new()).await.unwrap();
        assert_eq!(intent.context.confidence, 1.0);
    }

    #[test]
    fn system_prompt_normalizes_invalid_hint() {
        let parser = parser("{}");

        let with_hint = parser.build_system_prompt(Some("logistics"));
        assert!(with_hint.contains("Current soft domain hint (may be \"none\"): logistics"));

        let bogus = parser.build_system_prompt(Some("astrology"));
        assert!(bogus.contains("Current soft domain hint (may be \"none\"): none"));

        let absent = parser.build_system_prompt(None);
        assert!(absent.contains("Current soft domain hint (may be \"none\"): none"));
    }

    #[test]
    fn system_prompt_lists_domains_and_actions() {
        let parser = parser("{}");
        let prompt = parser.build_system_prompt(None);

        assert!(prompt.contains("Valid domains: logistics, finance, operations"));
        assert!(prompt.contains("- finance: generate_cashflow_report"));
        assert!(prompt.contains("- logistics: book_truck"));
        assert!(prompt.contains("PARAMETER RULES:"));
        assert!(prompt.contains("GLOBAL HARD CONSTRAINTS:"));
    }

    #[test]
    fn few_shots_cover_all_domains_in_catalog_order() {
        let parser = parser("{}");
        let messages = parser.build_messages("new command", None).unwrap();

        // system + 2 exemplars * 2 turns + trailing user command.
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[1].content, "Book a truck from Mersin to Berlin");
        let expected: Value = serde_json::from_str(&messages[2].content).unwrap();
        assert_eq!(expected["action"], "book_truck");
        assert_eq!(messages[5].content, "new command");
    }

    #[test]
    fn code_fence_stripping() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn near_duplicate_matching() {
        assert!(near_duplicate(&json!("full time"), &json!("full_time")));
        assert!(near_duplicate(&json!("Berlin"), &json!("berlin")));
        assert!(near_duplicate(&json!("Berlin Mitte"), &json!("Berlin")));
        assert!(!near_duplicate(&json!("Hamburg"), &json!("Berlin")));
        assert!(near_duplicate(&json!(5), &json!(5)));
        assert!(!near_duplicate(&json!(5), &json!("5")));
    }
}
