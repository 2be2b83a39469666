//! The parser engine: one command in, one parsed intent out.
//!
//! The engine is AI-first. The raw intent parser is the primary brain; the
//! heuristic fallback runs only when the primary hard-fails (completion
//! error, undecodable reply, or neither domain nor action). Whatever path
//! produced the intent, the same post-processing applies: canonicalization,
//! risk tiers, verb tagging, confidence normalization, prompt-version
//! stamping, audit logging and telemetry. Parsing never errors; at worst the
//! caller receives a low-confidence fallback result.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use orko_store::ParseLogStore;

use crate::canonical::Canonicalizer;
use crate::completion::CompletionClient;
use crate::config::{ParserConfig, PromptVersions};
use crate::error::Result;
use crate::guardrails::GuardrailEngine;
use crate::mapper::IntentMapper;
use crate::masking::PiiMasker;
use crate::raw_parser::RawIntentParser;
use crate::registry::DomainRegistry;
use crate::telemetry::TelemetrySink;
use crate::types::{clamp_confidence, ParseOutcome, ParsedIntent, WorkflowBinding, WorkflowIntent};

/// Domain assumed when the caller supplies none.
pub const DEFAULT_DOMAIN: &str = "general";

/// Confidence assigned to heuristic fallback parses.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Facade over the full parsing pipeline.
pub struct ParserEngine {
    registry: Arc<DomainRegistry>,
    raw_parser: RawIntentParser,
    canonicalizer: Canonicalizer,
    guardrails: GuardrailEngine,
    prompt_versions: Arc<PromptVersions>,
    masker: PiiMasker,
    mapper: IntentMapper,
    parse_logs: ParseLogStore,
    telemetry: Arc<TelemetrySink>,
}

impl ParserEngine {
    /// Assemble the pipeline from its loaded configuration and collaborators.
    pub fn new(
        registry: Arc<DomainRegistry>,
        config: &ParserConfig,
        client: Arc<dyn CompletionClient>,
        parse_logs: ParseLogStore,
        telemetry: Arc<TelemetrySink>,
    ) -> Result<Self> {
        Ok(Self {
            raw_parser: RawIntentParser::new(Arc::clone(&registry), client),
            canonicalizer: Canonicalizer::new(Arc::clone(registry.keyword_index())),
            guardrails: GuardrailEngine::new(
                Arc::clone(&config.guardrails),
                Arc::clone(&config.risk_policy),
            ),
            prompt_versions: Arc::clone(&config.prompt_versions),
            masker: PiiMasker::new()?,
            mapper: IntentMapper::new(Arc::clone(&config.workflows), Arc::clone(&telemetry)),
            parse_logs,
            telemetry,
            registry,
        })
    }

    /// Parse one command.
    ///
    /// `domain` is a soft hint, never an override; it is injected into the
    /// context under `"domain"` unless the caller already supplied one.
    /// Always returns a parsed intent; primary-parser failures are recovered
    /// through the heuristic fallback, and audit side effects (log row,
    /// telemetry event) are best-effort.
    pub async fn parse_command(
        &self,
        text: &str,
        context: &Map<String, Value>,
        domain: Option<&str>,
    ) -> ParsedIntent {
        let domain = domain.unwrap_or(DEFAULT_DOMAIN);
        debug!(command = text, domain, "parsing command");

        let mut base_context = context.clone();
        if !domain.is_empty() && !base_context.contains_key("domain") {
            base_context.insert("domain".into(), json!(domain));
        }

        // Primary parse, classified into usable-or-fallback.
        let outcome = ParseOutcome::from_result(self.raw_parser.parse(text, &base_context).await);

        let mut parsed = match outcome {
            ParseOutcome::Usable(mut intent) => {
                let hint = base_context
                    .get("domain")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty());
                intent.domain = intent
                    .domain
                    .take()
                    .filter(|d| !d.is_empty())
                    .or_else(|| hint.map(String::from))
                    .or_else(|| (!domain.is_empty()).then(|| domain.to_string()))
                    .or_else(|| Some(DEFAULT_DOMAIN.to_string()));
                intent.context.used_fallback_parser = false;
                intent
            }
            ParseOutcome::Fallback(reason) => {
                warn!(command = text, %reason, "primary parser unusable, using heuristic fallback");
                self.fallback_parse(text, domain)
            }
        };

        // Same post-processing for both paths.
        self.canonicalizer.canonicalize(&mut parsed);
        self.guardrails.apply_risk_tiers(&mut parsed);
        self.guardrails.tag_risk(&mut parsed);
        parsed.context.confidence = clamp_confidence(parsed.context.confidence);

        let version_domain = parsed.domain.as_deref().unwrap_or(DEFAULT_DOMAIN);
        parsed.context.prompt_version = Some(self.prompt_versions.tag_for(version_domain));

        self.persist(&parsed, &base_context).await;
        self.telemetry.record_parser(&parsed);

        parsed
    }

    /// Map a parsed command onto its workflow binding.
    ///
    /// Thin pass-through to the intent mapper using `"{domain}.{action}"` as
    /// the intent name. Unlike parsing, this errors when no workflow template
    /// exists for the intent.
    pub fn map_to_workflow(&self, parsed: &ParsedIntent) -> Result<WorkflowBinding> {
        let domain = parsed
            .domain
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DOMAIN.to_string());
        let action = parsed
            .action
            .clone()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let intent = WorkflowIntent {
            name: format!("{domain}.{action}"),
            domain: Some(domain),
            parameters: parsed.parameters.clone(),
            risk_level: parsed.context.risk_level,
            requires_admin: parsed.context.requires_admin,
        };

        let mapped = self.mapper.map(&intent, &parsed.context.extra)?;
        Ok(mapped.into_binding())
    }

    /// Heuristic backup: keyword domain guess plus first-token action.
    ///
    /// Only runs when the primary parser hard-fails; it never overrides a
    /// usable primary result. The inbound context is deliberately not merged
    /// here, the fallback context carries only its own markers.
    fn fallback_parse(&self, text: &str, default_domain: &str) -> ParsedIntent {
        let mut intent = ParsedIntent::new(text);
        intent.domain = Some(
            self.registry
                .keyword_index()
                .guess(text)
                .map(str::to_string)
                .unwrap_or_else(|| default_domain.to_string()),
        );
        intent.action = Some(
            text.split_whitespace()
                .next()
                .map(str::to_lowercase)
                .unwrap_or_else(|| "unknown".to_string()),
        );
        intent.context.used_fallback_parser = true;
        intent.context.confidence = FALLBACK_CONFIDENCE;
        intent
    }

    /// Write the audit row, swallowing failures.
    async fn persist(&self, parsed: &ParsedIntent, base_context: &Map<String, Value>) {
        let masked = parsed
            .context
            .extra
            .get("reasoning_trace")
            .filter(|v| !v.is_null())
            .map(|trace| self.masker.mask_reasoning(trace));

        let log_id = Uuid::now_v7().to_string();
        let user_id = base_context.get("user_id").and_then(Value::as_str);
        let parsed_json = serde_json::to_value(parsed).unwrap_or(Value::Null);

        if let Err(e) = self
            .parse_logs
            .record(
                &log_id,
                user_id,
                &parsed.raw_text,
                parsed_json,
                masked,
                parsed.domain.as_deref(),
                parsed.action.as_deref(),
            )
            .await
        {
            warn!(error = %e, "parse log write failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orko_store::Database;

    use crate::completion::Message;
    use crate::config::{GuardrailVerbs, RiskPolicy, WorkflowTemplates};
    use crate::error::IntentError;
    use crate::keywords::KeywordIndex;
    use crate::types::RiskLevel;

    const CATALOG: &str = r#"
it_ops:
  examples:
    - command: "restart the api gateway"
      expected:
        domain: it_ops
        action: restart_service
        parameters:
          service: api-gateway
finance:
  examples:
    - command: "show the invoice backlog"
      expected:
        domain: finance
        action: list_invoices
        parameters: {}
logistics:
  examples:
    - command: "book a truck to rotterdam"
      expected:
        domain: logistics
        action: book_truck
        parameters:
          destination: rotterdam
"#;

    enum Stub {
        Reply(&'static str),
        Fail,
    }

    struct StubClient(Stub);

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, _messages: &[Message]) -> Result<String> {
            match &self.0 {
                Stub::Reply(s) => Ok((*s).to_string()),
                Stub::Fail => Err(IntentError::CompletionFailed {
                    reason: "stub offline".into(),
                }),
            }
        }
    }

    struct Harness {
        _telemetry_dir: tempfile::TempDir,
        telemetry_path: std::path::PathBuf,
        logs: ParseLogStore,
        engine: ParserEngine,
    }

    async fn harness(stub: Stub) -> Harness {
        harness_with_db(stub, true).await
    }

    async fn harness_with_db(stub: Stub, migrate: bool) -> Harness {
        let index = Arc::new(KeywordIndex::new());
        let registry = Arc::new(DomainRegistry::from_yaml_str(CATALOG, index).unwrap());

        let guardrails: GuardrailVerbs = serde_json::from_str(
            r#"{"allowed_verbs": ["list_invoices", "book_truck"], "risky_verbs": ["restart_service"], "blocked_verbs": ["delete_all_data"]}"#,
        )
        .unwrap();
        let risk_policy: RiskPolicy = serde_json::from_str(
            r#"{"destructive_verbs": [], "risk_tiers": {"high_risk": [], "medium_risk": ["restart_service"]}}"#,
        )
        .unwrap();
        let prompt_versions: PromptVersions = serde_json::from_str(
            r#"{"it_ops": {"version": 4, "updated_at": "2025-05-01"}}"#,
        )
        .unwrap();
        let workflows: WorkflowTemplates = serde_json::from_str(
            r#"{
                "it_ops.restart_service": {
                    "workflow_name": "service_restart_flow",
                    "required_parameters": ["service"],
                    "elevated_workflow": "service_restart_elevated_flow"
                }
            }"#,
        )
        .unwrap();
        let config = ParserConfig {
            guardrails: Arc::new(guardrails),
            risk_policy: Arc::new(risk_policy),
            prompt_versions: Arc::new(prompt_versions),
            workflows: Arc::new(workflows),
        };

        let db = Database::open_in_memory().unwrap();
        if migrate {
            db.run_migrations().await.unwrap();
        }
        let logs = ParseLogStore::new(db);

        let dir = tempfile::tempdir().unwrap();
        let telemetry = Arc::new(TelemetrySink::new(dir.path()));
        let telemetry_path = dir.path().to_path_buf();

        let engine = ParserEngine::new(
            registry,
            &config,
            Arc::new(StubClient(stub)),
            logs.clone(),
            Arc::clone(&telemetry),
        )
        .unwrap();

        Harness {
            _telemetry_dir: dir,
            telemetry_path,
            logs,
            engine,
        }
    }

    const RESTART_REPLY: &str = r#"{
        "domain": "it_ops",
        "action": "restart_service",
        "parameters": {"service": "billing"},
        "context": {"confidence": 0.92}
    }"#;

    #[tokio::test]
    async fn usable_reply_flows_through_the_full_pipeline() {
        let h = harness(Stub::Reply(RESTART_REPLY)).await;
        let parsed = h
            .engine
            .parse_command("restart the billing service", &Map::new(), None)
            .await;

        assert_eq!(parsed.domain.as_deref(), Some("it_ops"));
        assert_eq!(parsed.action.as_deref(), Some("restart_service"));
        assert_eq!(parsed.parameters["service"], "billing");
        assert!(!parsed.context.used_fallback_parser);
        assert!((parsed.context.confidence - 0.92).abs() < 1e-9);

        // Verb tagging and risk tiers both hit restart_service.
        assert_eq!(parsed.context.risk_level, Some(RiskLevel::High));
        assert!(parsed.context.guardrail_flags.contains(&"risky_action".to_string()));
        assert!(parsed.context.requires_confirmation);
        assert!(!parsed.context.requires_admin);

        // Prompt version stamped for the resolved domain.
        let tag = parsed.context.prompt_version.unwrap();
        assert_eq!(tag.version, 4);
        assert_eq!(tag.updated_at, "2025-05-01");
    }

    #[tokio::test]
    async fn completion_failure_falls_back_heuristically() {
        let h = harness(Stub::Fail).await;
        let parsed = h
            .engine
            .parse_command("restart the billing cluster", &Map::new(), None)
            .await;

        // Keyword guess lands it_ops; first token becomes the action and is
        // then canonicalized to restart_service.
        assert_eq!(parsed.domain.as_deref(), Some("it_ops"));
        assert_eq!(parsed.action.as_deref(), Some("restart_service"));
        assert!(parsed.context.used_fallback_parser);
        assert!((parsed.context.confidence - FALLBACK_CONFIDENCE).abs() < 1e-9);
    }

    #[tokio::test]
    async fn undecodable_reply_falls_back() {
        let h = harness(Stub::Reply("the model refuses to speak JSON")).await;
        let parsed = h
            .engine
            .parse_command("book a truck to rotterdam", &Map::new(), None)
            .await;

        assert!(parsed.context.used_fallback_parser);
        assert_eq!(parsed.domain.as_deref(), Some("logistics"));
        // First token "book" passes through action canonicalization unmapped.
        assert_eq!(parsed.action.as_deref(), Some("book"));
        assert!((parsed.context.confidence - FALLBACK_CONFIDENCE).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_model_intent_uses_fallback_and_default_domain() {
        let h = harness(Stub::Reply(r#"{"domain": null, "action": null}"#)).await;
        let parsed = h.engine.parse_command("hello world", &Map::new(), None).await;

        assert!(parsed.context.used_fallback_parser);
        // No keywords match, so the engine default domain is canonicalized
        // into the catch-all admin domain.
        assert_eq!(parsed.domain.as_deref(), Some("general_admin"));
        assert_eq!(parsed.action.as_deref(), Some("hello"));
        assert_eq!(parsed.context.risk_level, Some(RiskLevel::Medium));
        assert!(parsed.context.guardrail_flags.contains(&"unknown_action".to_string()));
    }

    #[tokio::test]
    async fn inbound_domain_hint_recovers_a_missing_model_domain() {
        let h = harness(Stub::Reply(
            r#"{"domain": null, "action": "list_invoices", "parameters": {}, "context": {}}"#,
        ))
        .await;

        let mut context = Map::new();
        context.insert("domain".into(), json!("finance"));
        context.insert("user_id".into(), json!("u-9"));

        let parsed = h
            .engine
            .parse_command("show the invoice backlog", &context, None)
            .await;

        assert_eq!(parsed.domain.as_deref(), Some("finance"));
        assert_eq!(parsed.action.as_deref(), Some("list_invoices"));
        assert_eq!(parsed.context.risk_level, Some(RiskLevel::Low));
        assert!(parsed.context.guardrail_flags.is_empty());
        // Inbound context keys survive into the merged context.
        assert_eq!(parsed.context.extra["domain"], "finance");
        assert_eq!(parsed.context.extra["user_id"], "u-9");
    }

    #[tokio::test]
    async fn every_parse_writes_an_audit_row() {
        let h = harness(Stub::Reply(RESTART_REPLY)).await;

        let mut context = Map::new();
        context.insert("user_id".into(), json!("u-42"));
        h.engine
            .parse_command("restart the billing service", &context, None)
            .await;

        let rows = h.logs.recent(10, 0).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].command, "restart the billing service");
        assert_eq!(rows[0].user_id.as_deref(), Some("u-42"));
        assert_eq!(rows[0].domain.as_deref(), Some("it_ops"));
        assert_eq!(rows[0].parsed_output["action"], "restart_service");
    }

    #[tokio::test]
    async fn reasoning_trace_is_masked_in_the_log_only() {
        let h = harness(Stub::Reply(RESTART_REPLY)).await;

        let mut context = Map::new();
        context.insert(
            "reasoning_trace".into(),
            json!({"note": "mail bob.smith@acme.io asap"}),
        );
        let parsed = h
            .engine
            .parse_command("restart the billing service", &context, None)
            .await;

        // The returned intent keeps the raw trace.
        assert_eq!(
            parsed.context.extra["reasoning_trace"]["note"],
            "mail bob.smith@acme.io asap"
        );

        // The audit row stores the masked form.
        let rows = h.logs.recent(10, 0).await.unwrap();
        let masked = rows[0].masked_reasoning.as_ref().unwrap();
        assert_eq!(masked["note"], "mail [EMAIL_MASKED] asap");
    }

    #[tokio::test]
    async fn every_parse_emits_a_telemetry_event() {
        let h = harness(Stub::Reply(RESTART_REPLY)).await;
        h.engine
            .parse_command("restart the billing service", &Map::new(), None)
            .await;

        let raw = std::fs::read_to_string(h.telemetry_path.join("parser.jsonl")).unwrap();
        let event: Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(event["raw_command"], "restart the billing service");
        assert_eq!(event["domain"], "it_ops");
        assert_eq!(event["action"], "restart_service");
    }

    #[tokio::test]
    async fn persistence_failure_does_not_fail_the_parse() {
        // No migrations, so the parse_logs table is missing and every write
        // fails; the parse must still come back whole.
        let h = harness_with_db(Stub::Reply(RESTART_REPLY), false).await;
        let parsed = h
            .engine
            .parse_command("restart the billing service", &Map::new(), None)
            .await;

        assert_eq!(parsed.domain.as_deref(), Some("it_ops"));
        assert!(h.logs.recent(10, 0).await.is_err());
    }

    #[tokio::test]
    async fn oversized_confidence_is_clamped() {
        let h = harness(Stub::Reply(
            r#"{"domain": "it_ops", "action": "restart_service", "parameters": {}, "context": {"confidence": 3.5}}"#,
        ))
        .await;
        let parsed = h
            .engine
            .parse_command("restart the api gateway", &Map::new(), None)
            .await;
        assert!((parsed.context.confidence - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn map_to_workflow_routes_by_risk() {
        let h = harness(Stub::Reply(RESTART_REPLY)).await;
        let parsed = h
            .engine
            .parse_command("restart the billing service", &Map::new(), None)
            .await;

        // restart_service is risky, so routing picks the elevated workflow.
        let binding = h.engine.map_to_workflow(&parsed).unwrap();
        assert_eq!(binding.workflow_name, "service_restart_elevated_flow");
        assert_eq!(binding.parameters["service"], "billing");
        assert!(binding.missing.is_empty());
    }

    #[tokio::test]
    async fn map_to_workflow_surfaces_missing_templates() {
        let h = harness(Stub::Reply(
            r#"{"domain": "finance", "action": "list_invoices", "parameters": {}, "context": {}}"#,
        ))
        .await;
        let parsed = h
            .engine
            .parse_command("show the invoice backlog", &Map::new(), None)
            .await;

        let err = h.engine.map_to_workflow(&parsed).unwrap_err();
        match err {
            IntentError::UnknownIntent { intent } => {
                assert_eq!(intent, "finance.list_invoices");
            }
            other => panic!("expected unknown intent, got {other}"),
        }
    }
}
