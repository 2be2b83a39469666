//! The unified parser evaluator.
//!
//! Runs a labeled dataset through the parser engine and scores the output:
//! overall and per-domain accuracy, error buckets, a domain-level confusion
//! matrix, and per-domain / per-action precision-recall-F1.  Items are
//! evaluated sequentially; aggregation is one pass over the complete result
//! set, never a streaming accumulate.  Mismatched items are exportable as
//! JSONL for offline pattern mining.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use orko_intent::ParserEngine;
use orko_store::MetricsRecord;

use crate::dataset::{EvalDataset, EvalItem};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Why an evaluated item did not count as correct.
///
/// Classification is ordered: a wrong domain always reports as a domain
/// mismatch even when the action is also wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Predicted domain differs from the expected domain.
    DomainMismatch,
    /// Domain matched but the action differs.
    ActionMismatch,
    /// Domain and action matched but an expected parameter differs.
    ParametersMismatch,
    /// The item could not be evaluated at all (e.g. the parse output was not
    /// serializable); the rest of the batch still runs.
    Unknown,
}

impl ErrorType {
    /// The wire representation used in exports and bucket keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::DomainMismatch => "domain_mismatch",
            ErrorType::ActionMismatch => "action_mismatch",
            ErrorType::ParametersMismatch => "parameters_mismatch",
            ErrorType::Unknown => "unknown",
        }
    }
}

/// One scored item: the label, the prediction, and the verdict.
#[derive(Debug, Clone, Serialize)]
pub struct EvalResult {
    pub id: String,
    pub command: String,
    pub expected_domain: Option<String>,
    pub expected_action: Option<String>,
    pub expected_parameters: Map<String, Value>,
    pub predicted_domain: Option<String>,
    pub predicted_action: Option<String>,
    pub domain_correct: bool,
    pub action_correct: bool,
    pub parameters_match: bool,
    pub error_type: Option<ErrorType>,
    /// The full parsed output, kept verbatim for offline mining.
    pub raw_parsed: Value,
}

/// Precision/recall/F1 plus the raw tallies they derive from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrfEntry {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub tp: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
}

impl PrfEntry {
    fn from_tallies(tp: u64, fp: u64, fn_: u64) -> Self {
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            tp,
            fp,
            fn_,
        }
    }
}

fn ratio(num: u64, denom: u64) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// One evaluation run's complete statistics.
///
/// Persisted as a metrics row keyed by `run_id`; every map is ordered so
/// rendered reports and stored blobs stay deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    /// Engine version tag for the run (e.g. `"v7"`).
    pub version: String,
    pub total: u64,
    pub correct: u64,
    /// correct / total, 0.0 for an empty run.
    pub accuracy: f64,
    pub per_domain_accuracy: BTreeMap<String, f64>,
    /// Error-type → count over the mismatched items.
    pub error_buckets: BTreeMap<String, u64>,
    /// Expected-domain → predicted-domain → count (`"none"` for a null
    /// prediction).
    pub confusion_matrix: BTreeMap<String, BTreeMap<String, u64>>,
    pub per_domain_prf: BTreeMap<String, PrfEntry>,
    pub per_action_prf: BTreeMap<String, PrfEntry>,
}

impl EvalSummary {
    /// Rebuild a summary from a persisted metrics row.
    ///
    /// Blob columns written by older engine versions may be absent; they
    /// decode to empty tables.
    pub fn from_metrics(record: &MetricsRecord) -> Result<Self> {
        fn decode<T>(blob: &Option<Value>) -> Result<T>
        where
            T: serde::de::DeserializeOwned + Default,
        {
            Ok(blob
                .clone()
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default())
        }

        Ok(Self {
            version: record.engine_version.clone().unwrap_or_default(),
            total: record.total.max(0) as u64,
            correct: record.correct.max(0) as u64,
            accuracy: record.accuracy,
            per_domain_accuracy: decode(&record.per_domain_accuracy)?,
            error_buckets: decode(&record.error_buckets)?,
            confusion_matrix: decode(&record.confusion_matrix)?,
            per_domain_prf: decode(&record.per_domain_prf)?,
            per_action_prf: decode(&record.per_action)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Scores a labeled dataset against the parser engine.
pub struct Evaluator<'a> {
    engine: &'a ParserEngine,
}

impl<'a> Evaluator<'a> {
    pub fn new(engine: &'a ParserEngine) -> Self {
        Self { engine }
    }

    /// Run the full evaluation: every item is parsed with an empty context,
    /// scored, and only then aggregated into the summary.
    pub async fn run(&self, dataset: &EvalDataset, version: &str) -> (Vec<EvalResult>, EvalSummary) {
        let mut results = Vec::with_capacity(dataset.len());
        for item in dataset.items() {
            results.push(self.evaluate_item(item).await);
        }

        let summary = summarize(&results, version);
        info!(
            total = summary.total,
            correct = summary.correct,
            accuracy = summary.accuracy,
            "evaluation run complete"
        );
        (results, summary)
    }

    async fn evaluate_item(&self, item: &EvalItem) -> EvalResult {
        let parsed = self
            .engine
            .parse_command(&item.command, &Map::new(), None)
            .await;

        let raw_parsed = match serde_json::to_value(&parsed) {
            Ok(v) => v,
            Err(e) => {
                // Parsing itself cannot fail, but echoing the output can; the
                // item is scored as unknown instead of aborting the run.
                warn!(id = %item.id, error = %e, "parse output not serializable");
                return EvalResult {
                    id: item.id.clone(),
                    command: item.command.clone(),
                    expected_domain: item.expected.domain.clone(),
                    expected_action: item.expected.action.clone(),
                    expected_parameters: item.expected.parameters.clone(),
                    predicted_domain: None,
                    predicted_action: None,
                    domain_correct: false,
                    action_correct: false,
                    parameters_match: false,
                    error_type: Some(ErrorType::Unknown),
                    raw_parsed: Value::Null,
                };
            }
        };

        let domain_correct = parsed.domain == item.expected.domain;
        let action_correct = parsed.action == item.expected.action;
        let parameters_match = parameters_match(&item.expected.parameters, &parsed.parameters);

        EvalResult {
            id: item.id.clone(),
            command: item.command.clone(),
            expected_domain: item.expected.domain.clone(),
            expected_action: item.expected.action.clone(),
            expected_parameters: item.expected.parameters.clone(),
            predicted_domain: parsed.domain.clone(),
            predicted_action: parsed.action.clone(),
            domain_correct,
            action_correct,
            parameters_match,
            error_type: classify(domain_correct, action_correct, parameters_match),
            raw_parsed,
        }
    }
}

/// Subset equality: every expected key must be predicted with exactly the
/// expected value; extra predicted keys (backfilled defaults) are ignored.
pub fn parameters_match(expected: &Map<String, Value>, predicted: &Map<String, Value>) -> bool {
    expected.iter().all(|(k, v)| predicted.get(k) == Some(v))
}

/// Ordered error classification: domain > action > parameters.
pub fn classify(domain_ok: bool, action_ok: bool, params_ok: bool) -> Option<ErrorType> {
    if !domain_ok {
        Some(ErrorType::DomainMismatch)
    } else if !action_ok {
        Some(ErrorType::ActionMismatch)
    } else if !params_ok {
        Some(ErrorType::ParametersMismatch)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Compute the run summary from a complete result set.
pub fn summarize(results: &[EvalResult], version: &str) -> EvalSummary {
    let total = results.len() as u64;
    let mut correct = 0u64;

    let mut per_domain_counts: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    let mut error_buckets: BTreeMap<String, u64> = BTreeMap::new();
    let mut confusion_matrix: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();

    let mut domain_tallies: BTreeMap<String, (u64, u64, u64)> = BTreeMap::new();
    let mut action_tallies: BTreeMap<String, (u64, u64, u64)> = BTreeMap::new();

    for result in results {
        if result.error_type.is_none() {
            correct += 1;
        }
        if let Some(error) = result.error_type {
            *error_buckets.entry(error.as_str().to_string()).or_default() += 1;
        }

        let expected_domain = result
            .expected_domain
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        let counts = per_domain_counts.entry(expected_domain.clone()).or_default();
        counts.0 += 1;
        if result.error_type.is_none() {
            counts.1 += 1;
        }

        let predicted_domain = result
            .predicted_domain
            .clone()
            .unwrap_or_else(|| "none".to_string());
        *confusion_matrix
            .entry(expected_domain)
            .or_default()
            .entry(predicted_domain)
            .or_default() += 1;

        // PRF tallies: exact label match is a tp for the expected bucket;
        // anything else is a fn for the expected label and a fp for the
        // predicted label, when one exists.
        if let Some(expected) = &result.expected_domain {
            if result.domain_correct {
                domain_tallies.entry(expected.clone()).or_default().0 += 1;
            } else {
                domain_tallies.entry(expected.clone()).or_default().2 += 1;
                if let Some(predicted) = &result.predicted_domain {
                    domain_tallies.entry(predicted.clone()).or_default().1 += 1;
                }
            }
        }
        if let Some(expected) = &result.expected_action {
            if result.action_correct {
                action_tallies.entry(expected.clone()).or_default().0 += 1;
            } else {
                action_tallies.entry(expected.clone()).or_default().2 += 1;
                if let Some(predicted) = &result.predicted_action {
                    action_tallies.entry(predicted.clone()).or_default().1 += 1;
                }
            }
        }
    }

    let per_domain_accuracy = per_domain_counts
        .into_iter()
        .map(|(domain, (domain_total, domain_correct))| {
            (domain, ratio(domain_correct, domain_total))
        })
        .collect();

    let to_prf = |tallies: BTreeMap<String, (u64, u64, u64)>| {
        tallies
            .into_iter()
            .map(|(label, (tp, fp, fn_))| (label, PrfEntry::from_tallies(tp, fp, fn_)))
            .collect()
    };

    EvalSummary {
        version: version.to_string(),
        total,
        correct,
        accuracy: ratio(correct, total),
        per_domain_accuracy,
        error_buckets,
        confusion_matrix,
        per_domain_prf: to_prf(domain_tallies),
        per_action_prf: to_prf(action_tallies),
    }
}

// ---------------------------------------------------------------------------
// Error export
// ---------------------------------------------------------------------------

/// One exported mismatch, the interchange row between the evaluator and the
/// pattern miner.  Expected parameters travel with the row so the miner can
/// count missing slots without re-reading the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: String,
    pub command: String,
    pub expected_domain: Option<String>,
    pub expected_action: Option<String>,
    #[serde(default)]
    pub expected_parameters: Map<String, Value>,
    pub predicted_domain: Option<String>,
    pub predicted_action: Option<String>,
    pub error_type: Option<ErrorType>,
    #[serde(default)]
    pub raw_parsed: Value,
}

impl From<&EvalResult> for ErrorRecord {
    fn from(result: &EvalResult) -> Self {
        Self {
            id: result.id.clone(),
            command: result.command.clone(),
            expected_domain: result.expected_domain.clone(),
            expected_action: result.expected_action.clone(),
            expected_parameters: result.expected_parameters.clone(),
            predicted_domain: result.predicted_domain.clone(),
            predicted_action: result.predicted_action.clone(),
            error_type: result.error_type,
            raw_parsed: result.raw_parsed.clone(),
        }
    }
}

/// Write one JSON line per mismatched item; returns the number written.
pub fn export_errors(results: &[EvalResult], path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(path)?;
    let mut written = 0;
    for result in results {
        if result.error_type.is_none() {
            continue;
        }
        let line = serde_json::to_string(&ErrorRecord::from(result))?;
        writeln!(file, "{line}")?;
        written += 1;
    }

    info!(path = %path.display(), written, "error export complete");
    Ok(written)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use orko_intent::completion::Message;
    use orko_intent::{
        CompletionClient, DomainRegistry, GuardrailVerbs, KeywordIndex, ParserConfig,
        PromptVersions, RiskPolicy, TelemetrySink, WorkflowTemplates,
    };
    use orko_store::{Database, ParseLogStore};

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
    - command: "generate monthly cashflow report"
      expected:
        domain: finance
        action: generate_cashflow_report
        parameters:
          period: monthly
"#;

    struct StubClient(&'static str);

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, _messages: &[Message]) -> orko_intent::Result<String> {
            Ok(self.0.to_string())
        }
    }

    async fn engine(reply: &'static str) -> (tempfile::TempDir, ParserEngine) {
        let registry = Arc::new(
            DomainRegistry::from_yaml_str(CATALOG, Arc::new(KeywordIndex::new())).unwrap(),
        );
        let config = ParserConfig {
            guardrails: Arc::new(GuardrailVerbs::default()),
            risk_policy: Arc::new(RiskPolicy::default()),
            prompt_versions: Arc::new(PromptVersions::default()),
            workflows: Arc::new(WorkflowTemplates::default()),
        };

        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        let logs = ParseLogStore::new(db);

        let dir = tempfile::tempdir().unwrap();
        let telemetry = Arc::new(TelemetrySink::new(dir.path()));

        let engine = ParserEngine::new(
            registry,
            &config,
            Arc::new(StubClient(reply)),
            logs,
            telemetry,
        )
        .unwrap();
        (dir, engine)
    }

    fn dataset(command: &str) -> EvalDataset {
        EvalDataset::from_yaml_str(&format!(
            r#"
commands:
  - id: CMD-001
    command: "{command}"
    expected:
      domain: it_ops
      action: restart_service
      parameters:
        service: billing
"#
        ))
        .unwrap()
    }

    fn result_stub(
        expected_domain: &str,
        predicted_domain: Option<&str>,
        error_type: Option<ErrorType>,
    ) -> EvalResult {
        EvalResult {
            id: "CMD-000".into(),
            command: "restart the billing service".into(),
            expected_domain: Some(expected_domain.to_string()),
            expected_action: Some("restart_service".into()),
            expected_parameters: Map::new(),
            predicted_domain: predicted_domain.map(String::from),
            predicted_action: Some("restart_service".into()),
            domain_correct: predicted_domain == Some(expected_domain),
            action_correct: true,
            parameters_match: true,
            error_type,
            raw_parsed: Value::Null,
        }
    }

    #[tokio::test]
    async fn exact_prediction_counts_as_correct() {
        let (_dir, engine) = engine(
            r#"{"domain": "it_ops", "action": "restart_service",
                "parameters": {"service": "billing"}, "context": {"confidence": 0.9}}"#,
        )
        .await;

        let evaluator = Evaluator::new(&engine);
        let (results, summary) = evaluator
            .run(&dataset("restart the billing service"), "v7")
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].error_type, None);
        assert_eq!(summary.correct, 1);
        assert!((summary.accuracy - 1.0).abs() < 1e-9);
        assert_eq!(summary.per_domain_accuracy["it_ops"], 1.0);
        assert_eq!(summary.confusion_matrix["it_ops"]["it_ops"], 1);
        assert_eq!(summary.per_domain_prf["it_ops"].tp, 1);
        assert_eq!(summary.per_action_prf["restart_service"].tp, 1);
    }

    #[tokio::test]
    async fn wrong_domain_is_a_domain_mismatch() {
        // The command carries no it_ops keywords, so the canonicalizer keeps
        // the model's wrong-but-canonical domain.
        let (_dir, engine) = engine(
            r#"{"domain": "finance", "action": "restart_service",
                "parameters": {"service": "billing"}, "context": {"confidence": 0.9}}"#,
        )
        .await;

        let evaluator = Evaluator::new(&engine);
        let (results, summary) = evaluator
            .run(&dataset("bounce the billing daemon"), "v7")
            .await;

        assert_eq!(results[0].error_type, Some(ErrorType::DomainMismatch));
        assert_eq!(summary.correct, 0);
        assert_eq!(summary.confusion_matrix["it_ops"]["finance"], 1);
        assert_eq!(summary.error_buckets["domain_mismatch"], 1);
        assert_eq!(summary.per_domain_prf["it_ops"].fn_, 1);
        assert_eq!(summary.per_domain_prf["finance"].fp, 1);
    }

    #[tokio::test]
    async fn missing_parameters_are_a_parameters_mismatch() {
        // Correct domain and action but empty parameters: the expected
        // "service" key is never predicted, so subset equality fails.
        let (_dir, engine) = engine(
            r#"{"domain": "it_ops", "action": "restart_service",
                "parameters": {}, "context": {"confidence": 0.9}}"#,
        )
        .await;

        let evaluator = Evaluator::new(&engine);
        let (results, summary) = evaluator
            .run(&dataset("restart the billing service"), "v7")
            .await;

        assert_eq!(results[0].error_type, Some(ErrorType::ParametersMismatch));
        assert_eq!(summary.error_buckets["parameters_mismatch"], 1);
        // Domain and action PRF still score as matches.
        assert_eq!(summary.per_domain_prf["it_ops"].tp, 1);
        assert_eq!(summary.per_action_prf["restart_service"].tp, 1);
    }

    #[test]
    fn classification_prefers_domain_over_action() {
        assert_eq!(classify(false, false, false), Some(ErrorType::DomainMismatch));
        assert_eq!(classify(true, false, false), Some(ErrorType::ActionMismatch));
        assert_eq!(classify(true, true, false), Some(ErrorType::ParametersMismatch));
        assert_eq!(classify(true, true, true), None);
    }

    #[test]
    fn parameter_subset_equality_ignores_extras() {
        let expected: Map<String, Value> =
            serde_json::from_value(json!({"service": "billing"})).unwrap();
        let predicted: Map<String, Value> =
            serde_json::from_value(json!({"service": "billing", "env": "production"})).unwrap();
        assert!(parameters_match(&expected, &predicted));

        let wrong: Map<String, Value> =
            serde_json::from_value(json!({"service": "api-gateway"})).unwrap();
        assert!(!parameters_match(&expected, &wrong));
        assert!(!parameters_match(&expected, &Map::new()));
    }

    #[test]
    fn summarize_builds_the_confusion_matrix_from_results() {
        // The spec-level trivial case: expected it_ops, predicted finance.
        let results = vec![result_stub(
            "it_ops",
            Some("finance"),
            Some(ErrorType::DomainMismatch),
        )];
        let summary = summarize(&results, "v7");

        assert_eq!(summary.confusion_matrix["it_ops"]["finance"], 1);
        assert_eq!(summary.per_domain_accuracy["it_ops"], 0.0);
        assert_eq!(summary.error_buckets["domain_mismatch"], 1);
    }

    #[test]
    fn empty_run_has_zero_accuracy() {
        let summary = summarize(&[], "v7");
        assert_eq!(summary.total, 0);
        assert_eq!(summary.accuracy, 0.0);
        assert!(summary.per_domain_prf.is_empty());
    }

    #[test]
    fn null_prediction_lands_in_the_none_column() {
        let results = vec![result_stub("it_ops", None, Some(ErrorType::DomainMismatch))];
        let summary = summarize(&results, "v7");
        assert_eq!(summary.confusion_matrix["it_ops"]["none"], 1);
        // No predicted label, so no false positive is charged anywhere.
        assert_eq!(summary.per_domain_prf["it_ops"].fn_, 1);
        assert_eq!(summary.per_domain_prf.len(), 1);
    }

    #[test]
    fn prf_zero_denominators_stay_zero() {
        let entry = PrfEntry::from_tallies(0, 0, 3);
        assert_eq!(entry.precision, 0.0);
        assert_eq!(entry.recall, 0.0);
        assert_eq!(entry.f1, 0.0);
    }

    #[test]
    fn export_writes_one_line_per_mismatch() {
        let results = vec![
            result_stub("it_ops", Some("it_ops"), None),
            result_stub("it_ops", Some("finance"), Some(ErrorType::DomainMismatch)),
        ];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("errors.jsonl");
        let written = export_errors(&results, &path).unwrap();
        assert_eq!(written, 1);

        let raw = std::fs::read_to_string(&path).unwrap();
        let record: ErrorRecord = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(record.predicted_domain.as_deref(), Some("finance"));
        assert_eq!(record.error_type, Some(ErrorType::DomainMismatch));
    }

    #[test]
    fn summary_round_trips_through_a_metrics_record() {
        let results = vec![result_stub(
            "it_ops",
            Some("finance"),
            Some(ErrorType::DomainMismatch),
        )];
        let summary = summarize(&results, "v7");

        let record = MetricsRecord {
            id: "m-1".into(),
            run_id: "run-1".into(),
            total: summary.total as i64,
            correct: summary.correct as i64,
            accuracy: summary.accuracy,
            per_domain_accuracy: Some(serde_json::to_value(&summary.per_domain_accuracy).unwrap()),
            per_action: Some(serde_json::to_value(&summary.per_action_prf).unwrap()),
            engine_version: Some("v7".into()),
            error_buckets: Some(serde_json::to_value(&summary.error_buckets).unwrap()),
            confusion_matrix: Some(serde_json::to_value(&summary.confusion_matrix).unwrap()),
            per_domain_prf: Some(serde_json::to_value(&summary.per_domain_prf).unwrap()),
            created_at: 0,
        };

        let restored = EvalSummary::from_metrics(&record).unwrap();
        assert_eq!(restored.total, 1);
        assert_eq!(restored.confusion_matrix["it_ops"]["finance"], 1);
        assert_eq!(restored.per_domain_prf["it_ops"].fn_, 1);
    }
}
