//! Failure categorization over exported errors.
//!
//! Buckets each error record into a single coarse category for triage
//! dashboards.  The checks are ordered; the first one that fires wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::evaluator::ErrorRecord;

/// How many example commands each bucket keeps.
const EXAMPLES_PER_BUCKET: usize = 3;

/// Coarse failure bucket, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    DomainFailure,
    ActionFailure,
    NoActionDetected,
    ParametersMissing,
    ParametersWrong,
    Other,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::DomainFailure => "domain_failure",
            FailureCategory::ActionFailure => "action_failure",
            FailureCategory::NoActionDetected => "no_action_detected",
            FailureCategory::ParametersMissing => "parameters_missing",
            FailureCategory::ParametersWrong => "parameters_wrong",
            FailureCategory::Other => "other",
        }
    }
}

/// Assign one error record to its bucket.
pub fn categorize(record: &ErrorRecord) -> FailureCategory {
    if record.predicted_domain != record.expected_domain {
        return FailureCategory::DomainFailure;
    }
    if record.predicted_action != record.expected_action {
        return FailureCategory::ActionFailure;
    }

    let parsed_action = record
        .raw_parsed
        .get("action")
        .and_then(Value::as_str)
        .filter(|a| !a.is_empty());
    if parsed_action.is_none() {
        return FailureCategory::NoActionDetected;
    }

    let empty = Map::new();
    let predicted_params = record
        .raw_parsed
        .get("parameters")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    if !record.expected_parameters.is_empty() && predicted_params.is_empty() {
        return FailureCategory::ParametersMissing;
    }
    if !predicted_params.is_empty() && *predicted_params != record.expected_parameters {
        return FailureCategory::ParametersWrong;
    }

    FailureCategory::Other
}

/// Per-bucket counts with a few example commands each.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FailureBreakdown {
    pub counts: BTreeMap<String, u64>,
    pub examples: BTreeMap<String, Vec<String>>,
}

/// Categorize a whole error set.
pub fn categorize_failures(records: &[ErrorRecord]) -> FailureBreakdown {
    let mut breakdown = FailureBreakdown::default();
    for record in records {
        let bucket = categorize(record).as_str().to_string();
        *breakdown.counts.entry(bucket.clone()).or_default() += 1;
        let examples = breakdown.examples.entry(bucket).or_default();
        if examples.len() < EXAMPLES_PER_BUCKET {
            examples.push(record.command.clone());
        }
    }
    breakdown
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::evaluator::ErrorType;

    fn record(
        expected: (Option<&str>, Option<&str>),
        predicted: (Option<&str>, Option<&str>),
        expected_params: Value,
        raw_parsed: Value,
    ) -> ErrorRecord {
        ErrorRecord {
            id: "CMD-000".into(),
            command: "restart the billing service".into(),
            expected_domain: expected.0.map(String::from),
            expected_action: expected.1.map(String::from),
            expected_parameters: serde_json::from_value(expected_params).unwrap(),
            predicted_domain: predicted.0.map(String::from),
            predicted_action: predicted.1.map(String::from),
            error_type: Some(ErrorType::Unknown),
            raw_parsed,
        }
    }

    #[test]
    fn first_matching_check_wins() {
        // Wrong domain and wrong action still lands in domain_failure.
        let r = record(
            (Some("it_ops"), Some("restart_service")),
            (Some("finance"), Some("pay_invoice")),
            json!({}),
            json!({"action": "pay_invoice"}),
        );
        assert_eq!(categorize(&r), FailureCategory::DomainFailure);
    }

    #[test]
    fn missing_action_in_parse_is_no_action_detected() {
        let r = record(
            (Some("it_ops"), None),
            (Some("it_ops"), None),
            json!({}),
            json!({"action": null, "parameters": {}}),
        );
        assert_eq!(categorize(&r), FailureCategory::NoActionDetected);
    }

    #[test]
    fn empty_prediction_with_expected_params_is_parameters_missing() {
        let r = record(
            (Some("it_ops"), Some("restart_service")),
            (Some("it_ops"), Some("restart_service")),
            json!({"service": "billing"}),
            json!({"action": "restart_service", "parameters": {}}),
        );
        assert_eq!(categorize(&r), FailureCategory::ParametersMissing);
    }

    #[test]
    fn differing_params_are_parameters_wrong() {
        let r = record(
            (Some("it_ops"), Some("restart_service")),
            (Some("it_ops"), Some("restart_service")),
            json!({"service": "billing"}),
            json!({"action": "restart_service", "parameters": {"service": "payments"}}),
        );
        assert_eq!(categorize(&r), FailureCategory::ParametersWrong);
    }

    #[test]
    fn breakdown_counts_and_caps_examples() {
        let records: Vec<ErrorRecord> = (0..5)
            .map(|_| {
                record(
                    (Some("it_ops"), Some("restart_service")),
                    (Some("finance"), Some("restart_service")),
                    json!({}),
                    json!({"action": "restart_service"}),
                )
            })
            .collect();

        let breakdown = categorize_failures(&records);
        assert_eq!(breakdown.counts["domain_failure"], 5);
        assert_eq!(breakdown.examples["domain_failure"].len(), 3);
    }
}
