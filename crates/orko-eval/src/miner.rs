//! Error pattern mining.
//!
//! Scans an exported error file (JSONL of [`ErrorRecord`]s) and surfaces the
//! systematic issues behind individual mismatches: domain confusion, action
//! confusion, missing parameters, and recurring phrasing.  The miner is
//! tolerant by construction; a missing file or a corrupt line must never
//! abort an analysis session.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::evaluator::ErrorRecord;

/// One expected parameter that the parser repeatedly fails to emit, keyed by
/// where it was expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingParameter {
    pub domain: String,
    pub action: String,
    pub parameter: String,
    pub count: u64,
}

/// The mined pattern summary over one error export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinedPatterns {
    /// Expected-domain → predicted-domain → count (`"none"` for null).
    pub domain_confusion: BTreeMap<String, BTreeMap<String, u64>>,
    /// Expected-action → predicted-action → count (`"none"` for null).
    pub action_confusion: BTreeMap<String, BTreeMap<String, u64>>,
    /// Expected parameters absent from the parse, most frequent first.
    pub missing_parameters: Vec<MissingParameter>,
    /// Lowercased command tokens appearing more than once across errors.
    pub frequent_phrasing_tokens: BTreeMap<String, u64>,
}

/// Mines an error export for systematic patterns.
pub struct PatternMiner {
    errors: Vec<ErrorRecord>,
}

impl PatternMiner {
    /// Load the miner from an exported error file.
    ///
    /// A missing file yields an empty miner; undecodable lines are skipped
    /// with a warning so one bad row cannot hide the rest.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no error export found, mining empty set");
            return Ok(Self { errors: Vec::new() });
        }

        let raw = std::fs::read_to_string(path)?;
        let mut errors = Vec::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ErrorRecord>(line) {
                Ok(record) => errors.push(record),
                Err(e) => warn!(line = lineno + 1, error = %e, "skipping undecodable error line"),
            }
        }

        info!(path = %path.display(), errors = errors.len(), "error export loaded");
        Ok(Self { errors })
    }

    /// Build the miner directly from records (in-process pipelines, tests).
    pub fn from_records(errors: Vec<ErrorRecord>) -> Self {
        Self { errors }
    }

    /// The loaded error records (failure categorization reuses them).
    pub fn records(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// Number of loaded error records.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when no errors were loaded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Expected-domain → predicted-domain → count over all errors.
    pub fn domain_confusion_patterns(&self) -> BTreeMap<String, BTreeMap<String, u64>> {
        let mut matrix: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
        for e in &self.errors {
            let expected = label(&e.expected_domain, "unknown");
            let predicted = label(&e.predicted_domain, "none");
            *matrix.entry(expected).or_default().entry(predicted).or_default() += 1;
        }
        matrix
    }

    /// Expected-action → predicted-action → count over all errors.
    pub fn action_confusion_patterns(&self) -> BTreeMap<String, BTreeMap<String, u64>> {
        let mut matrix: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
        for e in &self.errors {
            let expected = label(&e.expected_action, "unknown");
            let predicted = label(&e.predicted_action, "none");
            *matrix.entry(expected).or_default().entry(predicted).or_default() += 1;
        }
        matrix
    }

    /// Expected parameters missing from the predicted parse, counted per
    /// (domain, action, parameter) and sorted most frequent first.
    pub fn missing_parameter_patterns(&self) -> Vec<MissingParameter> {
        let mut counts: BTreeMap<(String, String, String), u64> = BTreeMap::new();
        for e in &self.errors {
            let predicted = e
                .raw_parsed
                .get("parameters")
                .and_then(Value::as_object);
            for key in e.expected_parameters.keys() {
                let present = predicted.is_some_and(|p| p.contains_key(key));
                if !present {
                    let slot = (
                        label(&e.expected_domain, "unknown"),
                        label(&e.expected_action, "unknown"),
                        key.clone(),
                    );
                    *counts.entry(slot).or_default() += 1;
                }
            }
        }

        let mut missing: Vec<MissingParameter> = counts
            .into_iter()
            .map(|((domain, action, parameter), count)| MissingParameter {
                domain,
                action,
                parameter,
                count,
            })
            .collect();
        missing.sort_by(|a, b| b.count.cmp(&a.count));
        missing
    }

    /// Lowercased tokens seen in more than one failing command.
    pub fn phrasing_patterns(&self) -> BTreeMap<String, u64> {
        let mut tokens: BTreeMap<String, u64> = BTreeMap::new();
        for e in &self.errors {
            for word in e.command.split_whitespace() {
                *tokens.entry(word.to_lowercase()).or_default() += 1;
            }
        }
        tokens.retain(|_, count| *count > 1);
        tokens
    }

    /// Run every analysis.
    pub fn summarize(&self) -> MinedPatterns {
        MinedPatterns {
            domain_confusion: self.domain_confusion_patterns(),
            action_confusion: self.action_confusion_patterns(),
            missing_parameters: self.missing_parameter_patterns(),
            frequent_phrasing_tokens: self.phrasing_patterns(),
        }
    }
}

fn label(value: &Option<String>, fallback: &str) -> String {
    value.clone().unwrap_or_else(|| fallback.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
