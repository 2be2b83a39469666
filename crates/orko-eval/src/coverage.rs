//! Coverage evaluation: does the engine land on *some* domain and action?
//!
//! Unlike the accuracy evaluator this makes no expected-label comparison; a
//! command is covered when the parse carries both a non-empty domain and a
//! non-empty action.  Useful as a cheap smoke signal over a command list
//! before labeled evaluation exists for it.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use orko_intent::ParserEngine;

/// One command's coverage verdict.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageResult {
    pub command: String,
    pub parsed: Value,
    pub ok: bool,
}

/// Coverage over a full command list.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub total: u64,
    pub covered: u64,
    /// covered / total, 0.0 for an empty list.
    pub coverage: f64,
    pub results: Vec<CoverageResult>,
    /// The uncovered subset, repeated for quick inspection.
    pub ambiguous: Vec<CoverageResult>,
}

/// Parse every command with an empty context and report coverage.
pub async fn run_coverage<I, S>(engine: &ParserEngine, commands: I) -> CoverageReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut results = Vec::new();
    let mut ambiguous = Vec::new();
    let mut covered = 0u64;

    for command in commands {
        let command = command.as_ref();
        let parsed = engine.parse_command(command, &Map::new(), None).await;

        let ok = parsed.domain.as_deref().is_some_and(|d| !d.is_empty())
            && parsed.action.as_deref().is_some_and(|a| !a.is_empty());

        let result = CoverageResult {
            command: command.to_string(),
            parsed: serde_json::to_value(&parsed).unwrap_or(Value::Null),
            ok,
        };

        if ok {
            covered += 1;
        } else {
            ambiguous.push(result.clone());
        }
        results.push(result);
    }

    let total = results.len() as u64;
    let coverage = if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    };

    info!(total, covered, coverage, "coverage run complete");
    CoverageReport {
        total,
        covered,
        coverage,
        results,
        ambiguous,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
