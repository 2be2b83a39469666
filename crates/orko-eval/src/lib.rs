//! Offline evaluation for the ORKO parsing core.
//!
//! Everything in this crate runs after the fact: it replays labeled or
//! unlabeled command sets through a [`orko_intent::ParserEngine`], scores the
//! output, persists the run, and mines the failures for systematic issues.
//!
//! ## Pipeline
//!
//! ```text
//! dataset ──> Evaluator ──> EvalSummary ──> MetricsWriter (SQLite row)
//!                │                │
//!                │                └──> detect_weak_domains / render_report
//!                └──> export_errors (JSONL)
//!                          │
//!                          └──> PatternMiner ──> suggest_guardrails
//!                                                      └──> suggest_few_shots
//! ```
//!
//! ## Modules
//!
//! - [`dataset`] -- Labeled evaluation dataset loading.
//! - [`evaluator`] -- Accuracy scoring, PRF analytics, error export.
//! - [`weakness`] -- Domain weakness detection and severity grading.
//! - [`miner`] -- Error pattern mining over exported mismatches.
//! - [`generators`] -- Guardrail and few-shot suggestion generation.
//! - [`coverage`] -- Label-free coverage smoke evaluation.
//! - [`failures`] -- Coarse failure categorization for triage.
//! - [`metrics_writer`] -- Summary persistence as metrics rows.
//! - [`report`] -- Console run report rendering.
//! - [`error`] -- Evaluation error types.

pub mod coverage;
pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod failures;
pub mod generators;
pub mod metrics_writer;
pub mod miner;
pub mod report;
pub mod weakness;

pub use coverage::{run_coverage, CoverageReport, CoverageResult};
pub use dataset::{EvalDataset, EvalItem};
pub use error::{EvalError, Result};
pub use evaluator::{
    export_errors, summarize, ErrorRecord, ErrorType, EvalResult, EvalSummary, Evaluator, PrfEntry,
};
pub use failures::{categorize, categorize_failures, FailureBreakdown, FailureCategory};
pub use generators::{
    suggest_few_shots, suggest_guardrails, FewShotCandidate, GuardrailSuggestions,
};
pub use metrics_writer::MetricsWriter;
pub use miner::{MinedPatterns, MissingParameter, PatternMiner};
pub use report::{render_report, TARGET_ACCURACY};
pub use weakness::{detect_weak_domains, ConfusedWith, DomainWeakness, Severity};
