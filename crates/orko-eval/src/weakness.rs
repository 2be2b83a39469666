//! Domain weakness detection over an evaluation summary.
//!
//! Grades each domain that appears in the per-domain PRF table with a
//! weighted weakness score built from threshold checks, false-negative
//! pressure, misclassification density, drift against the confusion row, and
//! confusion clustering.  The output is structured for reports, dashboards,
//! and the pattern-mining pipeline.

use serde::{Deserialize, Serialize};

use crate::evaluator::EvalSummary;

/// Graded severity of a domain weakness, ordered weakest-first so that
/// `Critical > High > Medium > Low > Healthy` holds under derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Healthy,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    fn grade(score: f64) -> Self {
        if score >= 2.5 {
            Severity::Critical
        } else if score >= 1.6 {
            Severity::High
        } else if score >= 0.9 {
            Severity::Medium
        } else if score > 0.0 {
            Severity::Low
        } else {
            Severity::Healthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Healthy => "healthy",
        }
    }
}

/// One domain the model frequently mislabels a weak domain as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusedWith {
    pub domain: String,
    pub count: u64,
}

/// The full weakness analysis for one domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainWeakness {
    pub domain: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub tp: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
    pub severity: Severity,
    /// Weighted score, rounded to four decimals.
    pub weakness_score: f64,
    pub reasons: Vec<String>,
    /// Top three off-diagonal entries of the domain's confusion row.
    pub confused_with: Vec<ConfusedWith>,
    pub recommended_actions: Vec<String>,
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Analyze every domain in the summary's PRF table.
///
/// Results are sorted most severe first; within a severity band the PRF
/// table's alphabetical order is preserved.
pub fn detect_weak_domains(summary: &EvalSummary) -> Vec<DomainWeakness> {
    let mut results: Vec<DomainWeakness> = summary
        .per_domain_prf
        .iter()
        .map(|(domain, prf)| analyze_domain(summary, domain, prf))
        .collect();

    results.sort_by(|a, b| b.severity.cmp(&a.severity));
    results
}

fn analyze_domain(
    summary: &EvalSummary,
    domain: &str,
    prf: &crate::evaluator::PrfEntry,
) -> DomainWeakness {
    let mut reasons = Vec::new();
    let mut score = 0.0;

    // Threshold checks.
    if prf.f1 < 0.80 {
        reasons.push("Low F1 score".to_string());
        score += (0.80 - prf.f1) * 1.2;
    }
    if prf.precision < 0.75 {
        reasons.push("Low precision".to_string());
        score += (0.75 - prf.precision) * 1.0;
    }
    if prf.recall < 0.75 {
        reasons.push("Low recall (likely high FN)".to_string());
        score += (0.75 - prf.recall) * 1.1;
    }

    // Missed assignments weigh more than spurious ones.
    if prf.fn_ > prf.fp {
        score += (((prf.fn_ - prf.fp) as f64) * 0.05).min(1.0);
        reasons.push("High false-negative rate".to_string());
    }

    // Misclassification density relative to all touches of the label.
    let denom = prf.tp + prf.fp + prf.fn_;
    if denom > 0 {
        let density = (prf.fp + prf.fn_) as f64 / denom as f64;
        score += density * 0.6;
        if density > 0.4 {
            reasons.push("Significant misclassification density".to_string());
        }
    }

    // Drift: the domain's confusion row barely lands on the diagonal.
    let row = summary.confusion_matrix.get(domain);
    let row_total: u64 = row.map(|r| r.values().sum()).unwrap_or(0);
    if row_total > 0 && (prf.tp as f64) / (row_total as f64) < 0.4 {
        reasons.push("Domain drift detected (low TP ratio)".to_string());
        score += 0.7;
    }

    // Confusion clustering: off-diagonal row entries by frequency.
    let mut confused_with: Vec<ConfusedWith> = row
        .map(|r| {
            r.iter()
                .filter(|(predicted, _)| predicted.as_str() != domain)
                .map(|(predicted, count)| ConfusedWith {
                    domain: predicted.clone(),
                    count: *count,
                })
                .collect()
        })
        .unwrap_or_default();
    confused_with.sort_by(|a, b| b.count.cmp(&a.count));

    if let Some(top) = confused_with.first() {
        reasons.push(format!("Frequently confused with '{}'", top.domain));
        score += (top.count as f64 * 0.1).min(1.0);
    }
    confused_with.truncate(3);

    let severity = Severity::grade(score);

    let mut actions = Vec::new();
    if severity >= Severity::High {
        actions.push("Add 5-10 new training examples for this domain".to_string());
        actions.push("Review prompt+guardrail patterns for this domain".to_string());
    }
    if prf.fp > prf.fn_ {
        actions.push("Improve domain boundary classification patterns".to_string());
    }
    if prf.fn_ > prf.fp {
        actions.push("Add slot rules to reduce false negatives".to_string());
    }
    if severity == Severity::Critical {
        actions.push("Urgent: add explicit few-shot examples for this domain".to_string());
        actions.push("Manually inspect confusion_matrix for domain drift".to_string());
    }

    DomainWeakness {
        domain: domain.to_string(),
        precision: prf.precision,
        recall: prf.recall,
        f1: prf.f1,
        tp: prf.tp,
        fp: prf.fp,
        fn_: prf.fn_,
        severity,
        weakness_score: round4(score),
        reasons,
        confused_with,
        recommended_actions: actions,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
