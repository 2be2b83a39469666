//! Human-readable console report for an evaluation run.

use std::fmt::Write;

use crate::evaluator::{EvalSummary, PrfEntry};

/// Accuracy threshold the run is judged against.
pub const TARGET_ACCURACY: f64 = 0.90;

const DIVIDER: &str = "--------------------------------------------------";

/// Render the full run report as one printable string.
pub fn render_report(run_id: &str, summary: &EvalSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{DIVIDER}");
    let _ = writeln!(out, "     ORKO Parser Evaluation - version {}", summary.version);
    let _ = writeln!(out, "{DIVIDER}");
    let _ = writeln!(out, "Run ID:         {run_id}");
    let _ = writeln!(out, "Engine Version: {}", summary.version);
    let _ = writeln!(out, "Total:          {}", summary.total);
    let _ = writeln!(out, "Correct:        {}", summary.correct);
    let _ = writeln!(out, "Accuracy:       {:.4}", summary.accuracy);
    let _ = writeln!(out, "{DIVIDER}");

    let _ = writeln!(out, "Per-Domain Accuracy:");
    for (domain, accuracy) in &summary.per_domain_accuracy {
        let _ = writeln!(out, "  - {domain:20}: {accuracy:.4}");
    }
    let _ = writeln!(out, "{DIVIDER}");

    let _ = writeln!(out, "Error Buckets:");
    for (bucket, count) in &summary.error_buckets {
        let _ = writeln!(out, "  - {bucket:20}: {count}");
    }
    let _ = writeln!(out, "{DIVIDER}");

    let _ = writeln!(out, "Confusion Matrix:");
    for (expected, predicted_map) in &summary.confusion_matrix {
        let _ = writeln!(out, "  {expected}:");
        for (predicted, count) in predicted_map {
            let _ = writeln!(out, "      -> predicted {predicted:20}: {count}");
        }
    }
    let _ = writeln!(out, "{DIVIDER}");

    let _ = writeln!(out, "Per-Domain PRF:");
    write_prf_table(&mut out, &summary.per_domain_prf);
    let _ = writeln!(out, "{DIVIDER}");

    let _ = writeln!(out, "Action-Level PRF:");
    write_prf_table(&mut out, &summary.per_action_prf);
    let _ = writeln!(out, "{DIVIDER}");

    if summary.accuracy < TARGET_ACCURACY {
        let _ = writeln!(
            out,
            "WARNING: Accuracy below target ({:.4} < {TARGET_ACCURACY})",
            summary.accuracy
        );
    } else {
        let _ = writeln!(
            out,
            "OK: Accuracy meets threshold ({:.4} >= {TARGET_ACCURACY})",
            summary.accuracy
        );
    }
    let _ = writeln!(out, "{DIVIDER}");

    out
}

fn write_prf_table(
    out: &mut String,
    table: &std::collections::BTreeMap<String, PrfEntry>,
) {
    for (label, stats) in table {
        let _ = writeln!(out, "  {label}");
        let _ = writeln!(out, "      precision={:.4}", stats.precision);
        let _ = writeln!(out, "      recall   ={:.4}", stats.recall);
        let _ = writeln!(out, "      f1       ={:.4}", stats.f1);
        let _ = writeln!(
            out,
            "      TP={} FP={} FN={}",
            stats.tp, stats.fp, stats.fn_
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
