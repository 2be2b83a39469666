//! Persisting evaluation summaries as metrics rows.

use tracing::info;
use uuid::Uuid;

use orko_store::{MetricsRecord, MetricsStore, NewMetrics};

use crate::error::Result;
use crate::evaluator::EvalSummary;

/// Writes one metrics row per evaluation run.
#[derive(Clone)]
pub struct MetricsWriter {
    store: MetricsStore,
}

impl MetricsWriter {
    pub fn new(store: MetricsStore) -> Self {
        Self { store }
    }

    /// Persist a summary under `run_id`, minting a fresh UUID when the caller
    /// supplies none, and return the stored row.
    pub async fn save(&self, summary: &EvalSummary, run_id: Option<&str>) -> Result<MetricsRecord> {
        let run_id = run_id
            .map(String::from)
            .unwrap_or_else(|| Uuid::now_v7().to_string());

        let metrics = NewMetrics {
            total: summary.total as i64,
            correct: summary.correct as i64,
            accuracy: summary.accuracy,
            per_domain_accuracy: Some(serde_json::to_value(&summary.per_domain_accuracy)?),
            per_action: Some(serde_json::to_value(&summary.per_action_prf)?),
            engine_version: Some(summary.version.clone()),
            error_buckets: Some(serde_json::to_value(&summary.error_buckets)?),
            confusion_matrix: Some(serde_json::to_value(&summary.confusion_matrix)?),
            per_domain_prf: Some(serde_json::to_value(&summary.per_domain_prf)?),
        };

        let record = self.store.save(&run_id, metrics).await?;
        info!(run_id = %record.run_id, accuracy = record.accuracy, "metrics row written");
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
