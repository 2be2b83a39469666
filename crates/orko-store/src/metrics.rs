//! Evaluation metrics persistence.
//!
//! Each evaluation run writes one row keyed by `run_id`: core counts
//! (total/correct/accuracy) plus richer JSON blobs: per-domain accuracy,
//! error buckets, the confusion matrix, and per-domain / per-action
//! precision-recall-F1 tables. Blob columns are nullable so older rows
//! written by earlier engine versions stay readable.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// A persisted evaluation metrics row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Unique row identifier (UUID v7).
    pub id: String,
    /// Logical run identifier for grouping runs (CI runs, nightly evals).
    pub run_id: String,
    /// Number of evaluated items.
    pub total: i64,
    /// Number of fully correct items.
    pub correct: i64,
    /// correct / total, 0.0 for an empty run.
    pub accuracy: f64,
    /// Domain → accuracy ratio.
    pub per_domain_accuracy: Option<serde_json::Value>,
    /// Action-level precision/recall/F1 table.
    pub per_action: Option<serde_json::Value>,
    /// Engine version tag of the run (e.g. "v7").
    pub engine_version: Option<String>,
    /// Error-type → count buckets.
    pub error_buckets: Option<serde_json::Value>,
    /// Expected-domain → predicted-domain → count.
    pub confusion_matrix: Option<serde_json::Value>,
    /// Domain-level precision/recall/F1 + tp/fp/fn counts.
    pub per_domain_prf: Option<serde_json::Value>,
    /// Unix timestamp when the row was written.
    pub created_at: i64,
}

/// Inputs for one metrics row; identifiers and timestamp are filled in
/// by [`MetricsStore::save`].
#[derive(Debug, Clone, Default)]
pub struct NewMetrics {
    pub total: i64,
    pub correct: i64,
    pub accuracy: f64,
    pub per_domain_accuracy: Option<serde_json::Value>,
    pub per_action: Option<serde_json::Value>,
    pub engine_version: Option<String>,
    pub error_buckets: Option<serde_json::Value>,
    pub confusion_matrix: Option<serde_json::Value>,
    pub per_domain_prf: Option<serde_json::Value>,
}

struct MetricsRow {
    id: String,
    run_id: String,
    total: i64,
    correct: i64,
    accuracy: f64,
    per_domain_accuracy: Option<String>,
    per_action: Option<String>,
    engine_version: Option<String>,
    error_buckets: Option<String>,
    confusion_matrix: Option<String>,
    per_domain_prf: Option<String>,
    created_at: i64,
}

impl MetricsRow {
    fn into_record(self) -> StoreResult<MetricsRecord> {
        fn decode(col: Option<String>) -> StoreResult<Option<serde_json::Value>> {
            col.as_deref().map(serde_json::from_str).transpose().map_err(Into::into)
        }

        Ok(MetricsRecord {
            id: self.id,
            run_id: self.run_id,
            total: self.total,
            correct: self.correct,
            accuracy: self.accuracy,
            per_domain_accuracy: decode(self.per_domain_accuracy)?,
            per_action: decode(self.per_action)?,
            engine_version: self.engine_version,
            error_buckets: decode(self.error_buckets)?,
            confusion_matrix: decode(self.confusion_matrix)?,
            per_domain_prf: decode(self.per_domain_prf)?,
            created_at: self.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, run_id, total, correct, accuracy, per_domain_accuracy, \
                              per_action, engine_version, error_buckets, confusion_matrix, \
                              per_domain_prf, created_at";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MetricsRow> {
    Ok(MetricsRow {
        id: row.get(0)?,
        run_id: row.get(1)?,
        total: row.get(2)?,
        correct: row.get(3)?,
        accuracy: row.get(4)?,
        per_domain_accuracy: row.get(5)?,
        per_action: row.get(6)?,
        engine_version: row.get(7)?,
        error_buckets: row.get(8)?,
        confusion_matrix: row.get(9)?,
        per_domain_prf: row.get(10)?,
        created_at: row.get(11)?,
    })
}

// ═══════════════════════════════════════════════════════════════════════
//  MetricsStore
// ═══════════════════════════════════════════════════════════════════════

/// Save and query evaluation metrics rows.
#[derive(Clone)]
pub struct MetricsStore {
    db: Database,
}

impl MetricsStore {
    /// Create a new metrics store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist one evaluation run under `run_id` and return the stored row.
    #[instrument(skip(self, metrics))]
    pub async fn save(&self, run_id: &str, metrics: NewMetrics) -> StoreResult<MetricsRecord> {
        let id = Uuid::now_v7().to_string();
        let run_id = run_id.to_string();
        let now = Utc::now().timestamp();

        fn encode(v: &Option<serde_json::Value>) -> StoreResult<Option<String>> {
            v.as_ref().map(serde_json::to_string).transpose().map_err(Into::into)
        }

        let per_domain_accuracy = encode(&metrics.per_domain_accuracy)?;
        let per_action = encode(&metrics.per_action)?;
        let error_buckets = encode(&metrics.error_buckets)?;
        let confusion_matrix = encode(&metrics.confusion_matrix)?;
        let per_domain_prf = encode(&metrics.per_domain_prf)?;

        let record = MetricsRecord {
            id: id.clone(),
            run_id: run_id.clone(),
            total: metrics.total,
            correct: metrics.correct,
            accuracy: metrics.accuracy,
            per_domain_accuracy: metrics.per_domain_accuracy,
            per_action: metrics.per_action,
            engine_version: metrics.engine_version.clone(),
            error_buckets: metrics.error_buckets,
            confusion_matrix: metrics.confusion_matrix,
            per_domain_prf: metrics.per_domain_prf,
            created_at: now,
        };

        let engine_version = metrics.engine_version;
        let (total, correct, accuracy) = (metrics.total, metrics.correct, metrics.accuracy);

        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO parser_metrics (id, run_id, total, correct, accuracy, \
                     per_domain_accuracy, per_action, engine_version, error_buckets, \
                     confusion_matrix, per_domain_prf, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    rusqlite::params![
                        id,
                        run_id,
                        total,
                        correct,
                        accuracy,
                        per_domain_accuracy,
                        per_action,
                        engine_version,
                        error_buckets,
                        confusion_matrix,
                        per_domain_prf,
                        now
                    ],
                )?;
                Ok(())
            })
            .await?;

        debug!(run_id = %record.run_id, accuracy = record.accuracy, "metrics saved");
        Ok(record)
    }

    /// Fetch the metrics row for one run, returning `None` if not found.
    #[instrument(skip(self))]
    pub async fn get_by_run(&self, run_id: &str) -> StoreResult<Option<MetricsRecord>> {
        let run_id = run_id.to_string();
        self.db
            .execute(move |conn| {
                let result = conn.query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM parser_metrics WHERE run_id = ?1"),
                    rusqlite::params![run_id],
                    map_row,
                );
                match result {
                    Ok(row) => row.into_record().map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(StoreError::Sqlite(e)),
                }
            })
            .await
    }

    /// List metrics rows ordered by most recent first.
    #[instrument(skip(self))]
    pub async fn recent(&self, limit: i64) -> StoreResult<Vec<MetricsRecord>> {
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM parser_metrics \
                     ORDER BY created_at DESC, id DESC LIMIT ?1"
                ))?;
                let rows = stmt.query_map(rusqlite::params![limit], map_row)?;

                let mut records = Vec::new();
                for row in rows {
                    records.push(row?.into_record()?);
                }
                Ok(records)
            })
            .await
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
