//! Parse-log persistence for the command parsing pipeline.
//!
//! Every call to the parser engine writes one audit row: the raw command,
//! the full parsed output, and (when a reasoning trace was supplied) its
//! PII-masked form. The engine treats these writes as best-effort; the
//! store itself reports failures normally and leaves the swallowing to
//! the caller.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// A persisted record of one parse call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseLogEntry {
    /// Unique identifier (UUID v7).
    pub id: String,
    /// User the command was parsed for, if known.
    pub user_id: Option<String>,
    /// The raw command text.
    pub command: String,
    /// Full parsed output as JSON.
    pub parsed_output: serde_json::Value,
    /// PII-masked reasoning trace, if the caller supplied one.
    pub masked_reasoning: Option<serde_json::Value>,
    /// Canonical domain of the parse, if resolved.
    pub domain: Option<String>,
    /// Canonical action of the parse, if resolved.
    pub action: Option<String>,
    /// Unix timestamp when the row was written.
    pub created_at: i64,
}

/// Raw row as read from SQLite, before JSON columns are decoded.
struct LogRow {
    id: String,
    user_id: Option<String>,
    command: String,
    parsed_output: String,
    masked_reasoning: Option<String>,
    domain: Option<String>,
    action: Option<String>,
    created_at: i64,
}

impl LogRow {
    fn into_entry(self) -> StoreResult<ParseLogEntry> {
        Ok(ParseLogEntry {
            id: self.id,
            user_id: self.user_id,
            command: self.command,
            parsed_output: serde_json::from_str(&self.parsed_output)?,
            masked_reasoning: self
                .masked_reasoning
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            domain: self.domain,
            action: self.action,
            created_at: self.created_at,
        })
    }
}

const SELECT_COLUMNS: &str =
    "id, user_id, command, parsed_output, masked_reasoning, domain, action, created_at";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LogRow> {
    Ok(LogRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        command: row.get(2)?,
        parsed_output: row.get(3)?,
        masked_reasoning: row.get(4)?,
        domain: row.get(5)?,
        action: row.get(6)?,
        created_at: row.get(7)?,
    })
}

// ═══════════════════════════════════════════════════════════════════════
//  ParseLogStore
// ═══════════════════════════════════════════════════════════════════════

/// Append and query parse-log rows.
#[derive(Clone)]
pub struct ParseLogStore {
    db: Database,
}

impl ParseLogStore {
    /// Create a new parse-log store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record one parse call and return the stored row.
    ///
    /// The caller supplies the identifier so the log id can be carried in
    /// telemetry emitted for the same parse.
    #[instrument(skip(self, parsed_output, masked_reasoning))]
    pub async fn record(
        &self,
        id: &str,
        user_id: Option<&str>,
        command: &str,
        parsed_output: serde_json::Value,
        masked_reasoning: Option<serde_json::Value>,
        domain: Option<&str>,
        action: Option<&str>,
    ) -> StoreResult<ParseLogEntry> {
        let id = id.to_string();
        let user_id = user_id.map(|s| s.to_string());
        let command = command.to_string();
        let domain = domain.map(|s| s.to_string());
        let action = action.map(|s| s.to_string());
        let now = Utc::now().timestamp();

        let parsed_json = serde_json::to_string(&parsed_output)?;
        let reasoning_json = masked_reasoning
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let entry = ParseLogEntry {
            id: id.clone(),
            user_id: user_id.clone(),
            command: command.clone(),
            parsed_output,
            masked_reasoning,
            domain: domain.clone(),
            action: action.clone(),
            created_at: now,
        };

        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO parse_logs (id, user_id, command, parsed_output, masked_reasoning, domain, action, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![id, user_id, command, parsed_json, reasoning_json, domain, action, now],
                )?;
                Ok(())
            })
            .await?;

        debug!(log_id = %entry.id, domain = ?entry.domain, action = ?entry.action, "parse logged");
        Ok(entry)
    }

    /// Fetch a single log row by ID, returning `None` if not found.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> StoreResult<Option<ParseLogEntry>> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                let result = conn.query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM parse_logs WHERE id = ?1"),
                    rusqlite::params![id],
                    map_row,
                );
                match result {
                    Ok(row) => row.into_entry().map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(StoreError::Sqlite(e)),
                }
            })
            .await
    }

    /// List log rows ordered by most recent first, with pagination.
    #[instrument(skip(self))]
    pub async fn recent(&self, limit: i64, offset: i64) -> StoreResult<Vec<ParseLogEntry>> {
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM parse_logs \
                     ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
                ))?;
                let rows = stmt.query_map(rusqlite::params![limit, offset], map_row)?;

                let mut entries = Vec::new();
                for row in rows {
                    entries.push(row?.into_entry()?);
                }
                Ok(entries)
            })
            .await
    }

    /// Count rows for one domain (or all when `domain` is `None`).
    #[instrument(skip(self))]
    pub async fn count(&self, domain: Option<&str>) -> StoreResult<i64> {
        let domain = domain.map(|s| s.to_string());
        self.db
            .execute(move |conn| {
                let count: i64 = match domain {
                    Some(d) => conn.query_row(
                        "SELECT count(*) FROM parse_logs WHERE domain = ?1",
                        rusqlite::params![d],
                        |row| row.get(0),
                    )?,
                    None => {
                        conn.query_row("SELECT count(*) FROM parse_logs", [], |row| row.get(0))?
                    }
                };
                Ok(count)
            })
            .await
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
