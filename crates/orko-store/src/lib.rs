//! # orko-store
//!
//! Storage layer for the ORKO parsing core.
//!
//! Provides SQLite-backed persistence for the two audit artifacts the
//! parsing pipeline produces: per-call parse logs (with PII-masked
//! reasoning traces) and per-run evaluation metrics keyed by `run_id`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  ParseLogStore   (one row per parse)    │
//! │  MetricsStore    (one row per eval run) │
//! ├─────────────────────────────────────────┤
//! │  Database (rusqlite WAL, spawn_blocking)│
//! │  Migrations (versioned, transactional)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use orko_store::{Database, MetricsStore, ParseLogStore};
//!
//! let db = Database::open_and_migrate("data/orko.db").await?;
//! let logs = ParseLogStore::new(db.clone());
//! let metrics = MetricsStore::new(db);
//! ```

pub mod db;
pub mod error;
pub mod metrics;
pub mod migration;
pub mod parse_log;

// ── re-exports ───────────────────────────────────────────────────────

pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use metrics::{MetricsRecord, MetricsStore, NewMetrics};
pub use parse_log::{ParseLogEntry, ParseLogStore};
