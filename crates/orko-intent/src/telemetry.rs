//! JSONL telemetry sink.
//!
//! Events append to one file per event type under the sink directory.
//! Emission is best-effort: a failed write is logged and swallowed, so
//! telemetry can never fail a parse or a mapping call.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::types::ParsedIntent;

/// Append-only telemetry writer, one JSONL file per event type.
#[derive(Debug, Clone)]
pub struct TelemetrySink {
    dir: PathBuf,
}

impl TelemetrySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the sink writes into.
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Append one event, stamped with the current epoch-seconds timestamp.
    pub fn record(&self, event_type: &str, mut payload: Map<String, Value>) {
        payload.insert("timestamp".into(), json!(epoch_seconds()));
        if let Err(e) = self.append(event_type, &payload) {
            warn!(event_type, error = %e, "telemetry write failed");
        }
    }

    /// Record the outcome of one parse call.
    pub fn record_parser(&self, intent: &ParsedIntent) {
        let mut payload = Map::new();
        payload.insert("raw_command".into(), json!(intent.raw_text));
        payload.insert(
            "parsed".into(),
            serde_json::to_value(intent).unwrap_or(Value::Null),
        );
        payload.insert("domain".into(), json!(intent.domain));
        payload.insert("action".into(), json!(intent.action));
        payload.insert(
            "context".into(),
            serde_json::to_value(&intent.context).unwrap_or(Value::Null),
        );
        self.record("parser", payload);
    }

    fn append(&self, event_type: &str, payload: &Map<String, Value>) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{event_type}.jsonl"));
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let line = serde_json::to_string(payload)?;
        writeln!(file, "{line}")
    }
}

/// Seconds since the Unix epoch; 0.0 if the clock reads before it.
fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
