//! Labeled evaluation dataset.
//!
//! The dataset file is YAML with a top-level `commands` list; each entry is
//! `{id, command, expected: {domain, action, parameters}}`.  Ids must be
//! unique so that error exports and reports stay joinable across runs; order
//! carries no meaning.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use orko_intent::ExpectedIntent;

use crate::error::{EvalError, Result};

/// One labeled command.
#[derive(Debug, Clone, Deserialize)]
pub struct EvalItem {
    /// Unique item identifier (e.g. `CMD-042`).
    pub id: String,

    /// The natural-language command under evaluation.
    pub command: String,

    /// The labeled parse the engine is expected to produce.
    pub expected: ExpectedIntent,
}

#[derive(Debug, Deserialize)]
struct DatasetFile {
    #[serde(default)]
    commands: Vec<EvalItem>,
}

/// An immutable, validated evaluation dataset.
#[derive(Debug, Clone)]
pub struct EvalDataset {
    items: Vec<EvalItem>,
}

impl EvalDataset {
    /// Load and validate a dataset from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| EvalError::Dataset {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let dataset = Self::from_yaml_str(&raw).map_err(|e| match e {
            EvalError::DuplicateId { id } => EvalError::DuplicateId { id },
            other => EvalError::Dataset {
                path: path.display().to_string(),
                reason: other.to_string(),
            },
        })?;
        info!(path = %path.display(), items = dataset.len(), "evaluation dataset loaded");
        Ok(dataset)
    }

    /// Build a dataset from raw YAML, enforcing id uniqueness.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let file: DatasetFile = serde_yaml::from_str(raw)?;

        let mut seen = std::collections::HashSet::new();
        for item in &file.commands {
            if !seen.insert(item.id.as_str()) {
                return Err(EvalError::DuplicateId {
                    id: item.id.clone(),
                });
            }
        }

        Ok(Self {
            items: file.commands,
        })
    }

    /// The labeled items, in file order.
    pub fn items(&self) -> &[EvalItem] {
        &self.items
    }

    /// Just the command strings (used by the coverage evaluator).
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.command.as_str())
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the dataset holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
