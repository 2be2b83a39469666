//! Evaluation error types.
//!
//! Evaluation is deliberately forgiving at the item level (a single bad parse
//! must never lose the rest of the batch), so [`EvalError`] only covers the
//! run-level failures: unreadable datasets, broken exports, and persistence.

/// Unified error type for the evaluation crate.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    // -- Dataset errors --------------------------------------------------------
    /// The labeled dataset could not be read or decoded.
    #[error("dataset error in {path}: {reason}")]
    Dataset { path: String, reason: String },

    /// Two dataset items carry the same id.
    #[error("duplicate evaluation item id: {id}")]
    DuplicateId { id: String },

    // -- Upstream crate errors -------------------------------------------------
    /// An error propagated from the parsing pipeline.
    #[error("intent error: {0}")]
    Intent(#[from] orko_intent::IntentError),

    /// An error propagated from the store crate.
    #[error("store error: {0}")]
    Store(#[from] orko_store::StoreError),

    // -- Serialization ---------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization failed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Filesystem access failed (dataset files, error exports).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the evaluation crate.
pub type Result<T> = std::result::Result<T, EvalError>;
