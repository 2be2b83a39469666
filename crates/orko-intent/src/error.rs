//! Parsing pipeline error types.
//!
//! All pipeline subsystems surface errors through [`IntentError`].  Each
//! variant carries enough context for callers to decide how to handle the
//! failure.  Note that an unusable model output is *not* an error: the engine
//! recovers it through the fallback parser and only the completion transport
//! itself can fail.

/// Unified error type for the parsing pipeline.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    // -- Completion errors ---------------------------------------------------
    /// The completion collaborator request failed at the transport level.
    #[error("completion request failed: {reason}")]
    CompletionFailed { reason: String },

    /// The completion API answered with a non-success status.
    #[error("completion API error (status {status}): {message}")]
    CompletionApi { status: u16, message: String },

    /// The completion API response did not contain a usable text choice.
    #[error("malformed completion response: {reason}")]
    MalformedResponse { reason: String },

    // -- Configuration errors ------------------------------------------------
    /// A configuration file could not be read or decoded.
    #[error("config error in {path}: {reason}")]
    Config { path: String, reason: String },

    /// A PII masking pattern failed to compile.
    #[error("invalid masking pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // -- Mapping errors ------------------------------------------------------
    /// No workflow template is registered for the resolved intent key.
    #[error("no workflow template for intent: {intent}")]
    UnknownIntent { intent: String },

    // -- Upstream crate errors -----------------------------------------------
    /// An error propagated from the store crate.
    #[error("store error: {0}")]
    Store(#[from] orko_store::StoreError),

    /// An HTTP transport error from the completion client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    // -- Serialization -------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization failed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Filesystem access failed (config files, telemetry sink).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, IntentError>;
