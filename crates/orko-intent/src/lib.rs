//! Natural-language command parsing for ORKO.
//!
//! This crate implements the core parsing pipeline: it turns a free-form
//! operator command into a canonical `(domain, action, parameters)` intent,
//! tags it with guardrail metadata, and maps it onto a workflow binding.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌────────────┐
//! │ Raw Intent   │────>│ Canonicalizer │────>│ Guardrails │
//! │ Parser (LLM) │     │ (taxonomy)    │     │ (risk)     │
//! └──────┬───────┘     └───────────────┘     └─────┬──────┘
//!        │ hard failure                            │
//! ┌──────┴───────┐                          ┌──────┴──────┐
//! │  Heuristic   │                          │   Intent    │
//! │  Fallback    │                          │   Mapper    │
//! └──────────────┘                          └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] -- The parse pipeline facade.
//! - [`raw_parser`] -- Few-shot LLM parsing of raw commands.
//! - [`canonical`] -- Domain and action taxonomy normalization.
//! - [`guardrails`] -- Risk tagging and confirmation flags.
//! - [`mapper`] -- Intent to workflow resolution.
//! - [`slots`] -- Layered slot filling.
//! - [`registry`] -- The domain example catalog.
//! - [`completion`] -- Text-completion client and wire types.
//! - [`masking`] -- PII masking for logged reasoning traces.
//! - [`telemetry`] -- JSONL telemetry sink.
//! - [`error`] -- Pipeline error types.

pub mod canonical;
pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod guardrails;
pub mod keywords;
pub mod mapper;
pub mod masking;
pub mod raw_parser;
pub mod registry;
pub mod slots;
pub mod telemetry;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use canonical::{canonicalize_action, is_canonical_domain, Canonicalizer, CANONICAL_DOMAINS};
pub use completion::{CompletionClient, CompletionConfig, HttpCompletionClient, Message, Role};
pub use config::{
    GuardrailVerbs, ParserConfig, PromptVersions, RiskPolicy, WorkflowTemplate, WorkflowTemplates,
};
pub use engine::{ParserEngine, DEFAULT_DOMAIN, FALLBACK_CONFIDENCE};
pub use error::{IntentError, Result};
pub use guardrails::GuardrailEngine;
pub use keywords::KeywordIndex;
pub use mapper::IntentMapper;
pub use masking::PiiMasker;
pub use raw_parser::RawIntentParser;
pub use registry::{DomainExample, DomainRegistry, ExpectedIntent};
pub use slots::{SlotFill, SlotFillingEngine};
pub use telemetry::TelemetrySink;
pub use types::{
    AmbiguousValue, FallbackReason, IntentContext, MappedIntent, ParseOutcome, ParsedIntent,
    PromptVersionTag, RiskLevel, WorkflowBinding, WorkflowIntent,
};
