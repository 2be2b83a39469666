//! Chat completion layer.
//!
//! The parser talks to one OpenAI-compatible chat completions endpoint, always
//! non-streaming. This module is organized into:
//!
//! - [`types`] -- Message types and the [`CompletionClient`] trait.
//! - [`client`] -- HTTP client for OpenAI-compatible endpoints.

pub mod client;
pub mod types;

// Re-export the most commonly used types for convenience.
pub use client::{CompletionConfig, HttpCompletionClient};
pub use types::{CompletionClient, Message, Role};
