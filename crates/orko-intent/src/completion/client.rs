//! HTTP client for OpenAI-compatible chat completion endpoints.
//!
//! Covers the **OpenAI Chat Completions API** and compatible endpoints such
//! as Ollama, Together, and vLLM. Parsing calls are always non-streaming and
//! run at temperature zero so repeated parses of the same command stay
//! stable.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::debug;

use crate::completion::types::{CompletionClient, Message};
use crate::error::{IntentError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default OpenAI API base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model for parsing requests.
const DEFAULT_MODEL: &str = "gpt-4.1-mini";

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to a single chat completion endpoint.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API (e.g. `https://api.openai.com/v1`).
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens per response.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl CompletionConfig {
    /// Create a configuration for the OpenAI API with the default parsing
    /// model.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            max_tokens: 1024,
            temperature: 0.0,
        }
    }

    /// Create a configuration for any OpenAI-compatible API (e.g. Ollama,
    /// Together, vLLM).
    pub fn openai_compatible(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A completion client for the OpenAI Chat Completions API.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    config: CompletionConfig,
    http: reqwest::Client,
}

impl HttpCompletionClient {
    /// Create a new client with the given configuration.
    pub fn new(config: CompletionConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(IntentError::CompletionFailed {
                reason: "missing API key".into(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| IntentError::CompletionFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { config, http })
    }

    /// Build the JSON body for the Chat Completions API.
    fn build_request_body(&self, messages: &[Message]) -> Value {
        json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = self.build_request_body(messages);

        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", self.config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| IntentError::CompletionFailed {
                reason: format!("invalid authorization header: {e}"),
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!(url = %url, model = %self.config.model, "sending completion request");

        let resp = self
            .http
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| IntentError::CompletionFailed {
                reason: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(IntentError::CompletionApi {
                status: status.as_u16(),
                message: text,
            });
        }

        let v: Value = serde_json::from_str(&text).map_err(|e| IntentError::MalformedResponse {
            reason: format!("invalid JSON response: {e}"),
        })?;

        extract_message_content(&v)
    }
}

/// Pull `choices[0].message.content` out of a Chat Completions response.
fn extract_message_content(v: &Value) -> Result<String> {
    let message = &v["choices"][0]["message"];

    if message.is_null() {
        return Err(IntentError::MalformedResponse {
            reason: "missing `choices[0].message` in response".into(),
        });
    }

    let content = message["content"]
        .as_str()
        .ok_or_else(|| IntentError::MalformedResponse {
            reason: "missing `choices[0].message.content` in response".into(),
        })?;

    Ok(content.to_owned())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
