//! Binary settings: an optional TOML file merged with the environment.
//!
//! Resolution per field is environment variable first, then the settings
//! file. The file lives in the config directory and is optional; a missing
//! file behaves like an empty one. The api key is normally supplied through
//! the environment rather than the file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// File name under the config directory.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Completion endpoint settings for the `orko` binary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// API key for the completion endpoint. `OPENAI_API_KEY` overrides.
    pub api_key: Option<String>,
    /// Model name. `ORKO_MODEL` overrides.
    pub model: Option<String>,
    /// Base URL of an OpenAI-compatible endpoint. `ORKO_BASE_URL` overrides.
    pub base_url: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings {}", path.display()))
    }

    /// Overlay the environment; set variables win over file values.
    pub fn merge_env(self) -> Self {
        let var = |key: &str| std::env::var(key).ok();
        self.overlay(var("OPENAI_API_KEY"), var("ORKO_MODEL"), var("ORKO_BASE_URL"))
    }

    fn overlay(
        mut self,
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        if api_key.is_some() {
            self.api_key = api_key;
        }
        if model.is_some() {
            self.model = model;
        }
        if base_url.is_some() {
            self.base_url = base_url;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
