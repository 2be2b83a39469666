//! Pipeline configuration objects.
//!
//! All configuration is loaded once at startup into immutable objects and
//! injected into the components that need it (wrapped in `Arc` when shared).
//! Nothing here is reloaded at runtime; changing a config file requires a
//! restart.
//!
//! Two safety configs are deliberately independent: [`GuardrailVerbs`] drives
//! risk *tagging* (allowed/risky/blocked lists) while [`RiskPolicy`] drives
//! the confirmation/admin *flags* (destructive verbs and risk tiers).  They
//! are loaded from separate files and consulted by separate pipeline stages.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{IntentError, Result};
use crate::types::PromptVersionTag;

/// Canonical file names under the config directory.
pub const DOMAINS_FILE: &str = "domains.yml";
pub const GUARDRAILS_FILE: &str = "guardrails.json";
pub const RISK_POLICY_FILE: &str = "risk_policy.json";
pub const PROMPT_VERSIONS_FILE: &str = "prompt_versions.json";
pub const WORKFLOWS_FILE: &str = "workflows.json";

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

pub(crate) fn read_json<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let raw = std::fs::read_to_string(path).map_err(|e| IntentError::Config {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| IntentError::Config {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn read_yaml<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let raw = std::fs::read_to_string(path).map_err(|e| IntentError::Config {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_yaml::from_str(&raw).map_err(|e| IntentError::Config {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Guardrail verb lists
// ---------------------------------------------------------------------------

/// Verb lists for risk tagging (`guardrails.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuardrailVerbs {
    /// Actions considered routine (risk low).
    #[serde(default)]
    pub allowed_verbs: HashSet<String>,

    /// Actions that warrant scrutiny (risk high + `risky_action` flag).
    #[serde(default)]
    pub risky_verbs: HashSet<String>,

    /// Actions that must never execute (risk blocked + `blocked_action` flag).
    #[serde(default)]
    pub blocked_verbs: HashSet<String>,
}

impl GuardrailVerbs {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let verbs: Self = read_json(path.as_ref())?;
        info!(
            allowed = verbs.allowed_verbs.len(),
            risky = verbs.risky_verbs.len(),
            blocked = verbs.blocked_verbs.len(),
            "guardrail verb lists loaded"
        );
        Ok(verbs)
    }
}

// ---------------------------------------------------------------------------
// Risk policy
// ---------------------------------------------------------------------------

/// Action sets per risk tier (`risk_policy.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskTiers {
    /// Actions that force confirmation and admin privileges.
    #[serde(default)]
    pub high_risk: HashSet<String>,

    /// Actions that force confirmation only.
    #[serde(default)]
    pub medium_risk: HashSet<String>,
}

/// Confirmation/admin policy, independent of the verb lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskPolicy {
    /// Destructive verbs always require confirmation.
    #[serde(default, alias = "unsafe_action_verbs")]
    pub destructive_verbs: HashSet<String>,

    /// Tiered action sets.
    #[serde(default)]
    pub risk_tiers: RiskTiers,
}

impl RiskPolicy {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Prompt versions
// ---------------------------------------------------------------------------

/// Per-domain prompt version tags (`prompt_versions.json`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct PromptVersions {
    versions: HashMap<String, PromptVersionTag>,
}

impl PromptVersions {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path.as_ref())
    }

    /// The tag for a domain; unknown domains get the default tag (version 1,
    /// no update date).
    pub fn tag_for(&self, domain: &str) -> PromptVersionTag {
        self.versions.get(domain).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Workflow templates
// ---------------------------------------------------------------------------

/// One workflow template entry (`workflows.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowTemplate {
    /// Base workflow to dispatch to.
    pub workflow_name: String,

    /// Parameters that must be resolved for a confident mapping.
    #[serde(default, alias = "required_params")]
    pub required_parameters: Vec<String>,

    /// Template-level default parameter values (lowest priority).
    #[serde(default)]
    pub defaults: Map<String, Value>,

    /// Override workflow when the intent requires admin privileges.
    #[serde(default)]
    pub admin_workflow: Option<String>,

    /// Override workflow for high-risk intents.
    #[serde(default)]
    pub elevated_workflow: Option<String>,
}

/// The full intent-key → template table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct WorkflowTemplates {
    templates: HashMap<String, WorkflowTemplate>,
}

impl WorkflowTemplates {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let templates: Self = read_json(path.as_ref())?;
        info!(count = templates.templates.len(), "workflow templates loaded");
        Ok(templates)
    }

    /// Look up a template by exact key.
    pub fn get(&self, key: &str) -> Option<&WorkflowTemplate> {
        self.templates.get(key)
    }

    /// Resolve an intent to a template: `"{domain}.{name}"` first (domain
    /// defaulting to `general`), then the bare name.
    pub fn resolve(&self, domain: Option<&str>, name: &str) -> Option<&WorkflowTemplate> {
        let domain = domain.unwrap_or("general");
        let composite = format!("{domain}.{name}");
        self.templates
            .get(&composite)
            .or_else(|| self.templates.get(name))
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True when no templates are registered.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Everything the engine needs from the config directory, loaded once.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Verb lists for risk tagging.
    pub guardrails: Arc<GuardrailVerbs>,
    /// Confirmation/admin policy.
    pub risk_policy: Arc<RiskPolicy>,
    /// Per-domain prompt version tags.
    pub prompt_versions: Arc<PromptVersions>,
    /// Intent-key → workflow template table.
    pub workflows: Arc<WorkflowTemplates>,
}

impl ParserConfig {
    /// Load all pipeline config files from one directory.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        info!(dir = %dir.display(), "loading parser configuration");
        Ok(Self {
            guardrails: Arc::new(GuardrailVerbs::load(dir.join(GUARDRAILS_FILE))?),
            risk_policy: Arc::new(RiskPolicy::load(dir.join(RISK_POLICY_FILE))?),
            prompt_versions: Arc::new(PromptVersions::load(dir.join(PROMPT_VERSIONS_FILE))?),
            workflows: Arc::new(WorkflowTemplates::load(dir.join(WORKFLOWS_FILE))?),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
