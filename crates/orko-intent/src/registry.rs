//! Domain registry: the exemplar catalog and everything derived from it.
//!
//! The registry loads `domains.yml` once and exposes:
//!
//! - the configured domain list (file order preserved),
//! - per-domain worked exemplars used as few-shot turns,
//! - the semi-strict catalogs derived from those exemplars: allowed actions
//!   per domain, allowed parameter names per (domain, action), and canonical
//!   default parameter values (first exemplar listing an action wins),
//! - heuristic domain guessing via the shared [`KeywordIndex`].

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{IntentError, Result};
use crate::keywords::KeywordIndex;

// ---------------------------------------------------------------------------
// Catalog types
// ---------------------------------------------------------------------------

/// The labeled output a worked exemplar should parse to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedIntent {
    /// Expected domain label.
    #[serde(default)]
    pub domain: Option<String>,

    /// Expected canonical action.
    #[serde(default)]
    pub action: Option<String>,

    /// Expected parameters.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// One worked exemplar: a command and its labeled parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainExample {
    /// The natural-language command.
    pub command: String,

    /// The labeled output.
    pub expected: ExpectedIntent,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DomainEntry {
    #[serde(default)]
    examples: Vec<DomainExample>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable registry over the domain exemplar catalog.
pub struct DomainRegistry {
    /// Configured domains, in catalog file order.
    domains: Vec<String>,

    /// Exemplars per domain.
    examples: HashMap<String, Vec<DomainExample>>,

    /// Actions seen in exemplars, per domain (domains with no labeled
    /// actions are absent).
    allowed_actions: HashMap<String, HashSet<String>>,

    /// Parameter names seen across exemplars, per (domain, action).
    allowed_params: HashMap<(String, String), HashSet<String>>,

    /// Canonical default parameter values per (domain, action); the first
    /// exemplar listing the action wins.
    default_params: HashMap<(String, String), Map<String, Value>>,

    /// Shared heuristic index.
    index: Arc<KeywordIndex>,
}

impl DomainRegistry {
    /// Load the catalog from a YAML file.
    pub fn load(path: impl AsRef<Path>, index: Arc<KeywordIndex>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| IntentError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let registry = Self::from_yaml_str(&raw, index).map_err(|e| IntentError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!(
            path = %path.display(),
            domains = registry.domains.len(),
            "domain catalog loaded"
        );
        Ok(registry)
    }

    /// Build the registry from raw catalog YAML.
    ///
    /// The top-level mapping's key order becomes the domain order, which in
    /// turn fixes the few-shot ordering in the prompt.
    pub fn from_yaml_str(raw: &str, index: Arc<KeywordIndex>) -> Result<Self> {
        // Deserialize through a Mapping to keep the file's key order.
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(raw)?;

        let mut domains = Vec::new();
        let mut examples: HashMap<String, Vec<DomainExample>> = HashMap::new();

        for (key, value) in mapping {
            let Some(domain) = key.as_str().map(str::to_string) else {
                continue;
            };
            let entry: DomainEntry = serde_yaml::from_value(value)?;
            domains.push(domain.clone());
            examples.insert(domain, entry.examples);
        }

        let mut allowed_actions: HashMap<String, HashSet<String>> = HashMap::new();
        let mut allowed_params: HashMap<(String, String), HashSet<String>> = HashMap::new();
        let mut default_params: HashMap<(String, String), Map<String, Value>> = HashMap::new();

        for domain in &domains {
            let mut actions = HashSet::new();
            for example in &examples[domain] {
                let Some(action) = example
                    .expected
                    .action
                    .as_deref()
                    .filter(|a| !a.is_empty())
                else {
                    continue;
                };
                actions.insert(action.to_string());

                let key = (domain.clone(), action.to_string());
                allowed_params
                    .entry(key.clone())
                    .or_default()
                    .extend(example.expected.parameters.keys().cloned());
                default_params
                    .entry(key)
                    .or_insert_with(|| example.expected.parameters.clone());
            }
            if !actions.is_empty() {
                allowed_actions.insert(domain.clone(), actions);
            }
        }

        Ok(Self {
            domains,
            examples,
            allowed_actions,
            allowed_params,
            default_params,
            index,
        })
    }

    /// Configured domain names, in catalog order.
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Whether the domain is configured in the catalog.
    pub fn is_known_domain(&self, domain: &str) -> bool {
        self.examples.contains_key(domain)
    }

    /// Exemplars for one domain; empty for unknown domains.
    pub fn examples(&self, domain: &str) -> &[DomainExample] {
        self.examples.get(domain).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Actions with exemplar coverage for a domain.
    pub fn allowed_actions(&self, domain: &str) -> Option<&HashSet<String>> {
        self.allowed_actions.get(domain)
    }

    /// Parameter names with exemplar coverage for a (domain, action) pair.
    pub fn allowed_params(&self, domain: &str, action: &str) -> Option<&HashSet<String>> {
        self.allowed_params
            .get(&(domain.to_string(), action.to_string()))
    }

    /// Canonical default parameter values for a (domain, action) pair.
    pub fn default_params(&self, domain: &str, action: &str) -> Option<&Map<String, Value>> {
        self.default_params
            .get(&(domain.to_string(), action.to_string()))
    }

    /// Heuristic domain guess for a command.
    ///
    /// Delegates to the shared keyword index; when nothing matches, falls
    /// back to `"operations"` if configured, then to the first configured
    /// domain.  The guess is not restricted to configured domains; callers
    /// that need that filter it themselves.
    pub fn guess_domain(&self, command: &str) -> String {
        if let Some(domain) = self.index.guess(command) {
            return domain.to_string();
        }
        if self.domains.iter().any(|d| d == "operations") {
            return "operations".to_string();
        }
        self.domains
            .first()
            .cloned()
            .unwrap_or_else(|| "operations".to_string())
    }

    /// The shared keyword index.
    pub fn keyword_index(&self) -> &Arc<KeywordIndex> {
        &self.index
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
