//! Risk tagging and confirmation flags.
//!
//! Two independent safety signals, computed from two independent configs:
//! [`GuardrailVerbs`] drives the advisory risk level and `guardrail_flags`,
//! while [`RiskPolicy`] drives `requires_confirmation` / `requires_admin`.
//! Both are purely additive tags for downstream dispatch; neither stage ever
//! rewrites the domain or action, and neither can fail a parse.

use std::sync::Arc;

use tracing::debug;

use crate::config::{GuardrailVerbs, RiskPolicy};
use crate::types::{ParsedIntent, RiskLevel};

/// Applies verb-list risk tagging and the confirmation/admin policy.
#[derive(Debug, Clone)]
pub struct GuardrailEngine {
    verbs: Arc<GuardrailVerbs>,
    policy: Arc<RiskPolicy>,
}

impl GuardrailEngine {
    pub fn new(verbs: Arc<GuardrailVerbs>, policy: Arc<RiskPolicy>) -> Self {
        Self { verbs, policy }
    }

    /// Tag the intent's risk level from the action verb and append the
    /// matching guardrail flag.
    ///
    /// Existing flags are preserved and the merge is deduplicated. An absent
    /// action is treated as an unknown verb. Never mutates domain or action.
    pub fn tag_risk(&self, intent: &mut ParsedIntent) {
        let action = intent.action.as_deref().unwrap_or("").to_lowercase();

        let level = if self.verbs.blocked_verbs.contains(&action) {
            intent.context.add_flag("blocked_action");
            RiskLevel::Blocked
        } else if self.verbs.risky_verbs.contains(&action) {
            intent.context.add_flag("risky_action");
            RiskLevel::High
        } else if self.verbs.allowed_verbs.contains(&action) {
            RiskLevel::Low
        } else {
            intent.context.add_flag("unknown_action");
            RiskLevel::Medium
        };

        if level != RiskLevel::Low {
            debug!(action = %action, level = %level, "action risk tagged");
        }
        intent.context.risk_level = Some(level);
    }

    /// Set confirmation/admin requirements from the risk-tier policy.
    ///
    /// Destructive and medium-risk actions require confirmation; high-risk
    /// actions additionally require admin privileges. Flags are only ever
    /// raised here, never cleared.
    pub fn apply_risk_tiers(&self, intent: &mut ParsedIntent) {
        let action = intent.action.as_deref().unwrap_or("").to_lowercase();

        if self.policy.destructive_verbs.contains(&action) {
            intent.context.requires_confirmation = true;
        }
        if self.policy.risk_tiers.medium_risk.contains(&action) {
            intent.context.requires_confirmation = true;
        }
        if self.policy.risk_tiers.high_risk.contains(&action) {
            intent.context.requires_confirmation = true;
            intent.context.requires_admin = true;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
