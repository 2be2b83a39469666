//! Intent to workflow mapping.
//!
//! Resolves a canonical intent against the workflow-template table, fills
//! its slots, and selects the target workflow with guardrail-aware routing.
//! Unlike parse-quality problems, a missing template is a configuration gap
//! and is surfaced as an error.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::config::{WorkflowTemplate, WorkflowTemplates};
use crate::error::{IntentError, Result};
use crate::slots::SlotFillingEngine;
use crate::telemetry::TelemetrySink;
use crate::types::{MappedIntent, RiskLevel, WorkflowIntent};

/// Mapper result-format version.
const MAPPER_VERSION: &str = "v7";

/// Workflow every blocked action routes to, regardless of template.
const BLOCKED_WORKFLOW: &str = "blocked_action_workflow";

/// Maps canonical intents onto workflow bindings.
#[derive(Debug, Clone)]
pub struct IntentMapper {
    templates: Arc<WorkflowTemplates>,
    slots: SlotFillingEngine,
    telemetry: Arc<TelemetrySink>,
}

impl IntentMapper {
    pub fn new(templates: Arc<WorkflowTemplates>, telemetry: Arc<TelemetrySink>) -> Self {
        Self {
            templates,
            slots: SlotFillingEngine::new(Arc::clone(&telemetry)),
            telemetry,
        }
    }

    /// Map an intent onto its workflow.
    ///
    /// The template key is resolved as `"{domain}.{name}"` first, then the
    /// bare name; engine-built names already carry the domain prefix and
    /// resolve through the bare branch. Errors with
    /// [`IntentError::UnknownIntent`] when neither key exists.
    pub fn map(
        &self,
        intent: &WorkflowIntent,
        context: &Map<String, Value>,
    ) -> Result<MappedIntent> {
        let template = self
            .templates
            .resolve(intent.domain.as_deref(), &intent.name)
            .ok_or_else(|| IntentError::UnknownIntent {
                intent: intent.name.clone(),
            })?;

        let fill = self.slots.fill(
            template,
            intent.domain.as_deref(),
            &intent.parameters,
            context,
        );
        for (key, conflict) in &fill.ambiguous {
            warn!(
                key = key.as_str(),
                intent_value = %conflict.intent_value,
                context_value = %conflict.context_value,
                "ambiguous slot, choosing intent value"
            );
        }

        let mapped = MappedIntent {
            workflow_name: route(intent, template),
            parameters: fill.parameters,
            missing: fill.missing,
            ambiguous: fill.ambiguous,
            confidence: fill.confidence,
            version: MAPPER_VERSION.to_string(),
        };
        self.emit(intent, &mapped);
        Ok(mapped)
    }

    fn emit(&self, intent: &WorkflowIntent, mapped: &MappedIntent) {
        let mut event = Map::new();
        event.insert("intent".into(), json!(intent.name));
        event.insert("domain".into(), json!(intent.domain));
        event.insert("workflow_name".into(), json!(mapped.workflow_name));
        event.insert(
            "parameters".into(),
            Value::Object(mapped.parameters.clone()),
        );
        event.insert("risk".into(), json!(intent.risk_level));
        self.telemetry.record("intent_mapping", event);
    }
}

/// Guardrail-aware workflow selection: blocked wins over admin, admin over
/// elevated, elevated over the template default.
fn route(intent: &WorkflowIntent, template: &WorkflowTemplate) -> String {
    if intent.risk_level == Some(RiskLevel::Blocked) {
        return BLOCKED_WORKFLOW.to_string();
    }
    if intent.requires_admin {
        return template
            .admin_workflow
            .clone()
            .unwrap_or_else(|| template.workflow_name.clone());
    }
    if intent.risk_level == Some(RiskLevel::High) {
        return template
            .elevated_workflow
            .clone()
            .unwrap_or_else(|| template.workflow_name.clone());
    }
    template.workflow_name.clone()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
