//! Guardrail and few-shot suggestion generators.
//!
//! Turn mined error patterns into reviewable artifacts: candidate guardrail
//! rules (domain emphasis, synonym-table entries, slot defaults, phrasing
//! patterns) and candidate few-shot exemplars.  Everything produced here is
//! a suggestion for human curation, never an automatic catalog change.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use orko_intent::ExpectedIntent;

use crate::miner::MinedPatterns;

/// A confusion pair must repeat before it becomes a rule.
const CONFUSION_MIN: u64 = 2;
/// A parameter must go missing this often before a slot default is proposed.
const MISSING_PARAMETER_MIN: u64 = 2;
/// A phrasing token must recur this often before it earns a rule.
const PHRASING_TOKEN_MIN: u64 = 4;

/// Rule proposed against a repeated expected→predicted domain pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRule {
    pub reason: String,
    pub expected_domain: String,
    pub wrong_predicted_domain: String,
    pub suggestion: String,
    pub count: u64,
}

/// Rule proposed against a repeated expected→predicted action pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRule {
    pub expected_action: String,
    pub wrong_predicted_action: String,
    pub count: u64,
    pub suggestion: String,
}

/// Rule proposed against a repeatedly missing parameter slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterRule {
    pub domain: String,
    pub action: String,
    pub parameter: String,
    pub count: u64,
    pub suggestion: String,
}

/// Rule proposed against a recurring phrasing token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhrasingRule {
    pub token: String,
    pub count: u64,
    pub suggestion: String,
}

/// The full candidate rule set for one mined error export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardrailSuggestions {
    pub domain_rules: Vec<DomainRule>,
    pub action_rules: Vec<ActionRule>,
    pub parameter_rules: Vec<ParameterRule>,
    pub phrasing_rules: Vec<PhrasingRule>,
}

impl GuardrailSuggestions {
    /// True when no pattern crossed any threshold.
    pub fn is_empty(&self) -> bool {
        self.domain_rules.is_empty()
            && self.action_rules.is_empty()
            && self.parameter_rules.is_empty()
            && self.phrasing_rules.is_empty()
    }
}

/// Convert mined patterns into candidate guardrail rules.
pub fn suggest_guardrails(patterns: &MinedPatterns) -> GuardrailSuggestions {
    let mut suggestions = GuardrailSuggestions::default();

    for (expected, predicted_map) in &patterns.domain_confusion {
        for (predicted, count) in predicted_map {
            if expected != predicted && *count >= CONFUSION_MIN {
                suggestions.domain_rules.push(DomainRule {
                    reason: "frequent domain confusion".to_string(),
                    expected_domain: expected.clone(),
                    wrong_predicted_domain: predicted.clone(),
                    suggestion: format!(
                        "Add few-shot examples emphasizing {expected} vs {predicted}"
                    ),
                    count: *count,
                });
            }
        }
    }

    for (expected, predicted_map) in &patterns.action_confusion {
        for (predicted, count) in predicted_map {
            if expected != predicted && *count >= CONFUSION_MIN {
                suggestions.action_rules.push(ActionRule {
                    expected_action: expected.clone(),
                    wrong_predicted_action: predicted.clone(),
                    count: *count,
                    suggestion: format!(
                        "Add '{predicted}' to the synonym table for '{expected}'"
                    ),
                });
            }
        }
    }

    for missing in &patterns.missing_parameters {
        if missing.count >= MISSING_PARAMETER_MIN {
            suggestions.parameter_rules.push(ParameterRule {
                domain: missing.domain.clone(),
                action: missing.action.clone(),
                parameter: missing.parameter.clone(),
                count: missing.count,
                suggestion: format!(
                    "Add a slot default for '{}' under {}.{}",
                    missing.parameter, missing.domain, missing.action
                ),
            });
        }
    }

    for (token, count) in &patterns.frequent_phrasing_tokens {
        if *count >= PHRASING_TOKEN_MIN {
            suggestions.phrasing_rules.push(PhrasingRule {
                token: token.clone(),
                count: *count,
                suggestion: format!("Consider few-shot examples involving '{token}'"),
            });
        }
    }

    suggestions
}

/// A candidate catalog exemplar derived from an error pattern.
///
/// The command text is a placeholder template; a curator replaces it with a
/// real phrasing before the exemplar enters the domain catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FewShotCandidate {
    pub command: String,
    pub expected: ExpectedIntent,
    /// Which mined pattern produced the candidate.
    pub source_pattern: String,
    pub hint: String,
}

/// Convert candidate guardrail rules into candidate few-shot exemplars.
pub fn suggest_few_shots(suggestions: &GuardrailSuggestions) -> Vec<FewShotCandidate> {
    let mut candidates = Vec::new();

    for rule in &suggestions.domain_rules {
        candidates.push(FewShotCandidate {
            command: format!(
                "{} command that reads like {}",
                rule.expected_domain, rule.wrong_predicted_domain
            ),
            expected: ExpectedIntent {
                domain: Some(rule.expected_domain.clone()),
                action: None,
                parameters: Map::new(),
            },
            source_pattern: "domain_confusion".to_string(),
            hint: rule.suggestion.clone(),
        });
    }

    for rule in &suggestions.action_rules {
        candidates.push(FewShotCandidate {
            command: format!(
                "phrase that could mean {} but should map to {}",
                rule.wrong_predicted_action, rule.expected_action
            ),
            expected: ExpectedIntent {
                domain: None,
                action: Some(rule.expected_action.clone()),
                parameters: Map::new(),
            },
            source_pattern: "action_confusion".to_string(),
            hint: rule.suggestion.clone(),
        });
    }

    for rule in &suggestions.parameter_rules {
        let mut parameters = Map::new();
        parameters.insert(rule.parameter.clone(), json!("example_value"));
        candidates.push(FewShotCandidate {
            command: format!("command referencing '{}'", rule.parameter),
            expected: ExpectedIntent {
                domain: Some(rule.domain.clone()),
                action: Some(rule.action.clone()),
                parameters,
            },
            source_pattern: "missing_parameter".to_string(),
            hint: rule.suggestion.clone(),
        });
    }

    candidates
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::miner::MissingParameter;

    fn patterns() -> MinedPatterns {
        let mut domain_row = BTreeMap::new();
        domain_row.insert("trading".to_string(), 3u64);
        domain_row.insert("finance".to_string(), 1u64);
        let mut domain_confusion = BTreeMap::new();
        domain_confusion.insert("logistics".to_string(), domain_row);

        let mut action_row = BTreeMap::new();
        action_row.insert("book_vessel".to_string(), 2u64);
        let mut action_confusion = BTreeMap::new();
        action_confusion.insert("book_truck".to_string(), action_row);

        let mut tokens = BTreeMap::new();
        tokens.insert("shipment".to_string(), 5u64);
        tokens.insert("the".to_string(), 3u64);

        MinedPatterns {
            domain_confusion,
            action_confusion,
            missing_parameters: vec![
                MissingParameter {
                    domain: "it_ops".to_string(),
                    action: "restart_service".to_string(),
                    parameter: "service".to_string(),
                    count: 4,
                },
                MissingParameter {
                    domain: "finance".to_string(),
                    action: "generate_report".to_string(),
                    parameter: "period".to_string(),
                    count: 1,
                },
            ],
            frequent_phrasing_tokens: tokens,
        }
    }

    #[test]
    fn thresholds_filter_rare_patterns() {
        let suggestions = suggest_guardrails(&patterns());

        // logistics→finance count 1 stays out, logistics→trading count 3 is in.
        assert_eq!(suggestions.domain_rules.len(), 1);
        assert_eq!(suggestions.domain_rules[0].wrong_predicted_domain, "trading");
        assert_eq!(suggestions.domain_rules[0].count, 3);

        assert_eq!(suggestions.action_rules.len(), 1);
        assert!(suggestions.action_rules[0]
            .suggestion
            .contains("synonym table"));

        // period count 1 stays out.
        assert_eq!(suggestions.parameter_rules.len(), 1);
        assert_eq!(suggestions.parameter_rules[0].parameter, "service");

        // "the" count 3 stays below the phrasing bar of 4.
        assert_eq!(suggestions.phrasing_rules.len(), 1);
        assert_eq!(suggestions.phrasing_rules[0].token, "shipment");
    }

    #[test]
    fn few_shots_cover_every_rule_family() {
        let suggestions = suggest_guardrails(&patterns());
        let candidates = suggest_few_shots(&suggestions);

        assert_eq!(candidates.len(), 3);

        let domain = candidates
            .iter()
            .find(|c| c.source_pattern == "domain_confusion")
            .unwrap();
        assert_eq!(domain.expected.domain.as_deref(), Some("logistics"));
        assert!(domain.command.contains("trading"));

        let action = candidates
            .iter()
            .find(|c| c.source_pattern == "action_confusion")
            .unwrap();
        assert_eq!(action.expected.action.as_deref(), Some("book_truck"));

        let param = candidates
            .iter()
            .find(|c| c.source_pattern == "missing_parameter")
            .unwrap();
        assert_eq!(
            param.expected.parameters.get("service"),
            Some(&serde_json::json!("example_value"))
        );
        assert_eq!(param.expected.domain.as_deref(), Some("it_ops"));
    }

    #[test]
    fn empty_patterns_yield_no_suggestions() {
        let suggestions = suggest_guardrails(&MinedPatterns::default());
        assert!(suggestions.is_empty());
        assert!(suggest_few_shots(&suggestions).is_empty());
    }
}
