//! Canonicalization of fuzzy model output into the strict domain and action
//! space used by workflow mapping and evaluation.
//!
//! Domains go through straight synonym mapping first; after that the
//! text-based keyword heuristic ALWAYS gets a chance to refine the choice,
//! even when the model already picked a canonical domain. That bias toward
//! the command text recovers mis-classified retail, energy, healthcare, and
//! operations commands. Actions are mapped per canonical domain through
//! synonym sets, some gated on the command text.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::keywords::KeywordIndex;
use crate::types::ParsedIntent;

/// The strict canonical domain set.
pub const CANONICAL_DOMAINS: &[&str] = &[
    "trading",
    "logistics",
    "finance",
    "hr",
    "it_ops",
    "devops",
    "customer_support",
    "operations",
    "analytics",
    "sales",
    "marketing",
    "procurement",
    "manufacturing",
    "legal",
    "retail",
    "energy",
    "healthcare_admin",
    "general_admin",
    "knowledge_work",
];

/// Whether a domain name is in the canonical set.
pub fn is_canonical_domain(domain: &str) -> bool {
    CANONICAL_DOMAINS.contains(&domain)
}

// ---------------------------------------------------------------------------
// Canonicalizer
// ---------------------------------------------------------------------------

/// Maps parsed domains and actions onto the canonical space.
pub struct Canonicalizer {
    index: Arc<KeywordIndex>,
}

impl Canonicalizer {
    /// Create a canonicalizer over the shared keyword index.
    pub fn new(index: Arc<KeywordIndex>) -> Self {
        Self { index }
    }

    /// Canonicalize the domain and action of a parsed intent in place.
    ///
    /// The domain always resolves to a non-empty string; an action that
    /// canonicalizes to empty becomes `None`.
    pub fn canonicalize(&self, intent: &mut ParsedIntent) {
        let domain = self.canonicalize_domain(
            intent.domain.as_deref(),
            intent.action.as_deref(),
            &intent.parameters,
            &intent.raw_text,
        );
        let action = canonicalize_action(&domain, intent.action.as_deref(), &intent.raw_text);

        intent.domain = Some(domain);
        intent.action = (!action.is_empty()).then_some(action);
    }

    /// Map a model-friendly, fuzzy domain into a strict canonical domain.
    pub fn canonicalize_domain(
        &self,
        domain: Option<&str>,
        action: Option<&str>,
        parameters: &Map<String, Value>,
        raw_text: &str,
    ) -> String {
        let d = norm(domain);
        let a = norm(action);
        let text = raw_text.to_lowercase();

        // 1. Straight synonyms and casing.
        match d.as_str() {
            "it-ops" | "it_ops" | "it" => return "it_ops".to_string(),
            "software_testing" => return "devops".to_string(),
            "inventory_management" => return "retail".to_string(),
            "energy_management" | "energy_management_additional" => return "energy".to_string(),
            "customer_analysis" | "customer_analytics" => {
                if text.contains("ticket") || text.contains("sentiment") {
                    return "customer_support".to_string();
                }
                return "analytics".to_string();
            }
            "customer_feedback" => return "retail".to_string(),
            "contract_management" => {
                // Vendor renewals belong to procurement, the rest to legal.
                if a == "approve_contract_renewal" || parameters.contains_key("vendor_name") {
                    return "procurement".to_string();
                }
                return "legal".to_string();
            }
            "compliance" | "audit" => return "legal".to_string(),
            "travel" | "calendar" | "communication" | "management" => {
                return "general_admin".to_string();
            }
            "lab_management" => return "healthcare_admin".to_string(),
            "knowledge_management" | "document_management" | "documentation" => {
                return "knowledge_work".to_string();
            }
            _ => {}
        }

        // 2. Already canonical: still let the text heuristic refine it.
        if is_canonical_domain(&d) {
            return self.guess_from_text(&text).unwrap_or(d);
        }

        // 3. Generic or missing: heuristic with an admin default.
        if matches!(d.as_str(), "" | "general" | "misc" | "unassigned" | "other") {
            return self
                .guess_from_text(&text)
                .unwrap_or_else(|| "general_admin".to_string());
        }

        // Unknown string: best-effort heuristic, else pass through so the
        // registry layer can still enforce its own view.
        self.guess_from_text(&text).unwrap_or(d)
    }

    fn guess_from_text(&self, text: &str) -> Option<String> {
        self.index.guess(text).map(str::to_string)
    }
}

// ---------------------------------------------------------------------------
// Action canonicalization
// ---------------------------------------------------------------------------

/// Map a fuzzy or generic action into the strict canonical action for the
/// (already canonical) domain. Unmatched actions pass through normalized.
pub fn canonicalize_action(domain: &str, action: Option<&str>, raw_text: &str) -> String {
    let a = norm(action);
    let text = raw_text.to_lowercase();

    let canonical: Option<&'static str> = match domain {
        "logistics" => match a.as_str() {
            "book_truck" | "book_transport" | "create_truck_booking" => Some("book_truck"),
            "list_vessels" | "list_ships" => Some("list_vessels"),
            "allocate_warehouse_slot" | "allocate_slot" => Some("allocate_warehouse_slot"),
            "list_delayed_shipments" | "list_delays" => Some("list_delayed_shipments"),
            "create_delivery_schedule" | "create_schedule" => Some("create_delivery_schedule"),
            _ => None,
        },
        "finance" => match a.as_str() {
            "generate_cashflow_report" | "cashflow_report" => Some("generate_cashflow_report"),
            "list_overdue_invoices" | "overdue_invoices" => Some("list_overdue_invoices"),
            "show_operating_expenses" | "operating_expenses" => Some("show_operating_expenses"),
            "generate_tax_summary" | "tax_summary" => Some("generate_tax_summary"),
            "invoice_aging" | "invoice_aging_report" => Some("invoice_aging"),
            "prepare_budget_forecast" | "budget_forecast" => Some("prepare_budget_forecast"),
            _ => None,
        },
        "hr" => match a.as_str() {
            "create_employee" | "add_employee" => Some("create_employee"),
            "list_vacations" | "list_leaves" => Some("list_vacations"),
            "add_leave" | "create_leave" => Some("add_leave"),
            "promote_employee" | "promotion" => Some("promote_employee"),
            "schedule_onboarding" | "onboarding" => Some("schedule_onboarding"),
            _ => None,
        },
        "it_ops" => match a.as_str() {
            "create_ticket" | "open_ticket" | "open_incident" => Some("create_ticket"),
            "restart_service" | "restart" => Some("restart_service"),
            "run_diagnostics" | "diagnostics" => Some("run_diagnostics"),
            "rotate_logs" | "log_rotation" => Some("rotate_logs"),
            "schedule_patch" | "patch_update" => Some("schedule_patch"),
            "draft_dr_plan" | "disaster_recovery_plan" => Some("draft_dr_plan"),
            "deploy_service" | "deploy" => Some("deploy_service"),
            "list_unresolved_tickets" => Some("list_unresolved_tickets"),
            "list_outages" if text.contains("outage") => Some("list_outages"),
            _ => None,
        },
        "devops" => match a.as_str() {
            "deploy_microservice" | "deploy_service" | "deploy" => Some("deploy_microservice"),
            "rollback_service" | "rollback" => Some("rollback_service"),
            "adjust_resources" | "scale_resources" => Some("adjust_resources"),
            "rebuild_dashboard" | "rebuild" => Some("rebuild_dashboard"),
            "run_load_test" | "load_test" => Some("run_load_test"),
            _ => None,
        },
        "customer_support" => match a.as_str() {
            "list_tickets" => Some("list_tickets"),
            "list_unresolved_tickets" => Some("list_unresolved_tickets"),
            "sentiment_classification" | "classify_tickets"
                if text.contains("sentiment") || text.contains("emotion") =>
            {
                Some("sentiment_classification")
            }
            "list_escalations" | "escalations" => Some("list_escalations"),
            "create_case" | "open_case" => Some("create_case"),
            "escalate_ticket" | "escalate" => Some("escalate_ticket"),
            _ => None,
        },
        "operations" => match a.as_str() {
            "create_checklist" => Some("create_checklist"),
            "schedule_preventive_maintenance" | "schedule_maintenance" => {
                Some("schedule_maintenance")
            }
            "list_risks" => Some("list_risks"),
            "summarize_incidents" => Some("summarize_incidents"),
            "forecast_staffing" => Some("forecast_staffing"),
            "create_safety_checklist" => Some("create_safety_checklist"),
            _ => None,
        },
        "manufacturing" => match a.as_str() {
            "machine_utilization" | "show" if text.contains("utilization") => {
                Some("machine_utilization")
            }
            "machine_downtime_report" | "downtime_report" => Some("machine_downtime_report"),
            "optimize_process" | "optimize_line_sequence" => Some("optimize_line_sequence"),
            "assign_technicians" => Some("assign_technicians"),
            "record_inspection_results" => Some("record_inspection_results"),
            "schedule_calibration" | "schedule_task" => Some("schedule_calibration"),
            "list_work_orders" => Some("list_work_orders"),
            _ => None,
        },
        "procurement" => match a.as_str() {
            "list_overdue_suppliers" => Some("list_overdue_suppliers"),
            "approve_vendor_contract" => Some("approve_vendor_contract"),
            "create_sourcing_plan" => Some("create_sourcing_plan"),
            "procurement_savings_report" => Some("procurement_savings_report"),
            "create_procurement_tracker" => Some("create_procurement_tracker"),
            "create_purchase_order" => Some("create_purchase_order"),
            "initiate_procurement" => Some("initiate_procurement"),
            _ => None,
        },
        "legal" => match a.as_str() {
            "draft_nda" => Some("draft_nda"),
            "list_compliance_actions" => Some("list_compliance_actions"),
            "review_contract" => Some("review_contract"),
            "draft_employment_contract" => Some("draft_employment_contract"),
            "review_compliance_docs" => Some("review_compliance_docs"),
            "prepare_briefing" => Some("prepare_briefing"),
            "summarize_audit_findings" => Some("summarize_audit_findings"),
            _ => None,
        },
        "retail" => match a.as_str() {
            "check_inventory" => Some("check_inventory"),
            "generate_sales_report" => Some("generate_sales_report"),
            "list_stockout_risk" => Some("list_stockout_risk"),
            "summarize_feedback" => Some("summarize_feedback"),
            "plan_replenishment" => Some("plan_replenishment"),
            "top_products" => Some("top_products"),
            _ => None,
        },
        "energy" => match a.as_str() {
            "consumption_summary" | "generate_summary" | "create"
                if text.contains("consumption") || text.contains("energy") =>
            {
                Some("consumption_summary")
            }
            "forecast_grid_demand" | "forecast_demand" => Some("forecast_grid_demand"),
            "list_outages" | "list_events" => Some("list_outages"),
            "renewable_output_analysis" | "analyze" if text.contains("renewable") => {
                Some("renewable_output_analysis")
            }
            _ if a == "inspect_outage_reports" || a.contains("anomaly_detection") => {
                Some("inspect_outage_reports")
            }
            "optimize_energy_usage" => Some("optimize_energy_usage"),
            _ => None,
        },
        "analytics" => match a.as_str() {
            "revenue_breakdown" => Some("revenue_breakdown"),
            "retention_analysis" => Some("retention_analysis"),
            "forecast_demand" => Some("forecast_demand"),
            "churn_analysis" => Some("churn_analysis"),
            _ => None,
        },
        "sales" => match a.as_str() {
            "create_opportunity" => Some("create_opportunity"),
            "show_pipeline" => Some("show_pipeline"),
            "win_loss_analysis" => Some("win_loss_analysis"),
            "list_opportunities" => Some("list_opportunities"),
            "top_products" => Some("top_products"),
            _ => None,
        },
        "marketing" => match a.as_str() {
            "create_campaign" => Some("create_campaign"),
            "analyze_spend" => Some("analyze_spend"),
            "engagement_report" => Some("engagement_report"),
            "competitive_report" => Some("competitive_report"),
            _ => None,
        },
        "healthcare_admin" => match a.as_str() {
            "schedule_followup" => Some("schedule_followup"),
            "claims_summary" => Some("claims_summary"),
            "list_pending_labs" => Some("list_pending_labs"),
            _ => None,
        },
        "general_admin" => match a.as_str() {
            "create_travel_request" => Some("create_travel_request"),
            "list_meetings" => Some("list_meetings"),
            "draft_announcement" => Some("draft_announcement"),
            "summarize_okrs" => Some("summarize_okrs"),
            "create_procurement_tracker" => Some("create_procurement_tracker"),
            _ => None,
        },
        "knowledge_work" => match a.as_str() {
            "create_documentation" => Some("create_documentation"),
            "tag_documents" => Some("tag_documents"),
            "summarize_document" => Some("summarize_document"),
            _ => None,
        },
        _ => None,
    };

    match canonical {
        Some(c) => c.to_string(),
        None => a,
    }
}

fn norm(value: Option<&str>) -> String {
    value.map(|s| s.trim().to_lowercase()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonicalizer() -> Canonicalizer {
        Canonicalizer::new(Arc::new(KeywordIndex::new()))
    }

    fn domain_of(domain: Option<&str>, action: Option<&str>, text: &str) -> String {
        canonicalizer().canonicalize_domain(domain, action, &Map::new(), text)
    }

    #[test]
    fn straight_domain_synonyms() {
        assert_eq!(domain_of(Some("it-ops"), None, "hello world"), "it_ops");
        assert_eq!(domain_of(Some("IT"), None, "hello world"), "it_ops");
        assert_eq!(domain_of(Some("software_testing"), None, "hello world"), "devops");
        assert_eq!(
            domain_of(Some("energy_management"), None, "hello world"),
            "energy"
        );
        assert_eq!(
            domain_of(Some("lab_management"), None, "hello world"),
            "healthcare_admin"
        );
    }

    #[test]
    fn customer_analysis_splits_on_text() {
        assert_eq!(
            domain_of(Some("customer_analysis"), None, "classify ticket backlog"),
            "customer_support"
        );
        assert_eq!(
            domain_of(Some("customer_analytics"), None, "churn by cohort"),
            "analytics"
        );
        assert_eq!(
            domain_of(Some("customer_analysis"), None, "quarterly numbers"),
            "analytics"
        );
    }

    #[test]
    fn contract_management_routes_by_action_and_params() {
        let c = canonicalizer();
        assert_eq!(
            c.canonicalize_domain(
                Some("contract_management"),
                Some("approve_contract_renewal"),
                &Map::new(),
                "hello world",
            ),
            "procurement"
        );

        let mut params = Map::new();
        params.insert("vendor_name".into(), json!("Acme"));
        assert_eq!(
            c.canonicalize_domain(Some("contract_management"), None, &params, "hello world"),
            "procurement"
        );

        assert_eq!(
            c.canonicalize_domain(Some("contract_management"), None, &Map::new(), "hello world"),
            "legal"
        );
    }

    #[test]
    fn canonical_domain_still_refined_by_text() {
        // Text evidence overrides an already canonical label.
        assert_eq!(
            domain_of(Some("finance"), None, "book a truck to Berlin"),
            "logistics"
        );
        // Without keyword evidence the label stands.
        assert_eq!(domain_of(Some("finance"), None, "hello world"), "finance");
    }

    #[test]
    fn generic_markers_fall_back_to_general_admin() {
        assert_eq!(domain_of(Some("general"), None, "hello world"), "general_admin");
        assert_eq!(domain_of(Some(""), None, "hello world"), "general_admin");
        assert_eq!(domain_of(None, None, "hello world"), "general_admin");
        // With text evidence the heuristic wins over the admin default.
        assert_eq!(domain_of(Some("misc"), None, "restart the server"), "it_ops");
    }

    #[test]
    fn unknown_domain_passes_through_without_evidence() {
        assert_eq!(domain_of(Some("astrology"), None, "hello world"), "astrology");
        assert_eq!(
            domain_of(Some("astrology"), None, "show invoice aging"),
            "finance"
        );
    }

    #[test]
    fn action_synonyms_map_per_domain() {
        assert_eq!(
            canonicalize_action("logistics", Some("book_transport"), "hello"),
            "book_truck"
        );
        assert_eq!(
            canonicalize_action("finance", Some("cashflow_report"), "hello"),
            "generate_cashflow_report"
        );
        // The same synonym resolves differently per domain.
        assert_eq!(
            canonicalize_action("devops", Some("deploy"), "hello"),
            "deploy_microservice"
        );
        assert_eq!(
            canonicalize_action("it_ops", Some("deploy"), "hello"),
            "deploy_service"
        );
    }

    #[test]
    fn text_gated_actions() {
        assert_eq!(
            canonicalize_action("energy", Some("generate_summary"), "energy consumption report"),
            "consumption_summary"
        );
        assert_eq!(
            canonicalize_action("energy", Some("generate_summary"), "weekly roundup"),
            "generate_summary"
        );

        assert_eq!(
            canonicalize_action("customer_support", Some("classify_tickets"), "sentiment for tickets"),
            "sentiment_classification"
        );
        assert_eq!(
            canonicalize_action("customer_support", Some("classify_tickets"), "sort these"),
            "classify_tickets"
        );

        assert_eq!(
            canonicalize_action("it_ops", Some("list_outages"), "show outage history"),
            "list_outages"
        );
        assert_eq!(
            canonicalize_action("it_ops", Some("list_outages"), "show history"),
            "list_outages"
        );
    }

    #[test]
    fn anomaly_detection_substring_maps_to_outage_reports() {
        assert_eq!(
            canonicalize_action("energy", Some("grid_anomaly_detection"), "hello"),
            "inspect_outage_reports"
        );
        assert_eq!(
            canonicalize_action("energy", Some("inspect_outage_reports"), "hello"),
            "inspect_outage_reports"
        );
    }

    #[test]
    fn unmatched_action_passes_through_normalized() {
        assert_eq!(
            canonicalize_action("logistics", Some("  Teleport_Cargo "), "hello"),
            "teleport_cargo"
        );
        assert_eq!(canonicalize_action("logistics", None, "hello"), "");
    }

    #[test]
    fn canonicalize_intent_in_place() {
        let c = canonicalizer();
        let mut intent = ParsedIntent::new("book transport from Mersin");
        intent.domain = Some("Logistics".into());
        intent.action = Some("book_transport".into());

        c.canonicalize(&mut intent);

        assert_eq!(intent.domain.as_deref(), Some("logistics"));
        assert_eq!(intent.action.as_deref(), Some("book_truck"));
    }

    #[test]
    fn empty_action_becomes_none() {
        let c = canonicalizer();
        let mut intent = ParsedIntent::new("hello world");
        intent.domain = Some("finance".into());
        intent.action = None;

        c.canonicalize(&mut intent);

        assert_eq!(intent.domain.as_deref(), Some("finance"));
        assert!(intent.action.is_none());
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let c = canonicalizer();
        let mut intent = ParsedIntent::new("run the regression suite nightly");
        intent.domain = Some("software_testing".into());
        intent.action = Some("deploy".into());

        c.canonicalize(&mut intent);
        let first = (intent.domain.clone(), intent.action.clone());
        assert_eq!(first.0.as_deref(), Some("devops"));
        assert_eq!(first.1.as_deref(), Some("deploy_microservice"));

        c.canonicalize(&mut intent);
        assert_eq!((intent.domain.clone(), intent.action.clone()), first);

        // Pass-through case: unknown labels are stable too.
        let mut other = ParsedIntent::new("hello world");
        other.domain = Some("astrology".into());
        other.action = Some("chart".into());
        c.canonicalize(&mut other);
        let first = (other.domain.clone(), other.action.clone());
        c.canonicalize(&mut other);
        assert_eq!((other.domain, other.action), first);
    }

    #[test]
    fn synonym_mapping_stays_inside_the_canonical_set() {
        // Every synonym-table input lands in CANONICAL_DOMAINS, even with
        // keyword-free text that gives the heuristic nothing to refine.
        let synonyms = [
            "it-ops",
            "it",
            "software_testing",
            "inventory_management",
            "energy_management",
            "energy_management_additional",
            "customer_analysis",
            "customer_analytics",
            "customer_feedback",
            "contract_management",
            "compliance",
            "audit",
            "travel",
            "calendar",
            "communication",
            "management",
            "lab_management",
            "knowledge_management",
            "document_management",
            "documentation",
            "general",
            "misc",
            "unassigned",
            "other",
            "",
        ];
        for synonym in synonyms {
            let mapped = domain_of(Some(synonym), None, "hello world");
            assert!(
                is_canonical_domain(&mapped),
                "{synonym:?} mapped to non-canonical {mapped:?}"
            );
        }
        for canonical in CANONICAL_DOMAINS {
            assert_eq!(domain_of(Some(canonical), None, "hello world"), *canonical);
        }
    }
}
