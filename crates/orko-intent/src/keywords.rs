//! Shared keyword-to-domain index.
//!
//! One index serves every component that needs a heuristic domain guess: the
//! domain registry, the canonicalizer, and the fallback parser.  Keeping a
//! single table avoids the drift that creeps in when each component maintains
//! its own copy.
//!
//! Matching is plain substring containment over the lowercased command text.
//! The table is ordered: when keywords from several domains match, the domain
//! listed first wins.  "mt" is a real trading keyword (metric tons), so short
//! tokens are intentional.

use aho_corasick::AhoCorasick;
use tracing::error;

// ---------------------------------------------------------------------------
// Priority table
// ---------------------------------------------------------------------------

/// Domains in priority order with their trigger keywords.
///
/// Multi-word keywords are allowed; matching is substring-based, not
/// token-based.
const KEYWORD_TABLE: &[(&str, &[&str])] = &[
    ("trading", &["contract", "hedge", "pnl", "hedging", "mt", "shipment"]),
    (
        "logistics",
        &["ship", "vessel", "eta", "silo", "truck", "warehouse", "delivery"],
    ),
    ("finance", &["invoice", "cashflow", "pnl", "tax", "budget", "expense"]),
    ("hr", &["employee", "onboarding", "vacation", "leave", "hr"]),
    ("it_ops", &["service", "incident", "cluster", "server", "restart", "patch"]),
    ("devops", &["microservice", "load test", "deploy pipeline", "devops"]),
    ("customer_support", &["ticket", "support case", "escalation"]),
    (
        "operations",
        &["maintenance", "checklist", "operational risk", "incidents", "staffing"],
    ),
    ("analytics", &["forecast", "demand", "retention", "churn", "analytics"]),
    ("sales", &["opportunity", "pipeline", "win-loss", "sales"]),
    (
        "marketing",
        &["campaign", "marketing", "engagement", "social media", "competitive report"],
    ),
    ("procurement", &["purchase order", "suppliers", "vendor", "sourcing"]),
    ("manufacturing", &["machine", "work orders", "plant", "assembly"]),
    ("legal", &["nda", "contract", "compliance", "regulation", "legal"]),
    ("retail", &["store", "inventory", "stockout", "retail"]),
    ("energy", &["grid", "outage", "energy", "renewable"]),
    ("healthcare_admin", &["patient", "claims", "lab results"]),
    ("general_admin", &["meeting", "travel request", "okr", "office supplies"]),
    ("knowledge_work", &["knowledge base", "documentation", "specification", "docs"]),
];

// ---------------------------------------------------------------------------
// KeywordIndex
// ---------------------------------------------------------------------------

/// Compiled keyword index over the priority table.
///
/// Construction compiles a single Aho-Corasick automaton over all keywords;
/// a guess is then one pass over the text regardless of table size.
pub struct KeywordIndex {
    /// Pattern index → position of the owning domain in [`KEYWORD_TABLE`].
    pattern_domains: Vec<usize>,

    /// Compiled automaton; `None` only if the build failed (the index then
    /// degrades to a linear scan with identical results).
    automaton: Option<AhoCorasick>,
}

impl KeywordIndex {
    /// Build the index from the built-in priority table.
    pub fn new() -> Self {
        let mut patterns: Vec<&str> = Vec::new();
        let mut pattern_domains = Vec::new();

        for (idx, (_, keywords)) in KEYWORD_TABLE.iter().enumerate() {
            for keyword in *keywords {
                patterns.push(keyword);
                pattern_domains.push(idx);
            }
        }

        let automaton = match AhoCorasick::new(&patterns) {
            Ok(ac) => Some(ac),
            Err(e) => {
                error!(error = %e, "failed to build keyword automaton");
                None
            }
        };

        Self {
            pattern_domains,
            automaton,
        }
    }

    /// Guess the domain for a command.
    ///
    /// Returns the highest-priority domain whose keyword occurs anywhere in
    /// the lowercased text, or `None` when nothing matches.
    pub fn guess(&self, command: &str) -> Option<&'static str> {
        let lowered = command.to_lowercase();

        let best = match &self.automaton {
            Some(ac) => {
                let mut best: Option<usize> = None;
                for mat in ac.find_overlapping_iter(&lowered) {
                    let domain_idx = self.pattern_domains[mat.pattern().as_usize()];
                    if best.is_none_or(|b| domain_idx < b) {
                        best = Some(domain_idx);
                    }
                    if domain_idx == 0 {
                        break;
                    }
                }
                best
            }
            None => KEYWORD_TABLE.iter().position(|(_, keywords)| {
                keywords.iter().any(|k| lowered.contains(k))
            }),
        };

        best.map(|idx| KEYWORD_TABLE[idx].0)
    }

    /// The domains covered by the index, in priority order.
    pub fn domains(&self) -> impl Iterator<Item = &'static str> {
        KEYWORD_TABLE.iter().map(|(domain, _)| *domain)
    }
}

impl Default for KeywordIndex {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
