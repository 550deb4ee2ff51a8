//! Declarative matching of actions against rules.
//!
//! Matching is an ordered list of predicates. A rule triggers when any of
//! `RULE_PREDICATES` holds; the built-in checks run before rules and each
//! contributes its own fixed finding.
//!
//! All comparisons are lower-cased substring tests. Empty needles never
//! match.

use atrian_contracts::ethics::{
    EthicalConcern, EthicalRecommendation, EthicsRule, EvaluationContext, Severity,
};

/// Lower-cased view of what is being evaluated.
#[derive(Debug, Clone)]
pub struct Subject {
    pub description: String,
    pub domain: String,
    pub purpose: String,
    pub data_sources: Vec<String>,
}

impl Subject {
    pub fn new(description: &str, context: &EvaluationContext) -> Self {
        Self {
            description: description.to_lowercase(),
            domain: context.domain.as_deref().unwrap_or_default().to_lowercase(),
            purpose: context.purpose.as_deref().unwrap_or_default().to_lowercase(),
            data_sources: context.data_sources.iter().map(|s| s.to_lowercase()).collect(),
        }
    }
}

/// `haystack` contains `needle`, with an empty needle never matching.
fn contains(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.contains(needle)
}

// ── Rule predicates ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Any rule keyword occurs in the description.
    KeywordInDescription,
    /// The rule text occurs verbatim in the description.
    RuleTextInDescription,
    /// The rule scope occurs in the context's domain or purpose.
    ScopeInDomainOrPurpose,
}

/// Predicates tested for every rule, in order.
pub const RULE_PREDICATES: [Predicate; 3] = [
    Predicate::KeywordInDescription,
    Predicate::RuleTextInDescription,
    Predicate::ScopeInDomainOrPurpose,
];

impl Predicate {
    pub fn holds(self, rule: &EthicsRule, subject: &Subject) -> bool {
        match self {
            Predicate::KeywordInDescription => rule
                .keywords
                .iter()
                .any(|k| contains(&subject.description, &k.trim().to_lowercase())),
            Predicate::RuleTextInDescription => rule
                .rule
                .as_deref()
                .map(|text| contains(&subject.description, &text.trim().to_lowercase()))
                .unwrap_or(false),
            Predicate::ScopeInDomainOrPurpose => rule
                .scope
                .as_deref()
                .map(|scope| {
                    let scope = scope.trim().to_lowercase();
                    contains(&subject.domain, &scope) || contains(&subject.purpose, &scope)
                })
                .unwrap_or(false),
        }
    }
}

/// The first predicate that triggers `rule`, if any.
pub fn triggering_predicate(rule: &EthicsRule, subject: &Subject) -> Option<Predicate> {
    RULE_PREDICATES.into_iter().find(|p| p.holds(rule, subject))
}

/// Concern and recommendation raised by a triggered rule.
pub fn rule_finding(rule: &EthicsRule) -> (EthicalConcern, EthicalRecommendation) {
    let principle = rule.principle.as_deref().unwrap_or("Undefined Principle");
    let text = rule.rule.as_deref().unwrap_or("N/A");
    let guidance = rule.guidance.as_deref().unwrap_or("Consult rule documentation.");

    let concern = EthicalConcern {
        rule_id: Some(rule.id.clone()),
        principle: principle.to_string(),
        severity: rule.severity,
        description: format!("Action potentially conflicts with rule '{}': {}", rule.id, text),
    };
    let recommendation = EthicalRecommendation {
        action: format!(
            "Review adherence to rule '{}' ({}). Specific guidance: {}",
            rule.id, principle, guidance
        ),
        priority: rule.severity,
        rationale: format!("Ensure compliance with defined ethical standard: {}", text),
    };
    (concern, recommendation)
}

// ── Built-in checks ──────────────────────────────────────────────────────────

/// Checks that run on every evaluation regardless of the loaded rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCheck {
    /// A data source name contains `sensitive_data`.
    SensitiveDataSource,
    /// The domain is exactly `surveillance`.
    SurveillanceDomain,
}

pub const BUILTIN_CHECKS: [BuiltinCheck; 2] =
    [BuiltinCheck::SensitiveDataSource, BuiltinCheck::SurveillanceDomain];

/// What a built-in check contributes when it applies.
#[derive(Debug, Clone)]
pub struct Finding {
    pub concern: EthicalConcern,
    pub recommendation: EthicalRecommendation,
    /// The evaluation score may not exceed this afterwards.
    pub score_cap: f64,
}

impl BuiltinCheck {
    pub fn applies(self, subject: &Subject) -> bool {
        match self {
            BuiltinCheck::SensitiveDataSource => subject
                .data_sources
                .iter()
                .any(|s| contains(s, "sensitive_data")),
            BuiltinCheck::SurveillanceDomain => subject.domain.trim() == "surveillance",
        }
    }

    pub fn finding(self) -> Finding {
        match self {
            BuiltinCheck::SensitiveDataSource => Finding {
                concern: EthicalConcern {
                    rule_id: None,
                    principle: "data_privacy_SP".to_string(),
                    severity: Severity::High,
                    description: "Action involves sensitive data. Ensure robust anonymization, \
                                  consent mechanisms, and alignment with Sacred Privacy (SP)."
                        .to_string(),
                },
                recommendation: EthicalRecommendation {
                    action: "Review and enhance data handling protocols for sensitive data, \
                             prioritizing Sacred Privacy (SP)."
                        .to_string(),
                    priority: Severity::High,
                    rationale: "Mitigate risks associated with sensitive data exposure and \
                                uphold SP."
                        .to_string(),
                },
                score_cap: 0.6,
            },
            BuiltinCheck::SurveillanceDomain => Finding {
                concern: EthicalConcern {
                    rule_id: None,
                    principle: "autonomy_and_oversight_IE_UR".to_string(),
                    severity: Severity::Critical,
                    description: "Surveillance applications require stringent human oversight, \
                                  justification, and pathways for Universal Redemption (UR)."
                        .to_string(),
                },
                recommendation: EthicalRecommendation {
                    action: "Implement a multi-level human review process for all surveillance \
                             outputs. Ensure transparency and clear justification."
                        .to_string(),
                    priority: Severity::Critical,
                    rationale: "Uphold individual autonomy, prevent misuse, and align with \
                                Integrated Ethics (IE) and Universal Redemption (UR)."
                        .to_string(),
                },
                score_cap: 0.4,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(keywords: &[&str], text: Option<&str>, scope: Option<&str>) -> EthicsRule {
        EthicsRule {
            id: "R-1".to_string(),
            principle: None,
            rule: text.map(str::to_string),
            scope: scope.map(str::to_string),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            severity: Severity::Medium,
            disallow_if_triggered: false,
            guidance: None,
        }
    }

    fn subject(description: &str, domain: Option<&str>, purpose: Option<&str>) -> Subject {
        let ctx = EvaluationContext {
            domain: domain.map(str::to_string),
            purpose: purpose.map(str::to_string),
            ..Default::default()
        };
        Subject::new(description, &ctx)
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let r = rule(&["Personal Data"], None, None);
        let s = subject("Export PERSONAL DATA to partner", None, None);
        assert_eq!(triggering_predicate(&r, &s), Some(Predicate::KeywordInDescription));
    }

    #[test]
    fn empty_keyword_never_matches() {
        let r = rule(&["", "   "], None, None);
        let s = subject("anything at all", None, None);
        assert_eq!(triggering_predicate(&r, &s), None);
    }

    #[test]
    fn rule_text_match() {
        let r = rule(&[], Some("delete all backups"), None);
        let s = subject("Please DELETE ALL BACKUPS tonight", None, None);
        assert_eq!(triggering_predicate(&r, &s), Some(Predicate::RuleTextInDescription));
    }

    #[test]
    fn scope_matches_domain_or_purpose() {
        let r = rule(&[], None, Some("data_handling"));
        assert!(Predicate::ScopeInDomainOrPurpose.holds(&r, &subject("x", Some("Data_Handling"), None)));
        assert!(Predicate::ScopeInDomainOrPurpose.holds(&r, &subject("x", None, Some("routine data_handling task"))));
        assert!(!Predicate::ScopeInDomainOrPurpose.holds(&r, &subject("data_handling", None, None)));
    }

    #[test]
    fn empty_description_triggers_nothing() {
        let r = rule(&["pii"], Some("protect pii"), None);
        assert_eq!(triggering_predicate(&r, &subject("", None, None)), None);
    }

    #[test]
    fn surveillance_requires_exact_domain() {
        assert!(BuiltinCheck::SurveillanceDomain.applies(&subject("x", Some("Surveillance"), None)));
        assert!(!BuiltinCheck::SurveillanceDomain.applies(&subject(
            "x",
            Some("public_safety_surveillance"),
            None
        )));
    }

    #[test]
    fn rule_finding_uses_defaults_for_missing_fields() {
        let (concern, rec) = rule_finding(&rule(&["x"], None, None));
        assert_eq!(concern.principle, "Undefined Principle");
        assert_eq!(concern.rule_id.as_deref(), Some("R-1"));
        assert!(rec.action.contains("Consult rule documentation."));
    }
}
