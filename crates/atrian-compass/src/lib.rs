//! # atrian-compass
//!
//! The rule store and the rule-based ethical evaluator for the ATRiAN runtime.
//!
//! ## Overview
//!
//! [`RuleStore`] reads a YAML rules file with `ethics` and `trust_rules`
//! lists. Loading never fails: a missing file or malformed YAML produces an
//! empty [`RuleSet`], and individual bad entries are skipped with a warning.
//!
//! [`EthicalCompass`] implements the
//! [`EthicalEvaluator`](atrian_core::traits::EthicalEvaluator) trait over the
//! loaded ethics rules.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use atrian_compass::{EthicalCompass, RuleStore};
//!
//! let store = RuleStore::load("config/ethics_rules.yaml");
//! let compass = EthicalCompass::from_store(&store);
//! ```

pub mod engine;
pub mod matcher;
pub mod rule;
pub mod store;

pub use engine::EthicalCompass;
pub use rule::RuleSet;
pub use store::RuleStore;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use atrian_contracts::{
        ethics::{EvaluationContext, EvaluationOptions, Severity},
        trust::DelegationScope,
    };
    use atrian_core::traits::EthicalEvaluator;

    use crate::{EthicalCompass, RuleSet, RuleStore};

    // ── Helpers ───────────────────────────────────────────────────────────────

    const RULES: &str = r#"
ethics:
  - id: ER-SP-001
    principle: Sacred Privacy (SP)
    rule: Protect PII rigorously.
    scope: data_handling
    keywords: [pii, personal data, user data]
    severity: high
    disallow_if_triggered: true
    guidance: Implement strong encryption and access controls.
  - id: ER-DM-001
    principle: Data Minimization (IE)
    rule: Only collect data essential for the purpose.
    keywords: [collect data, retain data]
    severity: medium
    guidance: Audit data holdings regularly.
trust_rules:
  - agent: Cascade
    level: high
    delegation: partial
    can_delegate_to: [Reviewer]
"#;

    fn compass() -> EthicalCompass {
        EthicalCompass::new(RuleSet::from_yaml_str(RULES).ethics)
    }

    fn evaluate(compass: &EthicalCompass, description: &str, ctx: EvaluationContext) -> atrian_contracts::ethics::EvaluationResult {
        compass.evaluate_action(description, &ctx, &EvaluationOptions::default())
    }

    // ── 1. Rule loading ───────────────────────────────────────────────────────

    #[test]
    fn test_parses_ethics_and_trust_rules() {
        let rules = RuleSet::from_yaml_str(RULES);
        assert_eq!(rules.ethics.len(), 2);
        assert_eq!(rules.trust_baselines.len(), 1);

        let sp = rules.ethics_rule("ER-SP-001").unwrap();
        assert_eq!(sp.severity, Severity::High);
        assert!(sp.disallow_if_triggered);

        let cascade = rules.trust_baseline("Cascade").unwrap();
        assert_eq!(cascade.level.as_deref(), Some("high"));
        assert_eq!(cascade.delegation, DelegationScope::Partial);
        assert_eq!(cascade.can_delegate_to, vec!["Reviewer".to_string()]);
    }

    #[test]
    fn test_malformed_yaml_yields_empty_rule_set() {
        let rules = RuleSet::from_yaml_str("ethics: [unclosed\n  - : :");
        assert!(rules.is_empty());
    }

    #[test]
    fn test_invalid_entries_are_skipped_but_siblings_load() {
        let yaml = r#"
ethics:
  - principle: no id here
  - id: ""
  - id: ER-BAD-FLAG
    disallow_if_triggered: [yes]
  - id: ER-OK
    keywords: [ok]
trust_rules:
  - level: high
  - agent: Reviewer
    level: medium
  - agent: Broken
    delegation: sometimes
"#;
        let rules = RuleSet::from_yaml_str(yaml);
        let ids: Vec<&str> = rules.ethics.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["ER-OK"]);
        assert_eq!(rules.trust_baselines.len(), 1);
        assert_eq!(rules.trust_baselines[0].agent, "Reviewer");
    }

    #[test]
    fn test_unknown_severity_loads_as_medium_and_still_blocks() {
        let yaml = r#"
ethics:
  - id: ER-SP-001
    keywords: [pii]
    severity: High
    disallow_if_triggered: true
  - id: ER-XX-001
    keywords: [credit score]
    severity: urgent
    disallow_if_triggered: true
  - id: ER-XX-002
    keywords: [telemetry]
    severity: 3
"#;
        let rules = RuleSet::from_yaml_str(yaml);
        assert_eq!(rules.ethics.len(), 3);
        assert_eq!(rules.ethics_rule("ER-SP-001").unwrap().severity, Severity::High);
        assert_eq!(rules.ethics_rule("ER-XX-001").unwrap().severity, Severity::Medium);
        assert_eq!(rules.ethics_rule("ER-XX-002").unwrap().severity, Severity::Medium);

        let compass = EthicalCompass::new(rules.ethics);
        let result = evaluate(&compass, "Collect PII and credit score", EvaluationContext::default());
        assert!(!result.compliant);
        assert_eq!(result.ethical_score, 0.3);
        let ids: Vec<_> = result.concerns.iter().filter_map(|c| c.rule_id.as_deref()).collect();
        assert_eq!(ids, vec!["ER-SP-001", "ER-XX-001"]);
    }

    #[test]
    fn test_non_list_section_is_ignored() {
        let rules = RuleSet::from_yaml_str("ethics: not-a-list\ntrust_rules:\n  - agent: A\n");
        assert!(rules.ethics.is_empty());
        assert_eq!(rules.trust_baselines.len(), 1);
    }

    #[test]
    fn test_missing_file_yields_empty_rule_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuleStore::load(dir.path().join("nope.yaml"));
        assert!(store.rules().is_empty());
    }

    #[test]
    fn test_reload_picks_up_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, "ethics:\n  - id: A\n").unwrap();

        let mut store = RuleStore::load(&path);
        assert_eq!(store.rules().ethics.len(), 1);

        std::fs::write(&path, "ethics:\n  - id: A\n  - id: B\n").unwrap();
        assert_eq!(store.rules().ethics.len(), 1, "rules are static until reload");

        store.reload();
        assert_eq!(store.rules().ethics.len(), 2);

        let compass = EthicalCompass::default();
        compass.reload_from(&store);
        assert_eq!(compass.rule_count(), 2);
        assert!(compass.rule_by_id("B").is_some());
    }

    // ── 2. Baseline evaluation ────────────────────────────────────────────────

    #[test]
    fn test_clean_action_is_compliant_with_monitoring_recommendation() {
        let result = evaluate(&compass(), "Refactor the logging module", EvaluationContext::default());

        assert!(result.compliant);
        assert_eq!(result.ethical_score, 0.9);
        assert!(result.concerns.is_empty());
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.recommendations[0].priority, Severity::Low);
        assert!(result.recommendations[0]
            .action
            .starts_with("Proceed with continuous ethical monitoring"));
    }

    #[test]
    fn test_empty_inputs_never_trigger() {
        let result = evaluate(&compass(), "", EvaluationContext::default());
        assert!(result.compliant);
        assert!(result.concerns.is_empty());
    }

    // ── 3. Built-in checks ────────────────────────────────────────────────────

    #[test]
    fn test_sensitive_data_source_is_high_concern() {
        let ctx = EvaluationContext::default().with_data_source("Customer_SENSITIVE_DATA_2024");
        let result = evaluate(&compass(), "Generate monthly report", ctx);

        assert!(!result.compliant);
        assert_eq!(result.ethical_score, 0.6);
        assert_eq!(result.concerns.len(), 1);
        assert_eq!(result.concerns[0].severity, Severity::High);
        assert_eq!(result.recommendations.len(), 1);
    }

    #[test]
    fn test_surveillance_domain_is_critical_concern() {
        let ctx = EvaluationContext::default().with_domain("SURVEILLANCE");
        let result = evaluate(&compass(), "Track movements", ctx);

        assert!(!result.compliant);
        assert_eq!(result.ethical_score, 0.4);
        assert_eq!(result.max_severity(), Some(Severity::Critical));
    }

    #[test]
    fn test_triggers_accumulate_and_score_only_decreases() {
        let ctx = EvaluationContext::default()
            .with_domain("surveillance")
            .with_data_source("sensitive_data");
        let result = evaluate(&compass(), "Store PII of passers-by", ctx);

        assert!(!result.compliant);
        // Both built-ins plus ER-SP-001.
        assert_eq!(result.concerns.len(), 3);
        assert_eq!(result.recommendations.len(), 3);
        assert_eq!(result.ethical_score, 0.3);
    }

    // ── 4. Rule triggers ──────────────────────────────────────────────────────

    #[test]
    fn test_disallowing_rule_blocks_and_caps_score() {
        let result = evaluate(&compass(), "Export user data to analytics", EvaluationContext::default());

        assert!(!result.compliant);
        assert_eq!(result.ethical_score, 0.3);
        assert_eq!(result.concerns[0].rule_id.as_deref(), Some("ER-SP-001"));
        assert_eq!(
            result.recommendations[0].action,
            "Review adherence to rule 'ER-SP-001' (Sacred Privacy (SP)). Specific guidance: \
             Implement strong encryption and access controls."
        );
    }

    #[test]
    fn test_non_disallowing_rule_keeps_compliance() {
        let result = evaluate(&compass(), "Collect data for the survey", EvaluationContext::default());

        assert!(result.compliant);
        assert_eq!(result.ethical_score, 0.9);
        assert_eq!(result.concerns.len(), 1);
        assert_eq!(result.concerns[0].severity, Severity::Medium);
        // A concern exists, so no "continue monitoring" recommendation.
        assert_eq!(result.recommendations.len(), 1);
        assert!(result.recommendations[0].action.contains("ER-DM-001"));
    }

    #[test]
    fn test_scope_trigger_via_purpose() {
        let ctx = EvaluationContext::default().with_purpose("quarterly data_handling review");
        let result = evaluate(&compass(), "Run the job", ctx);
        assert!(!result.compliant);
        assert_eq!(result.concerns.len(), 1);
    }

    #[test]
    fn test_closing_recommendation_branches() {
        use crate::engine::closing_recommendation;

        let monitor = closing_recommendation(true, false, false).unwrap();
        assert_eq!(monitor.priority, Severity::Low);
        assert!(monitor.action.contains("continuous ethical monitoring"));

        let cease = closing_recommendation(false, true, false).unwrap();
        assert_eq!(cease.priority, Severity::Critical);
        assert!(cease.action.starts_with("Action deemed non-compliant"));

        assert!(closing_recommendation(false, true, true).is_none());
        assert!(closing_recommendation(true, true, true).is_none());
    }

    // ── 5. Determinism ────────────────────────────────────────────────────────

    #[test]
    fn test_ids_are_fresh_but_findings_deterministic() {
        let c = compass();
        let a = evaluate(&c, "Export user data", EvaluationContext::default());
        let b = evaluate(&c, "Export user data", EvaluationContext::default());

        assert_ne!(a.evaluation_id, b.evaluation_id);
        assert_ne!(a.explanation_token, b.explanation_token);
        assert_eq!(a.concerns, b.concerns);
        assert_eq!(a.recommendations, b.recommendations);
        assert_eq!(a.ethical_score, b.ethical_score);
    }
}
