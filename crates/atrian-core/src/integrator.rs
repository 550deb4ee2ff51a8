//! The trust-ethics integrator: combines ledger state and evaluator output
//! into one decision.
//!
//! Two directions are covered:
//!
//!   evaluate_action_with_trust:  ledger → evaluator → composite decision
//!   process_ethics_trust_event:  ethical event → ledger score + dimension
//!
//! The integrator never raises a score on its own. Trust only moves through
//! explicit events.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::Utc;
use tracing::{debug, info};

use atrian_contracts::{
    ethics::{EvaluationContext, EvaluationOptions, EvaluationResult},
    integration::{
        CompositeEvaluation, CompositeTrust, EthicsTrustEvent, EthicsTrustEventResult,
        IntegrationLogEntry,
    },
    trust::{TrustDimension, DEFAULT_INITIAL_TRUST},
};

use crate::traits::{EthicalEvaluator, TrustLedger};

/// Score below which an action is refused regardless of the ethics verdict.
pub const DEFAULT_MIN_TRUST_TO_ALLOW: f64 = 0.2;

/// Entries kept in the integrator's own event log.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Adjustments at or below this magnitude are not applied.
const MIN_EFFECTIVE_ADJUSTMENT: f64 = 0.01;

/// Wires an `EthicalEvaluator` to a `TrustLedger`.
///
/// Both services are shared through `Arc` so the adapter and the integrator
/// can hold the same ledger.
pub struct EthicsTrustIntegrator {
    evaluator: Arc<dyn EthicalEvaluator>,
    ledger: Arc<dyn TrustLedger>,
    min_trust_to_allow: f64,
    log_capacity: usize,
    log: Mutex<VecDeque<IntegrationLogEntry>>,
}

impl EthicsTrustIntegrator {
    pub fn new(evaluator: Arc<dyn EthicalEvaluator>, ledger: Arc<dyn TrustLedger>) -> Self {
        Self {
            evaluator,
            ledger,
            min_trust_to_allow: DEFAULT_MIN_TRUST_TO_ALLOW,
            log_capacity: DEFAULT_LOG_CAPACITY,
            log: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_min_trust_to_allow(mut self, min_trust: f64) -> Self {
        self.min_trust_to_allow = min_trust;
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity.max(1);
        self
    }

    pub fn evaluator(&self) -> &Arc<dyn EthicalEvaluator> {
        &self.evaluator
    }

    pub fn ledger(&self) -> &Arc<dyn TrustLedger> {
        &self.ledger
    }

    /// Evaluate `description` and combine it with the agent's trust.
    ///
    /// `action_allowed` is true only when the evaluation is compliant and the
    /// agent's score is at least `min_trust_to_allow`.
    pub fn evaluate_action_with_trust(
        &self,
        agent_id: &str,
        description: &str,
        context: &EvaluationContext,
    ) -> CompositeEvaluation {
        let trust_score = self.ledger.get_trust_score(agent_id);
        let dimensional_scores = self.ledger.dimension_scores(agent_id);

        let evaluation =
            self.evaluator
                .evaluate_action(description, context, &EvaluationOptions::default());

        let integrity = dimension_or_default(&dimensional_scores, TrustDimension::Integrity);
        let transparency = dimension_or_default(&dimensional_scores, TrustDimension::Transparency);
        let recommendation =
            composite_recommendation(&evaluation, trust_score, integrity, transparency);
        let action_allowed = evaluation.compliant && trust_score >= self.min_trust_to_allow;

        debug!(
            agent_id = %agent_id,
            trust_score = trust_score,
            compliant = evaluation.compliant,
            action_allowed = action_allowed,
            "composite evaluation complete"
        );

        let now = Utc::now();
        self.push_log(IntegrationLogEntry::Evaluation {
            agent_id: agent_id.to_string(),
            action: description.to_string(),
            ethical_compliant: evaluation.compliant,
            composite_allowed: action_allowed,
            trust_score,
            timestamp: now,
        });

        CompositeEvaluation {
            agent_id: agent_id.to_string(),
            action: description.to_string(),
            ethical_evaluation: evaluation,
            trust_assessment: CompositeTrust {
                overall_score: trust_score,
                dimensional_scores,
                trust_level: trust_level_label(trust_score).to_string(),
            },
            composite_recommendation: recommendation,
            action_allowed,
            timestamp: now,
        }
    }

    /// Apply an event with both ethical and trust implications.
    ///
    /// The event's multiplier is applied to `magnitude`; the result moves
    /// both the aggregate score and the event's dimension. Effective
    /// adjustments of 0.01 or less are skipped entirely.
    pub fn process_ethics_trust_event(
        &self,
        agent_id: &str,
        event: EthicsTrustEvent,
        details: &str,
        magnitude: f64,
    ) -> EthicsTrustEventResult {
        let adjustment = event.adjustment(magnitude);
        let dimension = event.dimension();
        let original_score = self.ledger.get_trust_score(agent_id);

        if adjustment.abs() > MIN_EFFECTIVE_ADJUSTMENT {
            self.ledger.update_trust_score(
                agent_id,
                event.as_str(),
                event.outcome().as_str(),
                adjustment.abs(),
                Some(&event.reason(details)),
            );
            self.ledger.update_dimension(agent_id, dimension, adjustment);
        } else {
            debug!(
                agent_id = %agent_id,
                event = %event,
                adjustment = adjustment,
                "adjustment below threshold, skipped"
            );
        }

        let new_score = self.ledger.get_trust_score(agent_id);
        let timestamp = Utc::now();

        info!(
            agent_id = %agent_id,
            event = %event,
            original_score = original_score,
            new_score = new_score,
            "processed ethics-trust event"
        );

        self.push_log(IntegrationLogEntry::EthicsTrustEvent {
            agent_id: agent_id.to_string(),
            event_type: event,
            trust_impact: new_score - original_score,
            timestamp,
        });

        EthicsTrustEventResult {
            agent_id: agent_id.to_string(),
            event_type: event,
            details: details.to_string(),
            original_score,
            new_score,
            adjustment: new_score - original_score,
            affected_dimension: dimension,
            ethical_implications: ethical_implications(event),
            timestamp,
        }
    }

    /// The most recent `limit` log entries, oldest first.
    pub fn event_log(&self, limit: usize) -> Vec<IntegrationLogEntry> {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = log.len().saturating_sub(limit);
        log.iter().skip(skip).cloned().collect()
    }

    fn push_log(&self, entry: IntegrationLogEntry) {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.push_back(entry);
        while log.len() > self.log_capacity {
            log.pop_front();
        }
    }
}

/// Human label for a trust score.
pub fn trust_level_label(score: f64) -> &'static str {
    if score >= 0.9 {
        "Highly Trusted"
    } else if score >= 0.75 {
        "Trusted"
    } else if score >= 0.5 {
        "Moderately Trusted"
    } else if score >= 0.25 {
        "Limited Trust"
    } else {
        "Minimal Trust"
    }
}

/// Recommendation text from trust, two key dimensions and the evaluation's
/// concerns.
pub fn composite_recommendation(
    evaluation: &EvaluationResult,
    trust_score: f64,
    integrity: f64,
    transparency: f64,
) -> String {
    let base = if trust_score < 0.3 {
        "Exercise extreme caution. Verify all information and actions."
    } else if trust_score < 0.6 {
        "Proceed with caution and additional verification."
    } else {
        "Proceed with standard verification protocols."
    };
    let mut parts = vec![base.to_string()];

    if integrity < 0.4 {
        parts.push("Integrity concerns detected. Consider additional validation.".to_string());
    } else if integrity > 0.8 {
        parts.push("High integrity demonstrated. Reduced validation acceptable.".to_string());
    }

    if transparency < 0.4 {
        parts.push(
            "Low transparency. Request additional information before proceeding.".to_string(),
        );
    } else if transparency > 0.8 {
        parts.push(
            "High transparency demonstrated. Clear communication established.".to_string(),
        );
    }

    if !evaluation.concerns.is_empty() {
        let warnings: Vec<&str> = evaluation
            .concerns
            .iter()
            .map(|c| c.description.as_str())
            .collect();
        parts.push(format!("Ethical considerations: {}", warnings.join(", ")));
    }

    parts.join(" ")
}

fn ethical_implications(event: EthicsTrustEvent) -> Vec<String> {
    let mut implications: Vec<String> = event
        .principles()
        .iter()
        .map(|p| format!("Implicates {} principle", p))
        .collect();
    implications.push("Subject to Ethics as a Service (EaaS) evaluation".to_string());
    implications
}

fn dimension_or_default(
    scores: &std::collections::BTreeMap<TrustDimension, f64>,
    dimension: TrustDimension,
) -> f64 {
    scores.get(&dimension).copied().unwrap_or(DEFAULT_INITIAL_TRUST)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeMap,
        sync::{Arc, Mutex},
    };

    use chrono::Utc;

    use atrian_contracts::{
        agent::{AgentId, EvaluationId},
        ethics::{
            EthicalConcern, EvaluationContext, EvaluationOptions, EvaluationResult, Severity,
        },
        integration::{EthicsTrustEvent, IntegrationLogEntry},
        trust::{clamp_score, TrustDimension, TrustEvent, DEFAULT_INITIAL_TRUST},
    };

    use crate::traits::{EthicalEvaluator, TrustLedger};

    use super::{composite_recommendation, trust_level_label, EthicsTrustIntegrator};

    // ── Mock helpers ─────────────────────────────────────────────────────────

    fn make_result(compliant: bool, concerns: Vec<EthicalConcern>) -> EvaluationResult {
        EvaluationResult {
            evaluation_id: EvaluationId::new(),
            compliant,
            ethical_score: if compliant { 0.9 } else { 0.3 },
            concerns,
            recommendations: vec![],
            explanation_token: "tok".to_string(),
            timestamp: Utc::now(),
        }
    }

    /// An evaluator that always returns a pre-configured verdict.
    struct MockEvaluator {
        compliant: bool,
    }

    impl EthicalEvaluator for MockEvaluator {
        fn evaluate_action(
            &self,
            _description: &str,
            _context: &EvaluationContext,
            _options: &EvaluationOptions,
        ) -> EvaluationResult {
            make_result(self.compliant, vec![])
        }
    }

    /// A minimal ledger keeping scores and dimensions in plain maps.
    #[derive(Default)]
    struct MockLedger {
        scores: Mutex<BTreeMap<String, f64>>,
        dimensions: Mutex<BTreeMap<(String, TrustDimension), f64>>,
        updates: Mutex<Vec<(String, String, f64)>>,
    }

    impl MockLedger {
        fn with_score(agent: &str, score: f64) -> Self {
            let ledger = Self::default();
            ledger.scores.lock().unwrap().insert(agent.to_string(), score);
            ledger
        }
    }

    impl TrustLedger for MockLedger {
        fn get_trust_score(&self, agent_id: &str) -> f64 {
            *self
                .scores
                .lock()
                .unwrap()
                .get(agent_id)
                .unwrap_or(&DEFAULT_INITIAL_TRUST)
        }

        fn update_trust_score(
            &self,
            agent_id: &str,
            event_type: &str,
            outcome: &str,
            magnitude: f64,
            _reason: Option<&str>,
        ) -> f64 {
            let current = self.get_trust_score(agent_id);
            let delta = if outcome == "negative" { -magnitude } else { magnitude };
            let next = clamp_score(current + delta);
            self.scores.lock().unwrap().insert(agent_id.to_string(), next);
            self.updates.lock().unwrap().push((
                agent_id.to_string(),
                event_type.to_string(),
                magnitude,
            ));
            next
        }

        fn get_trust_log(&self, _agent_id: Option<&str>, _last_n: Option<usize>) -> Vec<TrustEvent> {
            vec![]
        }

        fn dimension_scores(&self, agent_id: &str) -> BTreeMap<TrustDimension, f64> {
            let dims = self.dimensions.lock().unwrap();
            TrustDimension::ALL
                .into_iter()
                .map(|d| {
                    let v = dims
                        .get(&(agent_id.to_string(), d))
                        .copied()
                        .unwrap_or(DEFAULT_INITIAL_TRUST);
                    (d, v)
                })
                .collect()
        }

        fn update_dimension(&self, agent_id: &str, dimension: TrustDimension, adjustment: f64) -> f64 {
            let mut dims = self.dimensions.lock().unwrap();
            let entry = dims
                .entry((agent_id.to_string(), dimension))
                .or_insert(DEFAULT_INITIAL_TRUST);
            *entry = clamp_score(*entry + adjustment);
            *entry
        }

        fn snapshot_scores(&self) -> BTreeMap<String, f64> {
            self.scores.lock().unwrap().clone()
        }

        fn restore_scores(&self, scores: &BTreeMap<String, f64>) {
            for (agent, score) in scores {
                if AgentId::parse(agent).is_some() {
                    self.scores.lock().unwrap().insert(agent.clone(), clamp_score(*score));
                }
            }
        }
    }

    fn make_integrator(compliant: bool, ledger: Arc<MockLedger>) -> EthicsTrustIntegrator {
        EthicsTrustIntegrator::new(Arc::new(MockEvaluator { compliant }), ledger)
    }

    // ── Composite evaluation ─────────────────────────────────────────────────

    #[test]
    fn compliant_and_trusted_is_allowed() {
        let ledger = Arc::new(MockLedger::with_score("alice", 0.8));
        let integrator = make_integrator(true, ledger);

        let eval =
            integrator.evaluate_action_with_trust("alice", "read docs", &EvaluationContext::default());

        assert!(eval.action_allowed);
        assert_eq!(eval.trust_assessment.overall_score, 0.8);
        assert_eq!(eval.trust_assessment.trust_level, "Trusted");
        assert_eq!(eval.trust_assessment.dimensional_scores.len(), 6);
    }

    #[test]
    fn non_compliant_is_never_allowed() {
        let ledger = Arc::new(MockLedger::with_score("alice", 1.0));
        let integrator = make_integrator(false, ledger);

        let eval =
            integrator.evaluate_action_with_trust("alice", "anything", &EvaluationContext::default());
        assert!(!eval.action_allowed, "non-compliant evaluation must block the action");
    }

    #[test]
    fn low_trust_blocks_compliant_action() {
        let ledger = Arc::new(MockLedger::with_score("mallory", 0.1));
        let integrator = make_integrator(true, ledger);

        let eval = integrator.evaluate_action_with_trust(
            "mallory",
            "read docs",
            &EvaluationContext::default(),
        );
        assert!(eval.ethical_evaluation.compliant);
        assert!(!eval.action_allowed, "trust 0.1 is below the 0.2 floor");
        assert!(eval
            .composite_recommendation
            .starts_with("Exercise extreme caution."));
    }

    #[test]
    fn min_trust_to_allow_is_configurable() {
        let ledger = Arc::new(MockLedger::with_score("bob", 0.5));
        let integrator = make_integrator(true, ledger).with_min_trust_to_allow(0.6);

        let eval =
            integrator.evaluate_action_with_trust("bob", "read docs", &EvaluationContext::default());
        assert!(!eval.action_allowed);
    }

    #[test]
    fn evaluation_does_not_change_trust() {
        let ledger = Arc::new(MockLedger::with_score("alice", 0.4));
        let integrator = make_integrator(false, ledger.clone());

        integrator.evaluate_action_with_trust("alice", "anything", &EvaluationContext::default());
        assert_eq!(ledger.get_trust_score("alice"), 0.4);
        assert!(ledger.updates.lock().unwrap().is_empty());
    }

    // ── Trust labels & recommendations ───────────────────────────────────────

    #[test]
    fn trust_level_label_thresholds() {
        assert_eq!(trust_level_label(0.95), "Highly Trusted");
        assert_eq!(trust_level_label(0.9), "Highly Trusted");
        assert_eq!(trust_level_label(0.75), "Trusted");
        assert_eq!(trust_level_label(0.5), "Moderately Trusted");
        assert_eq!(trust_level_label(0.25), "Limited Trust");
        assert_eq!(trust_level_label(0.1), "Minimal Trust");
    }

    #[test]
    fn composite_recommendation_mentions_dimensions_and_concerns() {
        let concern = EthicalConcern {
            rule_id: None,
            principle: "privacy".to_string(),
            severity: Severity::High,
            description: "Action involves sensitive data.".to_string(),
        };
        let result = make_result(false, vec![concern]);

        let text = composite_recommendation(&result, 0.45, 0.3, 0.9);
        assert!(text.starts_with("Proceed with caution and additional verification."));
        assert!(text.contains("Integrity concerns detected."));
        assert!(text.contains("High transparency demonstrated."));
        assert!(text.contains("Ethical considerations: Action involves sensitive data."));
    }

    #[test]
    fn composite_recommendation_neutral_dimensions_add_nothing() {
        let result = make_result(true, vec![]);
        let text = composite_recommendation(&result, 0.7, 0.5, 0.5);
        assert_eq!(text, "Proceed with standard verification protocols.");
    }

    // ── Ethics-trust events ──────────────────────────────────────────────────

    #[test]
    fn privacy_violation_applies_multiplier_to_score_and_dimension() {
        let ledger = Arc::new(MockLedger::with_score("alice", 0.5));
        let integrator = make_integrator(true, ledger.clone());

        let result = integrator.process_ethics_trust_event(
            "alice",
            EthicsTrustEvent::PrivacyViolation,
            "logged raw emails",
            0.1,
        );

        assert!((result.new_score - 0.35).abs() < 1e-9, "got {}", result.new_score);
        assert!((result.adjustment + 0.15).abs() < 1e-9);
        assert_eq!(result.affected_dimension, TrustDimension::Benevolence);

        let dims = ledger.dimension_scores("alice");
        assert!((dims[&TrustDimension::Benevolence] - 0.35).abs() < 1e-9);
        assert_eq!(dims[&TrustDimension::Integrity], DEFAULT_INITIAL_TRUST);

        let updates = ledger.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1, "privacy_violation");
    }

    #[test]
    fn tiny_adjustments_are_skipped() {
        let ledger = Arc::new(MockLedger::with_score("alice", 0.5));
        let integrator = make_integrator(true, ledger.clone());

        let result = integrator.process_ethics_trust_event(
            "alice",
            EthicsTrustEvent::EthicalAlignment,
            "minor",
            0.005,
        );

        assert_eq!(result.adjustment, 0.0);
        assert_eq!(result.new_score, 0.5);
        assert!(ledger.updates.lock().unwrap().is_empty());
    }

    #[test]
    fn ethical_implications_name_principles() {
        let ledger = Arc::new(MockLedger::default());
        let integrator = make_integrator(true, ledger);

        let result = integrator.process_ethics_trust_event(
            "alice",
            EthicsTrustEvent::PrivacyRespect,
            "data minimization",
            0.08,
        );
        assert_eq!(
            result.ethical_implications,
            vec![
                "Implicates Sacred Privacy principle".to_string(),
                "Implicates Reciprocal Trust principle".to_string(),
                "Subject to Ethics as a Service (EaaS) evaluation".to_string(),
            ]
        );
    }

    // ── Event log ────────────────────────────────────────────────────────────

    #[test]
    fn event_log_is_bounded_and_ordered() {
        let ledger = Arc::new(MockLedger::default());
        let integrator = make_integrator(true, ledger).with_log_capacity(3);

        for i in 0..5 {
            integrator.evaluate_action_with_trust(
                "alice",
                &format!("action {}", i),
                &EvaluationContext::default(),
            );
        }

        let log = integrator.event_log(10);
        assert_eq!(log.len(), 3);
        match &log[0] {
            IntegrationLogEntry::Evaluation { action, .. } => assert_eq!(action, "action 2"),
            other => panic!("expected Evaluation entry, got {:?}", other),
        }
        assert_eq!(integrator.event_log(1).len(), 1);
    }
}
