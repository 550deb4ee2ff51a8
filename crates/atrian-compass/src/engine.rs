//! Rule-based ethical evaluator.
//!
//! `EthicalCompass` implements the `EthicalEvaluator` trait from atrian-core.
//!
//! Evaluation algorithm:
//!
//! 1. Start compliant with a score of 0.9.
//! 2. Run every built-in check; each one that applies adds its concern and
//!    recommendation, makes the action non-compliant and caps the score.
//! 3. Test every loaded rule in declaration order. A triggered rule adds a
//!    concern and a rule-specific recommendation; if it is marked
//!    `disallow_if_triggered` the action becomes non-compliant and the score
//!    is capped at 0.3.
//! 4. Add the closing recommendation: "continue monitoring" when compliant
//!    with no concerns, "cease and re-evaluate" when non-compliant with no
//!    recommendation.
//!
//! The score only ever decreases, and every trigger accumulates.

use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use tracing::{debug, info};

use atrian_contracts::{
    agent::EvaluationId,
    ethics::{
        EthicalRecommendation, EthicsRule, EvaluationContext, EvaluationOptions,
        EvaluationResult, Severity,
    },
};
use atrian_core::traits::EthicalEvaluator;

use crate::{
    matcher::{rule_finding, triggering_predicate, Subject, BUILTIN_CHECKS},
    store::RuleStore,
};

/// Score of an action nothing objects to.
pub const BASELINE_SCORE: f64 = 0.9;

/// Cap applied when a disallowing rule triggers.
pub const DISALLOW_SCORE_CAP: f64 = 0.3;

/// An `EthicalEvaluator` backed by a list of `EthicsRule`s.
///
/// ```rust,ignore
/// use atrian_compass::{EthicalCompass, RuleStore};
///
/// let store = RuleStore::load("config/ethics_rules.yaml");
/// let compass = EthicalCompass::from_store(&store);
/// ```
#[derive(Debug, Default)]
pub struct EthicalCompass {
    rules: RwLock<Vec<EthicsRule>>,
}

impl EthicalCompass {
    pub fn new(rules: Vec<EthicsRule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    pub fn from_store(store: &RuleStore) -> Self {
        Self::new(store.rules().ethics.clone())
    }

    /// Swap in the ethics rules of a (typically just reloaded) store.
    pub fn reload_from(&self, store: &RuleStore) {
        let fresh = store.rules().ethics.clone();
        info!(rules = fresh.len(), "ethical compass rules replaced");
        *self.rules.write().unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    pub fn rule_count(&self) -> usize {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn rule_by_id(&self, id: &str) -> Option<EthicsRule> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }
}

/// The recommendation appended after all checks and rules have run.
///
/// Built-in checks and rule triggers each bring their own recommendation, so
/// the non-compliant branch only fires for a finding that carries none.
pub(crate) fn closing_recommendation(
    compliant: bool,
    has_concerns: bool,
    has_recommendations: bool,
) -> Option<EthicalRecommendation> {
    if compliant && !has_concerns {
        Some(EthicalRecommendation {
            action: "Proceed with continuous ethical monitoring and adherence to MQP.".to_string(),
            priority: Severity::Low,
            rationale: "Maintain ethical standards throughout the lifecycle, guided by MQP \
                        principles."
                .to_string(),
        })
    } else if !compliant && !has_recommendations {
        Some(EthicalRecommendation {
            action: "Action deemed non-compliant. Cease and re-evaluate based on concerns."
                .to_string(),
            priority: Severity::Critical,
            rationale: "Immediate re-evaluation required to address ethical violations."
                .to_string(),
        })
    } else {
        None
    }
}

impl EthicalEvaluator for EthicalCompass {
    fn evaluate_action(
        &self,
        description: &str,
        context: &EvaluationContext,
        options: &EvaluationOptions,
    ) -> EvaluationResult {
        debug!(
            description = %description,
            domain = ?context.domain,
            detail_level = ?options.detail_level,
            "evaluating action"
        );

        let subject = Subject::new(description, context);
        let mut concerns = Vec::new();
        let mut recommendations = Vec::new();
        let mut compliant = true;
        let mut score = BASELINE_SCORE;

        for check in BUILTIN_CHECKS {
            if !check.applies(&subject) {
                continue;
            }
            let finding = check.finding();
            debug!(check = ?check, "built-in check applied");
            concerns.push(finding.concern);
            recommendations.push(finding.recommendation);
            compliant = false;
            score = score.min(finding.score_cap);
        }

        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        for rule in rules.iter() {
            let Some(predicate) = triggering_predicate(rule, &subject) else {
                continue;
            };

            debug!(rule_id = %rule.id, predicate = ?predicate, "rule triggered");

            let (concern, recommendation) = rule_finding(rule);
            concerns.push(concern);
            recommendations.push(recommendation);

            if rule.disallow_if_triggered {
                compliant = false;
                score = score.min(DISALLOW_SCORE_CAP);
            }
        }
        drop(rules);

        let closing =
            closing_recommendation(compliant, !concerns.is_empty(), !recommendations.is_empty());
        recommendations.extend(closing);

        let ethical_score = (score * 100.0).round() / 100.0;

        debug!(
            compliant,
            ethical_score,
            concerns = concerns.len(),
            "action evaluated"
        );

        EvaluationResult {
            evaluation_id: EvaluationId::new(),
            compliant,
            ethical_score,
            concerns,
            recommendations,
            explanation_token: format!("expl_token_{}", uuid::Uuid::new_v4()),
            timestamp: Utc::now(),
        }
    }
}
