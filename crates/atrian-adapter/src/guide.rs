//! The silent guide: contextual advice derived from ethics and trust.
//!
//! For each request the guide builds an action description from the
//! context, runs it through the integrator, and picks the first matching
//! keyword rule. Without a match it falls back to per-context advice, and
//! for contexts without specific advice, to trust-based advice.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError, RwLock},
};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use atrian_contracts::{
    error::{AtrianError, AtrianResult},
    ethics::EvaluationContext,
    integration::CompositeEvaluation,
    operation::{
        EthicalAssessment, Guidance, GuidanceContext, GuidanceType, InterfaceRecommendation,
        TrustAssessment,
    },
    trust::TrustDimension,
};
use atrian_core::EthicsTrustIntegrator;

use crate::config::{GuideConfig, GuidanceRule};

pub const MAX_GUIDANCE_HISTORY: usize = 100;

const PRIVACY_KEYWORDS: &[&str] = &[
    "personal",
    "private",
    "sensitive",
    "confidential",
    "user data",
    "password",
];

const SECURITY_KEYWORDS: &[&str] = &[
    "authentication",
    "authorization",
    "access control",
    "encryption",
    "credential",
];

static PLACEHOLDER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\{(\w+)\}").ok());

/// The last context a user was seen in, per guidance context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveContext {
    pub context: serde_json::Value,
    pub last_updated: DateTime<Utc>,
}

#[derive(Default)]
struct GuideState {
    history: VecDeque<Guidance>,
    issued: u64,
    active: HashMap<String, BTreeMap<String, ActiveContext>>,
}

pub struct SilentGuide {
    integrator: Arc<EthicsTrustIntegrator>,
    templates: RwLock<BTreeMap<String, String>>,
    rules: RwLock<Vec<GuidanceRule>>,
    auto_guidance: bool,
    state: Mutex<GuideState>,
}

impl SilentGuide {
    pub fn new(integrator: Arc<EthicsTrustIntegrator>, config: GuideConfig) -> Self {
        Self {
            integrator,
            templates: RwLock::new(config.templates),
            rules: RwLock::new(config.rules),
            auto_guidance: true,
            state: Mutex::new(GuideState::default()),
        }
    }

    /// Disable rule and fallback guidance; content comes back empty.
    pub fn with_auto_guidance(mut self, enabled: bool) -> Self {
        self.auto_guidance = enabled;
        self
    }

    pub fn integrator(&self) -> &Arc<EthicsTrustIntegrator> {
        &self.integrator
    }

    fn lock(&self) -> MutexGuard<'_, GuideState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Produce guidance for `user_id` acting in `context_type`.
    pub fn provide_guidance(
        &self,
        context: &serde_json::Value,
        user_id: &str,
        context_type: GuidanceContext,
    ) -> Guidance {
        self.update_active_context(user_id, context_type, context);

        let description = action_description(context, context_type);
        let composite = self.integrator.evaluate_action_with_trust(
            user_id,
            &description,
            &evaluation_context(context),
        );
        let trust_score = composite.trust_assessment.overall_score;

        let (content, guidance_type) = if self.auto_guidance {
            self.determine_guidance(context, context_type, trust_score)
        } else {
            (String::new(), GuidanceType::Suggestion)
        };

        let now = Utc::now();
        let mut state = self.lock();
        state.issued += 1;
        let guidance = Guidance {
            id: format!("guidance_{}", state.issued),
            timestamp: now,
            user_id: user_id.to_string(),
            context: context_type,
            guidance_type,
            content,
            trust_assessment: trust_assessment(&composite),
            ethical_assessment: ethical_assessment(&composite),
        };

        state.history.push_back(guidance.clone());
        while state.history.len() > MAX_GUIDANCE_HISTORY {
            state.history.pop_front();
        }
        drop(state);

        info!(
            user_id = %user_id,
            context = %context_type,
            guidance_type = %guidance_type,
            "provided guidance"
        );
        guidance
    }

    fn determine_guidance(
        &self,
        context: &serde_json::Value,
        context_type: GuidanceContext,
        trust_score: f64,
    ) -> (String, GuidanceType) {
        let haystack = context.to_string().to_lowercase();
        let templates = self.templates.read().unwrap_or_else(PoisonError::into_inner);
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);

        for rule in rules.iter() {
            if rule.context != context_type || trust_score < rule.trust_threshold {
                continue;
            }
            if !rule
                .keywords
                .iter()
                .any(|k| haystack.contains(&k.to_lowercase()))
            {
                continue;
            }

            let template = templates
                .get(&rule.template)
                .map(String::as_str)
                .unwrap_or("Guidance: {context}");
            let mut vars = rule.template_vars.clone();
            vars.entry("context".to_string())
                .or_insert_with(|| context_type.as_str().to_string());

            match fill_template(template, &vars) {
                Ok(text) => {
                    debug!(template = %rule.template, "guidance rule matched");
                    return (text, rule.guidance_type);
                }
                Err(e) => warn!(template = %rule.template, error = %e, "skipping guidance rule"),
            }
        }

        fallback_guidance(context, context_type, trust_score)
    }

    fn update_active_context(
        &self,
        user_id: &str,
        context_type: GuidanceContext,
        context: &serde_json::Value,
    ) {
        self.lock()
            .active
            .entry(user_id.to_string())
            .or_default()
            .insert(
                context_type.as_str().to_string(),
                ActiveContext {
                    context: context.clone(),
                    last_updated: Utc::now(),
                },
            );
    }

    /// The last `limit` pieces of guidance, oldest first.
    pub fn guidance_history(&self, limit: usize) -> Vec<Guidance> {
        let state = self.lock();
        let skip = state.history.len().saturating_sub(limit);
        state.history.iter().skip(skip).cloned().collect()
    }

    pub fn user_guidance_history(&self, user_id: &str, limit: usize) -> Vec<Guidance> {
        let state = self.lock();
        let mine: Vec<&Guidance> = state.history.iter().filter(|g| g.user_id == user_id).collect();
        let skip = mine.len().saturating_sub(limit);
        mine.into_iter().skip(skip).cloned().collect()
    }

    /// Contexts the user was last seen in, keyed by guidance context name.
    pub fn active_contexts(&self, user_id: &str) -> BTreeMap<String, ActiveContext> {
        self.lock().active.get(user_id).cloned().unwrap_or_default()
    }

    pub fn register_template(&self, name: &str, template: &str) {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), template.to_string());
        info!(template = %name, "registered guidance template");
    }

    /// Append a rule. Rules need at least one keyword and a template name.
    pub fn add_rule(&self, rule: GuidanceRule) -> AtrianResult<()> {
        if rule.keywords.iter().all(|k| k.trim().is_empty()) || rule.template.trim().is_empty() {
            return Err(AtrianError::InvalidInput {
                reason: "guidance rule needs keywords and a template".to_string(),
            });
        }
        info!(context = %rule.context, template = %rule.template, "added guidance rule");
        self.rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(rule);
        Ok(())
    }

    /// Interface hints for a user: more friction and explanation at low trust.
    pub fn adaptive_interface(&self, user_id: &str) -> InterfaceRecommendation {
        interface_for(self.integrator.ledger().get_trust_score(user_id))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn text<'a>(context: &'a serde_json::Value, field: &str, default: &'a str) -> &'a str {
    context.get(field).and_then(|v| v.as_str()).unwrap_or(default)
}

/// Human-readable description of what the user is doing, for evaluation.
pub fn action_description(context: &serde_json::Value, context_type: GuidanceContext) -> String {
    match context_type {
        GuidanceContext::CodeEditing => format!(
            "Editing {} in {}",
            text(context, "language", "code"),
            text(context, "file_path", "unknown file")
        ),
        GuidanceContext::DataHandling => format!(
            "{} {}",
            text(context, "operation", "processing"),
            text(context, "data_type", "data")
        ),
        GuidanceContext::SystemOperation => format!(
            "Performing system operation: {}",
            text(context, "operation", "system task")
        ),
        GuidanceContext::UserInteraction => format!(
            "User interaction: {}",
            text(context, "interaction_type", "interaction")
        ),
        GuidanceContext::SecurityOperation => format!(
            "Security operation: {}",
            text(context, "operation", "security task")
        ),
        GuidanceContext::Deployment => format!(
            "Deploying {} to {}",
            text(context, "component", "system"),
            text(context, "environment", "production")
        ),
        GuidanceContext::General => {
            let json = context.to_string();
            let head: String = json.chars().take(100).collect();
            format!("General operation in context: {}", head)
        }
    }
}

/// Pull `domain`, `purpose` (or `user_intent`) and `data_sources` out of an
/// operation context.
fn evaluation_context(context: &serde_json::Value) -> EvaluationContext {
    let purpose = context
        .get("purpose")
        .or_else(|| context.get("user_intent"))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let data_sources = context
        .get("data_sources")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    EvaluationContext {
        domain: context.get("domain").and_then(|v| v.as_str()).map(str::to_string),
        data_sources,
        purpose,
        ..EvaluationContext::default()
    }
}

fn fill_template(template: &str, vars: &BTreeMap<String, String>) -> AtrianResult<String> {
    let Some(re) = PLACEHOLDER.as_ref() else {
        return Ok(template.to_string());
    };
    if let Some(missing) = re
        .captures_iter(template)
        .filter_map(|c| c.get(1))
        .find(|name| !vars.contains_key(name.as_str()))
    {
        return Err(AtrianError::InvalidInput {
            reason: format!("template variable '{}' has no value", missing.as_str()),
        });
    }
    Ok(re
        .replace_all(template, |caps: &regex::Captures<'_>| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned())
}

fn fallback_guidance(
    context: &serde_json::Value,
    context_type: GuidanceContext,
    trust_score: f64,
) -> (String, GuidanceType) {
    let (content, kind) = match context_type {
        GuidanceContext::CodeEditing => {
            let code = text(context, "current_code", "").to_lowercase();
            if PRIVACY_KEYWORDS.iter().any(|k| code.contains(k)) {
                (
                    "Consider privacy implications in this code. Ensure proper data handling \
                     and consent.",
                    GuidanceType::EthicalConsideration,
                )
            } else if SECURITY_KEYWORDS.iter().any(|k| code.contains(k)) {
                (
                    "Security-sensitive code detected. Consider additional validation and \
                     protection measures.",
                    GuidanceType::Recommendation,
                )
            } else {
                (
                    "Continue developing with ethical principles in mind.",
                    GuidanceType::Suggestion,
                )
            }
        }
        GuidanceContext::DataHandling => {
            if text(context, "sensitivity", "unknown") == "high" {
                (
                    "This involves highly sensitive data. Ensure strict privacy controls and \
                     minimal access.",
                    GuidanceType::Warning,
                )
            } else {
                (
                    "Follow data minimization principles and ensure proper consent for data \
                     processing.",
                    GuidanceType::Recommendation,
                )
            }
        }
        GuidanceContext::SecurityOperation => (
            "Verify all security operations adhere to best practices and security standards.",
            GuidanceType::Alert,
        ),
        _ if trust_score < 0.3 => (
            "Proceed with caution. Additional verification recommended.",
            GuidanceType::Warning,
        ),
        _ if trust_score > 0.8 => (
            "Trusted context. Standard protocols sufficient.",
            GuidanceType::Insight,
        ),
        _ => (
            "Follow standard protocols for this operation.",
            GuidanceType::Suggestion,
        ),
    };
    (content.to_string(), kind)
}

fn trust_assessment(composite: &CompositeEvaluation) -> TrustAssessment {
    let dims = &composite.trust_assessment.dimensional_scores;
    let overall = composite.trust_assessment.overall_score;
    let dim = |d: TrustDimension| dims.get(&d).copied().unwrap_or(overall);
    TrustAssessment {
        overall_score: overall,
        integrity: dim(TrustDimension::Integrity),
        transparency: dim(TrustDimension::Transparency),
        security: dim(TrustDimension::Security),
    }
}

fn ethical_assessment(composite: &CompositeEvaluation) -> EthicalAssessment {
    let evaluation = &composite.ethical_evaluation;
    EthicalAssessment {
        allowed: composite.action_allowed,
        ethical_score: evaluation.ethical_score,
        relevant_rules: evaluation
            .concerns
            .iter()
            .filter_map(|c| c.rule_id.clone())
            .collect(),
        warnings: evaluation
            .concerns
            .iter()
            .map(|c| c.description.clone())
            .collect(),
    }
}

fn interface_for(trust_score: f64) -> InterfaceRecommendation {
    let build = |level: &str,
                 validation: &str,
                 detail: &str,
                 flags: [bool; 4],
                 tone: &str,
                 recommendation: &str| InterfaceRecommendation {
        trust_level: level.to_string(),
        validation_level: validation.to_string(),
        explanation_detail: detail.to_string(),
        show_explanation_panels: flags[0],
        require_confirmations: flags[1],
        show_trust_indicators: flags[2],
        simplify_options: flags[3],
        messaging_tone: tone.to_string(),
        recommendation: recommendation.to_string(),
    };

    if trust_score < 0.3 {
        build(
            "low",
            "high",
            "detailed",
            [true, true, true, false],
            "formal",
            "Provide detailed explanations and multiple confirmation steps for this user.",
        )
    } else if trust_score < 0.7 {
        build(
            "medium",
            "standard",
            "moderate",
            [true, false, true, false],
            "balanced",
            "Provide standard validation and moderate explanations for this user.",
        )
    } else {
        build(
            "high",
            "minimal",
            "concise",
            [false, false, false, true],
            "friendly",
            "Provide streamlined experience with minimal friction for this trusted user.",
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use atrian_contracts::operation::GuidanceContext;

    use super::{action_description, fill_template, interface_for};

    #[test]
    fn test_action_descriptions_per_context() {
        let ctx = json!({ "language": "rust", "file_path": "src/lib.rs" });
        assert_eq!(
            action_description(&ctx, GuidanceContext::CodeEditing),
            "Editing rust in src/lib.rs"
        );
        assert_eq!(
            action_description(&json!({}), GuidanceContext::Deployment),
            "Deploying system to production"
        );
        assert_eq!(
            action_description(&json!({ "data_type": "records" }), GuidanceContext::DataHandling),
            "processing records"
        );
    }

    #[test]
    fn test_fill_template_requires_every_variable() {
        let mut vars = BTreeMap::new();
        vars.insert("context".to_string(), "data_handling".to_string());
        assert_eq!(
            fill_template("Guidance: {context}", &vars).unwrap(),
            "Guidance: data_handling"
        );
        assert!(fill_template("Needs {missing}", &vars).is_err());
    }

    #[test]
    fn test_interface_bands() {
        assert_eq!(interface_for(0.1).trust_level, "low");
        assert!(interface_for(0.1).require_confirmations);
        assert_eq!(interface_for(0.3).trust_level, "medium");
        assert_eq!(interface_for(0.7).trust_level, "high");
        assert!(interface_for(0.95).simplify_options);
    }
}
