//! The operation adapter: the entry point external tools call.
//!
//! ```text
//!   evaluate_operation(type, context, user)
//!        │
//!        ├─ parse type ──▶ map to guidance context
//!        ├─ scan context for privacy keywords
//!        ├─ SilentGuide::provide_guidance ──▶ EthicsTrustIntegrator
//!        ├─ privacy_respect / privacy_violation trust event
//!        └─ record ──▶ OperationEvaluation
//! ```

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};

use atrian_contracts::{
    agent::OperationId,
    error::AtrianResult,
    integration::EthicsTrustEvent,
    operation::{
        GuidanceContext, InterfaceRecommendation, Notification, NotificationAction,
        NotificationKind, NotificationPriority, OperationEvaluation, OperationRecord,
        OperationType,
    },
};
use atrian_core::{
    traits::{EthicalEvaluator, MemoryBackend, TrustLedger},
    EthicsTrustIntegrator,
};

use crate::{config::AdapterConfig, guide::SilentGuide};

/// Operations kept for notifications and history; oldest are evicted first.
pub const MAX_OPERATION_HISTORY: usize = 1000;

pub const TRUST_SCORES_TITLE: &str = "ATRiAN Trust Scores";
pub const RECENT_GUIDANCE_TITLE: &str = "ATRiAN Recent Guidance";

const PERSISTED_GUIDANCE: usize = 20;

const PRIVACY_KEYWORDS: &[&str] = &[
    "personal",
    "private",
    "sensitive",
    "confidential",
    "user data",
    "password",
    "credential",
    "token",
    "api key",
];

const PRIVACY_RESPECT_MAGNITUDE: f64 = 0.05;
const PRIVACY_VIOLATION_MAGNITUDE: f64 = 0.1;

pub struct OperationAdapter {
    config: AdapterConfig,
    integrator: Arc<EthicsTrustIntegrator>,
    guide: SilentGuide,
    operations: Mutex<VecDeque<OperationRecord>>,
}

impl OperationAdapter {
    pub fn new(
        config: AdapterConfig,
        evaluator: Arc<dyn EthicalEvaluator>,
        ledger: Arc<dyn TrustLedger>,
    ) -> Self {
        let integrator = Arc::new(
            EthicsTrustIntegrator::new(evaluator, ledger)
                .with_min_trust_to_allow(config.min_trust_to_allow),
        );
        let guide = SilentGuide::new(Arc::clone(&integrator), config.guide.clone())
            .with_auto_guidance(config.enable_auto_guidance);

        Self {
            config,
            integrator,
            guide,
            operations: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn guide(&self) -> &SilentGuide {
        &self.guide
    }

    pub fn integrator(&self) -> &Arc<EthicsTrustIntegrator> {
        &self.integrator
    }

    fn operations(&self) -> MutexGuard<'_, VecDeque<OperationRecord>> {
        self.operations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve the guidance context configured for `operation_type`.
    pub fn guidance_context_for(&self, operation_type: OperationType) -> GuidanceContext {
        let Some(name) = self.config.operation_mapping.get(operation_type.as_str()) else {
            warn!(operation_type = %operation_type, "no guidance context mapped, using GENERAL");
            return GuidanceContext::General;
        };
        name.parse().unwrap_or_else(|e| {
            warn!(
                operation_type = %operation_type,
                mapped = %name,
                error = %e,
                "unparseable guidance context, using GENERAL"
            );
            GuidanceContext::General
        })
    }

    /// Evaluate an operation requested by `user_id`.
    ///
    /// Unknown operation types are evaluated as `general`.
    pub fn evaluate_operation(
        &self,
        operation_type: &str,
        context: serde_json::Value,
        user_id: &str,
    ) -> OperationEvaluation {
        let op_type = operation_type.parse().unwrap_or_else(|_| {
            warn!(operation_type = %operation_type, "unrecognized operation type, using general");
            OperationType::General
        });
        let guidance_context = self.guidance_context_for(op_type);
        let operation_id = OperationId::new(op_type.as_str());
        let start_time = Utc::now();

        let haystack = context.to_string().to_lowercase();
        let detected_keywords: Vec<String> = PRIVACY_KEYWORDS
            .iter()
            .filter(|k| haystack.contains(*k))
            .map(|k| k.to_string())
            .collect();
        let contains_sensitive_data = !detected_keywords.is_empty();

        let mut enhanced = match &context {
            serde_json::Value::Object(map) => map.clone(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        };
        enhanced.insert(
            "__atrian_metadata".to_string(),
            json!({
                "operation_id": operation_id,
                "contains_sensitive_data": contains_sensitive_data,
                "detected_privacy_keywords": detected_keywords,
                "is_sensitive_operation": op_type.is_sensitive(),
            }),
        );

        let guidance = self.guide.provide_guidance(
            &serde_json::Value::Object(enhanced),
            user_id,
            guidance_context,
        );
        let allowed = guidance.ethical_assessment.allowed;

        if contains_sensitive_data && self.config.enable_trust_tracking {
            if allowed {
                self.integrator.process_ethics_trust_event(
                    user_id,
                    EthicsTrustEvent::PrivacyRespect,
                    &format!("Proper handling of sensitive data in {} operation", op_type),
                    PRIVACY_RESPECT_MAGNITUDE,
                );
            } else {
                self.integrator.process_ethics_trust_event(
                    user_id,
                    EthicsTrustEvent::PrivacyViolation,
                    &format!("Potential privacy concern in {} operation", op_type),
                    PRIVACY_VIOLATION_MAGNITUDE,
                );
            }
        }

        let trust_level = guidance.trust_assessment.overall_score;
        let should_notify = !allowed
            || trust_level < self.config.notification_threshold
            || (contains_sensitive_data && self.config.privacy_sensitivity > 0.5);
        let notification_priority =
            NotificationPriority::for_decision(allowed, contains_sensitive_data);

        let evaluation = OperationEvaluation {
            operation_id: operation_id.clone(),
            allowed,
            guidance: guidance.content.clone(),
            guidance_type: guidance.guidance_type,
            trust_level,
            should_notify,
            notification_priority,
            ethical_warnings: guidance.ethical_assessment.warnings.clone(),
            contains_sensitive_data,
            detected_keywords,
        };

        self.record(OperationRecord {
            operation_id,
            operation_type: op_type,
            context,
            user_id: user_id.to_string(),
            guidance: guidance.content,
            guidance_type: guidance.guidance_type,
            ethical_assessment: guidance.ethical_assessment,
            trust_assessment: guidance.trust_assessment,
            should_notify,
            notification_priority,
            contains_sensitive_data,
            start_time,
            end_time: Utc::now(),
        });

        info!(
            operation_id = %evaluation.operation_id,
            operation_type = %op_type,
            allowed = allowed,
            should_notify = should_notify,
            "evaluated operation"
        );
        evaluation
    }

    fn record(&self, record: OperationRecord) {
        let mut operations = self.operations();
        operations.push_back(record);
        while operations.len() > MAX_OPERATION_HISTORY {
            operations.pop_front();
        }
    }

    /// Build the notification for a previously evaluated operation.
    ///
    /// Returns `None` for ids that were never evaluated (or were evicted).
    pub fn generate_notification(&self, operation_id: &OperationId) -> Option<Notification> {
        let operations = self.operations();
        let Some(op) = operations.iter().find(|r| &r.operation_id == operation_id) else {
            warn!(operation_id = %operation_id, "notification requested for unknown operation");
            return None;
        };

        if !op.should_notify {
            info!(operation_id = %operation_id, "operation does not require notification");
            return Some(Notification::NotRequired {
                operation_id: operation_id.clone(),
            });
        }

        let kind = if op.ethical_assessment.allowed {
            NotificationKind::Info
        } else {
            NotificationKind::Warning
        };
        let mut actions = Vec::new();
        if kind == NotificationKind::Warning {
            actions.push(NotificationAction::new(
                "Review Ethics Guidelines",
                "show_ethics_guidelines",
            ));
        }
        if op.contains_sensitive_data {
            actions.push(NotificationAction::new(
                "Review Privacy Best Practices",
                "show_privacy_guidelines",
            ));
        }

        info!(operation_id = %operation_id, kind = %kind.title_case(), "generated notification");
        Some(Notification::Required {
            operation_id: operation_id.clone(),
            kind,
            title: format!("ATRiAN {}: {}", kind.title_case(), op.operation_type),
            message: op.guidance.clone(),
            priority: op.notification_priority,
            actions,
            timestamp: Utc::now(),
        })
    }

    /// The last `limit` operations, oldest first.
    pub fn operation_history(&self, limit: usize) -> Vec<OperationRecord> {
        let operations = self.operations();
        let skip = operations.len().saturating_sub(limit);
        operations.iter().skip(skip).cloned().collect()
    }

    pub fn generate_adaptive_interface(&self, user_id: &str) -> InterfaceRecommendation {
        self.guide.adaptive_interface(user_id)
    }

    /// Write trust scores and recent guidance to `backend` as titled memories.
    pub fn persist_state(&self, backend: &dyn MemoryBackend) -> AtrianResult<()> {
        let scores = serde_json::to_string(&self.integrator.ledger().snapshot_scores())?;
        backend
            .create_memory(TRUST_SCORES_TITLE, &scores, &["atrian", "trust_scores"])
            .inspect_err(|e| error!(error = %e, "failed to persist trust scores"))?;

        let guidance = serde_json::to_string(&self.guide.guidance_history(PERSISTED_GUIDANCE))?;
        backend
            .create_memory(RECENT_GUIDANCE_TITLE, &guidance, &["atrian", "guidance_history"])
            .inspect_err(|e| error!(error = %e, "failed to persist recent guidance"))?;

        info!("persisted adapter state");
        Ok(())
    }

    /// Restore trust scores written by [`persist_state`](Self::persist_state).
    /// Returns how many scores were restored; zero when nothing was stored.
    pub fn load_state(&self, backend: &dyn MemoryBackend) -> AtrianResult<usize> {
        let Some(memory) = backend
            .get_memory_by_title(TRUST_SCORES_TITLE)
            .inspect_err(|e| error!(error = %e, "failed to load trust scores"))?
        else {
            info!("no persisted trust scores");
            return Ok(0);
        };

        let scores: BTreeMap<String, f64> = serde_json::from_str(&memory.content)
            .inspect_err(|e| error!(error = %e, "persisted trust scores are malformed"))?;
        self.integrator.ledger().restore_scores(&scores);

        info!(count = scores.len(), "loaded trust scores");
        Ok(scores.len())
    }
}
