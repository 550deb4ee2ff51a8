//! Operation adapter types: operation kinds, guidance, records and
//! notifications.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{agent::OperationId, error::AtrianError};

/// Kind of an externally requested operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    FileCreation,
    FileModification,
    CodeGeneration,
    CodeEditing,
    SystemConfig,
    Authentication,
    DataAccess,
    ExternalApiCall,
    UserInteraction,
    General,
}

impl OperationType {
    pub const ALL: [OperationType; 10] = [
        OperationType::FileCreation,
        OperationType::FileModification,
        OperationType::CodeGeneration,
        OperationType::CodeEditing,
        OperationType::SystemConfig,
        OperationType::Authentication,
        OperationType::DataAccess,
        OperationType::ExternalApiCall,
        OperationType::UserInteraction,
        OperationType::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::FileCreation => "file_creation",
            OperationType::FileModification => "file_modification",
            OperationType::CodeGeneration => "code_generation",
            OperationType::CodeEditing => "code_editing",
            OperationType::SystemConfig => "system_config",
            OperationType::Authentication => "authentication",
            OperationType::DataAccess => "data_access",
            OperationType::ExternalApiCall => "external_api_call",
            OperationType::UserInteraction => "user_interaction",
            OperationType::General => "general",
        }
    }

    /// Operations that touch files, credentials, configuration or external
    /// systems.
    pub fn is_sensitive(self) -> bool {
        matches!(
            self,
            OperationType::FileCreation
                | OperationType::CodeGeneration
                | OperationType::SystemConfig
                | OperationType::Authentication
                | OperationType::DataAccess
                | OperationType::ExternalApiCall
        )
    }

    /// Guidance context used when no mapping is configured for this type.
    pub fn default_guidance_context(self) -> GuidanceContext {
        match self {
            OperationType::FileCreation
            | OperationType::FileModification
            | OperationType::DataAccess => GuidanceContext::DataHandling,
            OperationType::CodeGeneration | OperationType::CodeEditing => {
                GuidanceContext::CodeEditing
            }
            OperationType::SystemConfig => GuidanceContext::SystemOperation,
            OperationType::Authentication | OperationType::ExternalApiCall => {
                GuidanceContext::SecurityOperation
            }
            OperationType::UserInteraction => GuidanceContext::UserInteraction,
            OperationType::General => GuidanceContext::General,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = AtrianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        OperationType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| AtrianError::parse("operation type", s))
    }
}

/// Coarse category that routes an operation to advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceContext {
    CodeEditing,
    DataHandling,
    SystemOperation,
    UserInteraction,
    SecurityOperation,
    Deployment,
    General,
}

impl GuidanceContext {
    pub const ALL: [GuidanceContext; 7] = [
        GuidanceContext::CodeEditing,
        GuidanceContext::DataHandling,
        GuidanceContext::SystemOperation,
        GuidanceContext::UserInteraction,
        GuidanceContext::SecurityOperation,
        GuidanceContext::Deployment,
        GuidanceContext::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GuidanceContext::CodeEditing => "code_editing",
            GuidanceContext::DataHandling => "data_handling",
            GuidanceContext::SystemOperation => "system_operation",
            GuidanceContext::UserInteraction => "user_interaction",
            GuidanceContext::SecurityOperation => "security_operation",
            GuidanceContext::Deployment => "deployment",
            GuidanceContext::General => "general",
        }
    }
}

impl fmt::Display for GuidanceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuidanceContext {
    type Err = AtrianError;

    /// Accepts both `data_handling` and `DATA_HANDLING` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        GuidanceContext::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| AtrianError::parse("guidance context", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceType {
    #[default]
    Suggestion,
    Warning,
    Alert,
    Insight,
    Recommendation,
    Educational,
    EthicalConsideration,
}

impl GuidanceType {
    pub fn as_str(self) -> &'static str {
        match self {
            GuidanceType::Suggestion => "suggestion",
            GuidanceType::Warning => "warning",
            GuidanceType::Alert => "alert",
            GuidanceType::Insight => "insight",
            GuidanceType::Recommendation => "recommendation",
            GuidanceType::Educational => "educational",
            GuidanceType::EthicalConsideration => "ethical_consideration",
        }
    }
}

impl fmt::Display for GuidanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
}

impl NotificationPriority {
    /// `High` if disallowed, else `Medium` if sensitive data was seen, else
    /// `Low`.
    pub fn for_decision(allowed: bool, contains_sensitive_data: bool) -> Self {
        if !allowed {
            NotificationPriority::High
        } else if contains_sensitive_data {
            NotificationPriority::Medium
        } else {
            NotificationPriority::Low
        }
    }
}

// ── Guidance ─────────────────────────────────────────────────────────────────

/// Trust snapshot attached to a piece of guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustAssessment {
    pub overall_score: f64,
    pub integrity: f64,
    pub transparency: f64,
    pub security: f64,
}

/// Ethics snapshot attached to a piece of guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicalAssessment {
    pub allowed: bool,
    pub ethical_score: f64,
    /// Ids of the ethics rules that triggered.
    pub relevant_rules: Vec<String>,
    /// Human-readable concern descriptions.
    pub warnings: Vec<String>,
}

/// Advice produced by the silent guide for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guidance {
    /// `guidance_<n>`, numbered per guide instance.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub context: GuidanceContext,
    pub guidance_type: GuidanceType,
    pub content: String,
    pub trust_assessment: TrustAssessment,
    pub ethical_assessment: EthicalAssessment,
}

// ── Operation records ────────────────────────────────────────────────────────

/// The caller-facing result of `evaluate_operation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEvaluation {
    pub operation_id: OperationId,
    pub allowed: bool,
    pub guidance: String,
    pub guidance_type: GuidanceType,
    /// The user's aggregate trust score at evaluation time.
    pub trust_level: f64,
    pub should_notify: bool,
    pub notification_priority: NotificationPriority,
    pub ethical_warnings: Vec<String>,
    pub contains_sensitive_data: bool,
    pub detected_keywords: Vec<String>,
}

/// One adapter call, as kept in the operation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub operation_id: OperationId,
    pub operation_type: OperationType,
    pub context: serde_json::Value,
    pub user_id: String,
    pub guidance: String,
    pub guidance_type: GuidanceType,
    pub ethical_assessment: EthicalAssessment,
    pub trust_assessment: TrustAssessment,
    pub should_notify: bool,
    pub notification_priority: NotificationPriority,
    pub contains_sensitive_data: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

// ── Notifications ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Warning,
    Info,
}

impl NotificationKind {
    pub fn title_case(self) -> &'static str {
        match self {
            NotificationKind::Warning => "Warning",
            NotificationKind::Info => "Info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub label: String,
    pub action: String,
}

impl NotificationAction {
    pub fn new(label: &str, action: &str) -> Self {
        Self {
            label: label.to_string(),
            action: action.to_string(),
        }
    }
}

/// A notification for a previously evaluated operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Notification {
    /// The operation did not meet any notification criterion.
    NotRequired { operation_id: OperationId },
    Required {
        operation_id: OperationId,
        kind: NotificationKind,
        title: String,
        message: String,
        priority: NotificationPriority,
        actions: Vec<NotificationAction>,
        timestamp: DateTime<Utc>,
    },
}

impl Notification {
    pub fn is_required(&self) -> bool {
        matches!(self, Notification::Required { .. })
    }
}

// ── Adaptive interface ───────────────────────────────────────────────────────

/// Interface hints derived from a user's trust score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceRecommendation {
    /// "low", "medium" or "high".
    pub trust_level: String,
    pub validation_level: String,
    pub explanation_detail: String,
    pub show_explanation_panels: bool,
    pub require_confirmations: bool,
    pub show_trust_indicators: bool,
    pub simplify_options: bool,
    pub messaging_tone: String,
    pub recommendation: String,
}
