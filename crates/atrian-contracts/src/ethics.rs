//! Ethics rules, evaluation requests and evaluation results.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{agent::EvaluationId, error::AtrianError};

/// Severity of a rule, concern or recommendation.
///
/// Ordered so that `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = AtrianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(AtrianError::parse("severity", s)),
        }
    }
}

/// A declarative ethics rule from the `ethics` list of a rules file.
///
/// ```yaml
/// - id: ER-SP-001
///   principle: Sacred Privacy
///   rule: Do not share user data without consent
///   scope: data_sharing
///   keywords: [share user data, export pii]
///   severity: high
///   disallow_if_triggered: true
///   guidance: Obtain explicit consent first.
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicsRule {
    /// Unique rule identifier. Required.
    pub id: String,

    #[serde(default)]
    pub principle: Option<String>,

    /// Rule text; also matched verbatim against the action description.
    #[serde(default)]
    pub rule: Option<String>,

    /// Matched against the evaluation context's domain and purpose.
    #[serde(default)]
    pub scope: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub severity: Severity,

    /// When true, triggering this rule makes the action non-compliant.
    #[serde(default)]
    pub disallow_if_triggered: bool,

    #[serde(default)]
    pub guidance: Option<String>,
}

/// Structured context attached to an action under evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub data_sources: Vec<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub stakeholders: Vec<String>,
}

impl EvaluationContext {
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    pub fn with_data_source(mut self, source: impl Into<String>) -> Self {
        self.data_sources.push(source.into());
        self
    }
}

/// Caller options for an evaluation. Currently informational only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOptions {
    #[serde(default)]
    pub detail_level: Option<String>,
    #[serde(default)]
    pub include_explanation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicalConcern {
    /// Id of the rule that raised this concern; `None` for built-in checks.
    #[serde(default)]
    pub rule_id: Option<String>,
    pub principle: String,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicalRecommendation {
    pub action: String,
    pub priority: Severity,
    pub rationale: String,
}

/// The outcome of one `evaluate_action` call.
///
/// `evaluation_id` and `explanation_token` are fresh per call; everything
/// else is a deterministic function of the description, context and rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub evaluation_id: EvaluationId,
    pub compliant: bool,
    /// In `[0, 1]`, rounded to two decimals.
    pub ethical_score: f64,
    pub concerns: Vec<EthicalConcern>,
    pub recommendations: Vec<EthicalRecommendation>,
    pub explanation_token: String,
    pub timestamp: DateTime<Utc>,
}

impl EvaluationResult {
    /// The most severe concern, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.concerns.iter().map(|c| c.severity).max()
    }
}
