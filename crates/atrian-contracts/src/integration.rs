//! Types shared by the trust-ethics integrator.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AtrianError,
    ethics::EvaluationResult,
    trust::{TrustDimension, TrustOutcome},
};

/// An event with both ethical and trust implications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EthicsTrustEvent {
    EthicalViolation,
    EthicalAlignment,
    TrustBoundaryCrossed,
    PrivacyRespect,
    PrivacyViolation,
    TransparencyAlignment,
    TransparencyViolation,
    IntegrityEnhancement,
    IntegrityCompromise,
}

impl EthicsTrustEvent {
    pub const ALL: [EthicsTrustEvent; 9] = [
        EthicsTrustEvent::EthicalViolation,
        EthicsTrustEvent::EthicalAlignment,
        EthicsTrustEvent::TrustBoundaryCrossed,
        EthicsTrustEvent::PrivacyRespect,
        EthicsTrustEvent::PrivacyViolation,
        EthicsTrustEvent::TransparencyAlignment,
        EthicsTrustEvent::TransparencyViolation,
        EthicsTrustEvent::IntegrityEnhancement,
        EthicsTrustEvent::IntegrityCompromise,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EthicsTrustEvent::EthicalViolation => "ethical_violation",
            EthicsTrustEvent::EthicalAlignment => "ethical_alignment",
            EthicsTrustEvent::TrustBoundaryCrossed => "trust_boundary_crossed",
            EthicsTrustEvent::PrivacyRespect => "privacy_respect",
            EthicsTrustEvent::PrivacyViolation => "privacy_violation",
            EthicsTrustEvent::TransparencyAlignment => "transparency_alignment",
            EthicsTrustEvent::TransparencyViolation => "transparency_violation",
            EthicsTrustEvent::IntegrityEnhancement => "integrity_enhancement",
            EthicsTrustEvent::IntegrityCompromise => "integrity_compromise",
        }
    }

    pub fn outcome(self) -> TrustOutcome {
        match self {
            EthicsTrustEvent::EthicalAlignment
            | EthicsTrustEvent::PrivacyRespect
            | EthicsTrustEvent::TransparencyAlignment
            | EthicsTrustEvent::IntegrityEnhancement => TrustOutcome::Positive,
            EthicsTrustEvent::EthicalViolation
            | EthicsTrustEvent::TrustBoundaryCrossed
            | EthicsTrustEvent::PrivacyViolation
            | EthicsTrustEvent::TransparencyViolation
            | EthicsTrustEvent::IntegrityCompromise => TrustOutcome::Negative,
        }
    }

    /// The trust dimension this event moves.
    pub fn dimension(self) -> TrustDimension {
        match self {
            EthicsTrustEvent::EthicalViolation
            | EthicsTrustEvent::EthicalAlignment
            | EthicsTrustEvent::IntegrityEnhancement
            | EthicsTrustEvent::IntegrityCompromise => TrustDimension::Integrity,
            EthicsTrustEvent::PrivacyRespect | EthicsTrustEvent::PrivacyViolation => {
                TrustDimension::Benevolence
            }
            EthicsTrustEvent::TransparencyAlignment | EthicsTrustEvent::TransparencyViolation => {
                TrustDimension::Transparency
            }
            EthicsTrustEvent::TrustBoundaryCrossed => TrustDimension::Security,
        }
    }

    /// Penalty multiplier applied to the caller's magnitude.
    pub fn multiplier(self) -> f64 {
        match self {
            EthicsTrustEvent::PrivacyViolation => 1.5,
            EthicsTrustEvent::TrustBoundaryCrossed => 1.3,
            EthicsTrustEvent::IntegrityCompromise => 1.2,
            _ => 1.0,
        }
    }

    /// Signed adjustment for `magnitude`, multiplier included.
    pub fn adjustment(self, magnitude: f64) -> f64 {
        self.outcome().signed(magnitude * self.multiplier())
    }

    pub fn reason(self, details: &str) -> String {
        let prefix = match self {
            EthicsTrustEvent::EthicalViolation => "Ethical violation",
            EthicsTrustEvent::EthicalAlignment => "Ethical alignment",
            EthicsTrustEvent::TrustBoundaryCrossed => "Trust boundary violation",
            EthicsTrustEvent::PrivacyRespect => "Privacy respected",
            EthicsTrustEvent::PrivacyViolation => "Privacy violation",
            EthicsTrustEvent::TransparencyAlignment => "Transparency demonstrated",
            EthicsTrustEvent::TransparencyViolation => "Lack of transparency",
            EthicsTrustEvent::IntegrityEnhancement => "Integrity enhanced",
            EthicsTrustEvent::IntegrityCompromise => "Integrity compromised",
        };
        format!("{}: {}", prefix, details)
    }

    /// Principles implicated by this event.
    pub fn principles(self) -> &'static [&'static str] {
        match self {
            EthicsTrustEvent::EthicalViolation | EthicsTrustEvent::EthicalAlignment => {
                &["Integrated Ethics", "Reciprocal Trust"]
            }
            EthicsTrustEvent::PrivacyRespect => &["Sacred Privacy", "Reciprocal Trust"],
            EthicsTrustEvent::PrivacyViolation => &["Sacred Privacy"],
            EthicsTrustEvent::TransparencyAlignment => &["Transparency", "Reciprocal Trust"],
            EthicsTrustEvent::TransparencyViolation => &["Transparency"],
            EthicsTrustEvent::IntegrityEnhancement => &["Integrity", "Reciprocal Trust"],
            EthicsTrustEvent::IntegrityCompromise => &["Integrity"],
            EthicsTrustEvent::TrustBoundaryCrossed => &["Security", "Reciprocal Trust"],
        }
    }
}

impl fmt::Display for EthicsTrustEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EthicsTrustEvent {
    type Err = AtrianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        EthicsTrustEvent::ALL
            .into_iter()
            .find(|e| e.as_str() == wanted)
            .ok_or_else(|| AtrianError::parse("ethics-trust event", s))
    }
}

/// Result of `process_ethics_trust_event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicsTrustEventResult {
    pub agent_id: String,
    pub event_type: EthicsTrustEvent,
    pub details: String,
    pub original_score: f64,
    pub new_score: f64,
    /// `new_score - original_score`; zero when the adjustment was skipped.
    pub adjustment: f64,
    pub affected_dimension: TrustDimension,
    pub ethical_implications: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Trust side of a composite evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeTrust {
    pub overall_score: f64,
    pub dimensional_scores: BTreeMap<TrustDimension, f64>,
    /// Human label such as "Moderately Trusted".
    pub trust_level: String,
}

/// Result of `evaluate_action_with_trust`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeEvaluation {
    pub agent_id: String,
    pub action: String,
    pub ethical_evaluation: EvaluationResult,
    pub trust_assessment: CompositeTrust,
    pub composite_recommendation: String,
    pub action_allowed: bool,
    pub timestamp: DateTime<Utc>,
}

/// One entry in the integrator's own bounded log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrationLogEntry {
    Evaluation {
        agent_id: String,
        action: String,
        ethical_compliant: bool,
        composite_allowed: bool,
        trust_score: f64,
        timestamp: DateTime<Utc>,
    },
    EthicsTrustEvent {
        agent_id: String,
        event_type: EthicsTrustEvent,
        trust_impact: f64,
        timestamp: DateTime<Utc>,
    },
}
