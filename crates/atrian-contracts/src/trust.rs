//! Trust ledger types: scores, events, baselines and boundaries.
//!
//! A trust score is a float in `[TRUST_SCORE_MIN, TRUST_SCORE_MAX]`. Every
//! mutation goes through `clamp_score`, and every logged `TrustEvent`
//! satisfies `new_score == clamp_score(original_score + adjustment)`.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{agent::AgentId, error::AtrianError};

/// Lowest possible trust score.
pub const TRUST_SCORE_MIN: f64 = 0.0;

/// Highest possible trust score.
pub const TRUST_SCORE_MAX: f64 = 1.0;

/// Score for agents that have neither a record nor a configured baseline.
pub const DEFAULT_INITIAL_TRUST: f64 = 0.5;

/// Clamp `score` into the valid trust range.
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(TRUST_SCORE_MIN, TRUST_SCORE_MAX)
}

/// Direction of a trust-affecting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustOutcome {
    Positive,
    Negative,
    Neutral,
}

impl TrustOutcome {
    /// The signed adjustment this outcome applies for `magnitude`.
    ///
    /// The sign always comes from the outcome, never from `magnitude`.
    pub fn signed(self, magnitude: f64) -> f64 {
        match self {
            TrustOutcome::Positive => magnitude.abs(),
            TrustOutcome::Negative => -magnitude.abs(),
            TrustOutcome::Neutral => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrustOutcome::Positive => "positive",
            TrustOutcome::Negative => "negative",
            TrustOutcome::Neutral => "neutral",
        }
    }
}

impl FromStr for TrustOutcome {
    type Err = AtrianError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(TrustOutcome::Positive),
            "negative" => Ok(TrustOutcome::Negative),
            "neutral" => Ok(TrustOutcome::Neutral),
            _ => Err(AtrianError::parse("trust outcome", s)),
        }
    }
}

/// Configured trust level from a `trust_rules` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    SystemCritical,
    High,
    Medium,
    Low,
    Untrusted,
    Blocked,
}

impl TrustLevel {
    /// Initial score for an agent configured at this level.
    pub fn baseline_score(self) -> f64 {
        match self {
            TrustLevel::SystemCritical | TrustLevel::High => 0.9,
            TrustLevel::Medium => 0.65,
            TrustLevel::Low => 0.4,
            TrustLevel::Untrusted => 0.2,
            TrustLevel::Blocked => 0.0,
        }
    }

    /// The `(min, max)` band a healthy score for this level stays within.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            TrustLevel::SystemCritical => (0.7, 1.0),
            TrustLevel::High => (0.6, 0.95),
            TrustLevel::Medium => (0.4, 0.85),
            TrustLevel::Low => (0.2, 0.7),
            TrustLevel::Untrusted => (0.0, 0.5),
            TrustLevel::Blocked => (0.0, 0.3),
        }
    }
}

impl FromStr for TrustLevel {
    type Err = AtrianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "system_critical" => Ok(TrustLevel::SystemCritical),
            "high" => Ok(TrustLevel::High),
            "medium" => Ok(TrustLevel::Medium),
            "low" => Ok(TrustLevel::Low),
            "untrusted" => Ok(TrustLevel::Untrusted),
            "blocked" => Ok(TrustLevel::Blocked),
            _ => Err(AtrianError::parse("trust level", s)),
        }
    }
}

/// Facets of trust tracked alongside the aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustDimension {
    Reliability,
    Competence,
    Integrity,
    Benevolence,
    Transparency,
    Security,
}

impl TrustDimension {
    pub const ALL: [TrustDimension; 6] = [
        TrustDimension::Reliability,
        TrustDimension::Competence,
        TrustDimension::Integrity,
        TrustDimension::Benevolence,
        TrustDimension::Transparency,
        TrustDimension::Security,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TrustDimension::Reliability => "reliability",
            TrustDimension::Competence => "competence",
            TrustDimension::Integrity => "integrity",
            TrustDimension::Benevolence => "benevolence",
            TrustDimension::Transparency => "transparency",
            TrustDimension::Security => "security",
        }
    }
}

impl fmt::Display for TrustDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far an agent may hand work to other agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelegationScope {
    Full,
    Partial,
    #[default]
    None,
}

/// A `trust_rules` entry: the configured starting point for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustBaseline {
    /// The agent this baseline applies to. Required.
    pub agent: String,

    /// Trust level name. Missing means `medium`; unknown names fall back to
    /// `DEFAULT_INITIAL_TRUST` with a warning.
    #[serde(default)]
    pub level: Option<String>,

    #[serde(default)]
    pub delegation: DelegationScope,

    /// Agents this one may delegate to. `"*"` allows any agent.
    #[serde(default)]
    pub can_delegate_to: Vec<String>,
}

/// Current trust state of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustRecord {
    pub agent_id: AgentId,
    /// Always within `[TRUST_SCORE_MIN, TRUST_SCORE_MAX]`.
    pub score: f64,
    pub last_updated: DateTime<Utc>,
}

/// An immutable entry in the trust event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustEvent {
    pub agent_id: AgentId,
    /// Caller-defined event kind (e.g. "task_completion", "privacy_respect").
    pub event_type: String,
    /// The outcome as supplied by the caller, lower-cased. Unrecognized
    /// outcomes are kept verbatim with `success = false`.
    pub outcome: String,
    pub magnitude: f64,
    pub original_score: f64,
    /// Signed adjustment; zero for neutral and rejected events.
    pub adjustment: f64,
    pub new_score: f64,
    pub reason: String,
    /// False when the update was rejected and the score left unchanged.
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// Severity of a trust boundary violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Low,
    Critical,
}

/// Result of checking an agent's score against its level's band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCheck {
    pub within_bounds: bool,
    pub current_score: f64,
    pub min_bound: f64,
    pub max_bound: f64,
    pub warning_level: Option<WarningLevel>,
}
