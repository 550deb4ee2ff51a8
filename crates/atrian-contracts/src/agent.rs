//! Agent and request identity types.
//!
//! Agents are identified by free-form strings supplied by callers. Every
//! component normalizes them through `AgentId::parse` so that whitespace and
//! empty ids are handled in exactly one place.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for an agent or user whose trust is tracked.
///
/// Example: `AgentId("Cascade")`. Always trimmed and non-empty when built
/// through `parse`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Normalize a caller-supplied id.
    ///
    /// Returns `None` for empty or whitespace-only input; callers treat that
    /// as an invalid agent and fail safe.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for one ethical evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationId(pub uuid::Uuid);

impl EvaluationId {
    /// Create a new, unique evaluation ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for EvaluationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one adapter operation: `<operation_type>-<uuid>`.
///
/// The operation type prefix keeps ids readable in logs and storage keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub String);

impl OperationId {
    /// Create a new, unique operation ID for the given operation type label.
    pub fn new(operation_type: &str) -> Self {
        Self(format!("{}-{}", operation_type, uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
