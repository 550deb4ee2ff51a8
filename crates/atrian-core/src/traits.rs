//! Core trait definitions for the ATRiAN services.
//!
//! These three traits are the seams between the components:
//!
//! - `EthicalEvaluator`: rule-based judgement of an action description
//! - `TrustLedger`: per-agent trust scores and their event log
//! - `MemoryBackend`: pluggable key/value persistence
//!
//! The integrator and the operation adapter only ever talk to these traits,
//! so each implementation can be swapped for a mock in tests.

use std::collections::BTreeMap;

use chrono::Utc;

use atrian_contracts::{
    error::AtrianResult,
    ethics::{EvaluationContext, EvaluationOptions, EvaluationResult},
    memory::{Memory, Metadata, StoredEntry},
    trust::{TrustDimension, TrustEvent},
};

/// Judges an action against a loaded rule set.
///
/// Implementations must be synchronous, free of I/O and total: empty
/// descriptions and contexts are valid input and never produce an error.
pub trait EthicalEvaluator: Send + Sync {
    fn evaluate_action(
        &self,
        description: &str,
        context: &EvaluationContext,
        options: &EvaluationOptions,
    ) -> EvaluationResult;
}

/// Per-agent trust scores with an append-only event log.
///
/// Every method takes the raw caller-supplied agent id. Implementations
/// normalize it with `AgentId::parse` and fail safe on invalid ids.
pub trait TrustLedger: Send + Sync {
    /// Current score. Never decays or otherwise mutates state.
    fn get_trust_score(&self, agent_id: &str) -> f64;

    /// Apply one event and return the resulting score.
    ///
    /// `outcome` is one of `positive`, `negative`, `neutral`
    /// (case-insensitive). Anything else is logged with `success = false`
    /// and leaves the score unchanged.
    fn update_trust_score(
        &self,
        agent_id: &str,
        event_type: &str,
        outcome: &str,
        magnitude: f64,
        reason: Option<&str>,
    ) -> f64;

    /// Events in insertion order, optionally filtered to one agent and
    /// windowed to the last `last_n`.
    fn get_trust_log(&self, agent_id: Option<&str>, last_n: Option<usize>) -> Vec<TrustEvent>;

    /// All dimension scores for an agent.
    fn dimension_scores(&self, agent_id: &str) -> BTreeMap<TrustDimension, f64>;

    /// Adjust one dimension by a signed amount and return its new value.
    /// The aggregate score is not touched.
    fn update_dimension(&self, agent_id: &str, dimension: TrustDimension, adjustment: f64) -> f64;

    /// Every known agent's current score.
    fn snapshot_scores(&self) -> BTreeMap<String, f64>;

    /// Overwrite scores for the given agents, e.g. after loading persisted
    /// state. Values are clamped; invalid ids are skipped.
    fn restore_scores(&self, scores: &BTreeMap<String, f64>);
}

/// Key/value persistence for values with free-form metadata.
pub trait MemoryBackend: Send + Sync {
    fn store(&self, key: &str, value: &serde_json::Value, metadata: &Metadata) -> AtrianResult<()>;

    /// `Ok(None)` when the key does not exist.
    fn retrieve(&self, key: &str) -> AtrianResult<Option<StoredEntry>>;

    /// Keys starting with `prefix`, sorted. An empty prefix lists everything.
    fn list(&self, prefix: &str) -> AtrianResult<Vec<String>>;

    /// Returns whether the key existed.
    fn delete(&self, key: &str) -> AtrianResult<bool>;

    /// Delete every key starting with `prefix` and return how many were
    /// removed.
    fn clear(&self, prefix: &str) -> AtrianResult<usize>;

    /// Look up a titled memory.
    fn get_memory_by_title(&self, title: &str) -> AtrianResult<Option<Memory>> {
        match self.retrieve(&memory_key(title))? {
            Some(entry) => Ok(Some(serde_json::from_value(entry.value)?)),
            None => Ok(None),
        }
    }

    /// Create or replace a titled memory.
    fn create_memory(&self, title: &str, content: &str, tags: &[&str]) -> AtrianResult<Memory> {
        let memory = Memory {
            title: title.to_string(),
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            updated_at: Utc::now(),
        };
        let mut metadata = Metadata::new();
        metadata.insert("kind".to_string(), serde_json::Value::from("memory"));
        self.store(&memory_key(title), &serde_json::to_value(&memory)?, &metadata)?;
        Ok(memory)
    }
}

/// Storage key for a titled memory.
pub fn memory_key(title: &str) -> String {
    format!("memory:{}", title)
}
