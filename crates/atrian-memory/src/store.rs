//! Keyed storage of trust scores and operations on top of a `MemoryBackend`.
//!
//! Keys follow `atrian:{kind}:{user}[:{sub}]`, with `%` and `:` in the user
//! id escaped as `%25` and `%3A`:
//!
//! | kind        | value                                   |
//! |-------------|-----------------------------------------|
//! | `trust`     | the user's last persisted score         |
//! | `operation` | one `StoredOperation`, `sub` = its id   |
//! | `history`   | the user's `HistoryIndex`, newest first |
//!
//! Operation metadata carries `timestamp`, `type`, and (with the privacy
//! filter enabled) `sensitivity` and `retention_date`.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use atrian_contracts::{error::AtrianResult, memory::Metadata, trust::clamp_score};
use atrian_core::traits::MemoryBackend;

use crate::privacy::{PrivacyFilter, Sensitivity};

pub const KEY_ROOT: &str = "atrian";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Cap on each history list (overall and per operation type).
    #[serde(default = "default_max_operation_history")]
    pub max_operation_history: usize,

    #[serde(default = "default_true")]
    pub enable_privacy_filter: bool,
}

fn default_max_operation_history() -> usize {
    100
}

fn default_true() -> bool {
    true
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_operation_history: default_max_operation_history(),
            enable_privacy_filter: default_true(),
        }
    }
}

/// One persisted operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredOperation {
    pub operation_id: String,
    pub operation_type: String,
    pub user_id: String,
    pub context: serde_json::Value,
    pub result: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub operation_type: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-user index of stored operations, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryIndex {
    #[serde(default)]
    pub operations: Vec<HistoryEntry>,
    #[serde(default)]
    pub by_type: BTreeMap<String, Vec<HistoryEntry>>,
}

impl HistoryIndex {
    fn push_front(&mut self, entry: HistoryEntry, cap: usize) {
        self.operations.insert(0, entry.clone());
        self.operations.truncate(cap);

        let typed = self.by_type.entry(entry.operation_type.clone()).or_default();
        typed.insert(0, entry);
        typed.truncate(cap);
    }

    fn remove(&mut self, operation_id: &str) {
        self.operations.retain(|e| e.id != operation_id);
        for entries in self.by_type.values_mut() {
            entries.retain(|e| e.id != operation_id);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SensitivityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub total_items: usize,
    pub operation_count: usize,
    pub trust_score_count: usize,
    pub history_count: usize,
    pub by_sensitivity: SensitivityCounts,
}

/// Build a storage key.
///
/// The user segment is escaped so that a `:` inside a user id never splits
/// into a separate key segment.
pub fn storage_key(kind: &str, user_id: &str, sub_key: Option<&str>) -> String {
    let user = escape_user(user_id);
    match sub_key {
        Some(sub) => format!("{}:{}:{}:{}", KEY_ROOT, kind, user, sub),
        None => format!("{}:{}:{}", KEY_ROOT, kind, user),
    }
}

/// `%` becomes `%25` and `:` becomes `%3A`.
fn escape_user(user_id: &str) -> String {
    user_id.replace('%', "%25").replace(':', "%3A")
}

pub struct MemoryStore {
    backend: Arc<dyn MemoryBackend>,
    config: MemoryConfig,
    privacy: Option<PrivacyFilter>,
}

impl MemoryStore {
    pub fn new(backend: Arc<dyn MemoryBackend>, config: MemoryConfig) -> Self {
        let privacy = PrivacyFilter::enabled_for(&config);
        Self {
            backend,
            config,
            privacy,
        }
    }

    pub fn backend(&self) -> &Arc<dyn MemoryBackend> {
        &self.backend
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    // ── Trust scores ──────────────────────────────────────────────────────────

    pub fn store_trust_score(&self, user_id: &str, score: f64) -> AtrianResult<()> {
        let mut metadata = Metadata::new();
        metadata.insert("timestamp".into(), json!(Utc::now()));
        metadata.insert("type".into(), json!("trust_score"));
        self.backend.store(
            &storage_key("trust", user_id, None),
            &json!(clamp_score(score)),
            &metadata,
        )
    }

    /// The stored score, or `None` if absent or not a number.
    pub fn retrieve_trust_score(&self, user_id: &str) -> AtrianResult<Option<f64>> {
        let entry = self.backend.retrieve(&storage_key("trust", user_id, None))?;
        Ok(entry.and_then(|e| e.value.as_f64()).map(clamp_score))
    }

    // ── Operations ────────────────────────────────────────────────────────────

    /// Persist one operation and index it. Returns the generated id.
    ///
    /// With the privacy filter enabled, `High` and `Critical` operations have
    /// their context and result anonymized before they are written.
    pub fn store_operation(
        &self,
        user_id: &str,
        operation_type: &str,
        context: &serde_json::Value,
        result: &serde_json::Value,
    ) -> AtrianResult<String> {
        let now = Utc::now();
        let operation_id = operation_id(operation_type, context, now);

        let mut operation = StoredOperation {
            operation_id: operation_id.clone(),
            operation_type: operation_type.to_string(),
            user_id: user_id.to_string(),
            context: context.clone(),
            result: result.clone(),
            timestamp: now,
        };

        let mut metadata = Metadata::new();
        metadata.insert("timestamp".into(), json!(now));
        metadata.insert("type".into(), json!("operation"));

        if let Some(filter) = &self.privacy {
            let sensitivity = filter.detect_sensitivity(&serde_json::to_value(&operation)?);
            if sensitivity.requires_anonymization() {
                operation.context = filter.anonymize(&operation.context);
                operation.result = filter.anonymize(&operation.result);
            }
            metadata.insert("sensitivity".into(), json!(sensitivity));
            metadata.insert(
                "retention_date".into(),
                json!(filter.retention_date(sensitivity, now)),
            );
            debug!(operation_id = %operation_id, sensitivity = %sensitivity, "classified operation");
        }

        self.backend.store(
            &storage_key("operation", user_id, Some(&operation_id)),
            &serde_json::to_value(&operation)?,
            &metadata,
        )?;

        let mut history = self.history(user_id)?;
        history.push_front(
            HistoryEntry {
                id: operation_id.clone(),
                operation_type: operation_type.to_string(),
                timestamp: now,
            },
            self.config.max_operation_history,
        );
        self.write_history(user_id, &history)?;

        info!(user_id = %user_id, operation_id = %operation_id, "stored operation");
        Ok(operation_id)
    }

    pub fn retrieve_operation(
        &self,
        user_id: &str,
        operation_id: &str,
    ) -> AtrianResult<Option<StoredOperation>> {
        match self
            .backend
            .retrieve(&storage_key("operation", user_id, Some(operation_id)))?
        {
            Some(entry) => Ok(Some(serde_json::from_value(entry.value)?)),
            None => Ok(None),
        }
    }

    /// Most recent stored operations of one type, newest first.
    pub fn recent_operations(
        &self,
        user_id: &str,
        operation_type: &str,
        limit: usize,
    ) -> AtrianResult<Vec<StoredOperation>> {
        let history = self.history(user_id)?;
        let mut found = Vec::new();
        for entry in history.by_type.get(operation_type).into_iter().flatten() {
            if found.len() == limit {
                break;
            }
            if let Some(op) = self.retrieve_operation(user_id, &entry.id)? {
                found.push(op);
            }
        }
        Ok(found)
    }

    /// The user's history index (empty if none has been written).
    pub fn history(&self, user_id: &str) -> AtrianResult<HistoryIndex> {
        match self.backend.retrieve(&storage_key("history", user_id, None))? {
            Some(entry) => Ok(serde_json::from_value(entry.value)?),
            None => Ok(HistoryIndex::default()),
        }
    }

    fn write_history(&self, user_id: &str, history: &HistoryIndex) -> AtrianResult<()> {
        let mut metadata = Metadata::new();
        metadata.insert("timestamp".into(), json!(Utc::now()));
        metadata.insert("type".into(), json!("history"));
        self.backend.store(
            &storage_key("history", user_id, None),
            &serde_json::to_value(history)?,
            &metadata,
        )
    }

    // ── Deletion ──────────────────────────────────────────────────────────────

    /// Delete a user's stored operations, all of them or only one type.
    /// Returns how many operations were removed.
    ///
    /// Clearing everything also removes the history index; clearing one
    /// type only rewrites it.
    pub fn clear_user(&self, user_id: &str, operation_type: Option<&str>) -> AtrianResult<usize> {
        let history_key = storage_key("history", user_id, None);
        let Some(entry) = self.backend.retrieve(&history_key)? else {
            return Ok(0);
        };
        let mut history: HistoryIndex = serde_json::from_value(entry.value)?;

        let doomed: Vec<String> = match operation_type {
            Some(kind) => history
                .by_type
                .remove(kind)
                .unwrap_or_default()
                .into_iter()
                .map(|e| e.id)
                .collect(),
            None => history.operations.iter().map(|e| e.id.clone()).collect(),
        };

        let mut cleared = 0;
        for id in &doomed {
            if self
                .backend
                .delete(&storage_key("operation", user_id, Some(id)))?
            {
                cleared += 1;
            }
        }

        match operation_type {
            Some(kind) => {
                history.operations.retain(|e| e.operation_type != kind);
                self.write_history(user_id, &history)?;
            }
            None => {
                self.backend.delete(&history_key)?;
            }
        }

        info!(user_id = %user_id, cleared, operation_type = ?operation_type, "cleared user data");
        Ok(cleared)
    }

    /// Delete every operation whose retention window has passed at `now`.
    /// Operations without sensitivity metadata are kept.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> AtrianResult<usize> {
        let filter = self.privacy.unwrap_or_default();
        let prefix = format!("{}:operation:", KEY_ROOT);
        let mut pruned = 0;

        for key in self.backend.list(&prefix)? {
            let Some(entry) = self.backend.retrieve(&key)? else {
                continue;
            };
            let Some((sensitivity, recorded_at)) = retention_metadata(&entry.metadata) else {
                continue;
            };
            if filter.should_retain(sensitivity, recorded_at, now) {
                continue;
            }

            if !self.backend.delete(&key)? {
                continue;
            }
            pruned += 1;

            match serde_json::from_value::<StoredOperation>(entry.value) {
                Ok(op) => {
                    let mut history = self.history(&op.user_id)?;
                    history.remove(&op.operation_id);
                    self.write_history(&op.user_id, &history)?;
                }
                Err(e) => warn!(key = %key, error = %e, "pruned entry was not an operation"),
            }
        }

        if pruned > 0 {
            info!(pruned, "pruned expired operations");
        }
        Ok(pruned)
    }

    // ── Stats ─────────────────────────────────────────────────────────────────

    /// Counts of stored items, for everyone or for one user.
    pub fn stats(&self, user_id: Option<&str>) -> AtrianResult<MemoryStats> {
        let mut stats = MemoryStats::default();
        let wanted = user_id.map(escape_user);

        for key in self.backend.list(&format!("{}:", KEY_ROOT))? {
            let mut parts = key.splitn(4, ':').skip(1);
            let (Some(kind), Some(owner)) = (parts.next(), parts.next()) else {
                continue;
            };
            if wanted.as_deref().is_some_and(|u| u != owner) {
                continue;
            }
            stats.total_items += 1;

            match kind {
                "operation" => {
                    stats.operation_count += 1;
                    let sensitivity = self
                        .backend
                        .retrieve(&key)?
                        .and_then(|e| e.metadata.get("sensitivity").cloned())
                        .and_then(|v| serde_json::from_value::<Sensitivity>(v).ok());
                    match sensitivity {
                        Some(Sensitivity::Low) => stats.by_sensitivity.low += 1,
                        Some(Sensitivity::Medium) => stats.by_sensitivity.medium += 1,
                        Some(Sensitivity::High) => stats.by_sensitivity.high += 1,
                        Some(Sensitivity::Critical) => stats.by_sensitivity.critical += 1,
                        None => {}
                    }
                }
                "trust" => stats.trust_score_count += 1,
                "history" => stats.history_count += 1,
                _ => {}
            }
        }

        Ok(stats)
    }
}

/// `{type}_{unix seconds}_{first 8 hex digits of SHA-256(type, context, nanos)}`.
fn operation_id(operation_type: &str, context: &serde_json::Value, now: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation_type.as_bytes());
    hasher.update(context.to_string().as_bytes());
    hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}_{}_{}", operation_type, now.timestamp(), &digest[..8])
}

fn retention_metadata(metadata: &Metadata) -> Option<(Sensitivity, DateTime<Utc>)> {
    let sensitivity = serde_json::from_value(metadata.get("sensitivity")?.clone()).ok()?;
    let recorded_at = serde_json::from_value(metadata.get("timestamp")?.clone()).ok()?;
    Some((sensitivity, recorded_at))
}
