//! Values exchanged with persistence backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form metadata stored next to a value.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A value and its metadata as returned by `MemoryBackend::retrieve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: serde_json::Value,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A titled note, the unit the adapter persists its state as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub title: String,
    /// JSON text.
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}
