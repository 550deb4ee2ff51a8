//! Active and passive operating contexts.
//!
//! A caller holds at most one active context (what the user is doing now)
//! and any number of named passive contexts (background facts that still
//! apply). Every entry carries a sensitivity label.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use atrian_contracts::{
    error::{AtrianError, AtrianResult},
    memory::Metadata,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub name: String,
    pub data: serde_json::Value,
    pub sensitivity: String,
    #[serde(default)]
    pub extra: Metadata,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ContextManager {
    active: Option<ContextEntry>,
    passive: BTreeMap<String, ContextEntry>,
}

fn entry(
    name: &str,
    data: serde_json::Value,
    sensitivity: &str,
    extra: Metadata,
) -> AtrianResult<ContextEntry> {
    if name.trim().is_empty() {
        return Err(AtrianError::InvalidInput {
            reason: "context name must not be empty".to_string(),
        });
    }
    if sensitivity.trim().is_empty() {
        return Err(AtrianError::InvalidInput {
            reason: format!("context '{}' needs a sensitivity", name),
        });
    }
    Ok(ContextEntry {
        name: name.to_string(),
        data,
        sensitivity: sensitivity.to_string(),
        extra,
        updated_at: Utc::now(),
    })
}

impl ContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active context.
    pub fn set_active_context(
        &mut self,
        name: &str,
        data: serde_json::Value,
        sensitivity: &str,
        extra: Metadata,
    ) -> AtrianResult<()> {
        let entry = entry(name, data, sensitivity, extra)?;
        info!(context = %name, sensitivity = %sensitivity, "active context set");
        self.active = Some(entry);
        Ok(())
    }

    /// Add or replace a passive context.
    pub fn add_passive_context(
        &mut self,
        name: &str,
        data: serde_json::Value,
        sensitivity: &str,
        extra: Metadata,
    ) -> AtrianResult<()> {
        let entry = entry(name, data, sensitivity, extra)?;
        if self.passive.insert(name.to_string(), entry).is_some() {
            debug!(context = %name, "passive context replaced");
        } else {
            debug!(context = %name, "passive context added");
        }
        Ok(())
    }

    pub fn active_context(&self) -> Option<&ContextEntry> {
        self.active.as_ref()
    }

    pub fn passive_context(&self, name: &str) -> Option<&ContextEntry> {
        self.passive.get(name)
    }

    pub fn all_passive_contexts(&self) -> &BTreeMap<String, ContextEntry> {
        &self.passive
    }

    pub fn remove_passive_context(&mut self, name: &str) -> bool {
        self.passive.remove(name).is_some()
    }

    pub fn clear_active_context(&mut self) {
        self.active = None;
    }

    pub fn clear_all_passive_contexts(&mut self) {
        self.passive.clear();
    }

    pub fn clear_all(&mut self) {
        self.clear_active_context();
        self.clear_all_passive_contexts();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use atrian_contracts::{error::AtrianError, memory::Metadata};

    use super::ContextManager;

    #[test]
    fn test_active_context_replaces_previous() {
        let mut manager = ContextManager::new();
        assert!(manager.active_context().is_none());

        manager
            .set_active_context("editing", json!({ "file": "a.rs" }), "low", Metadata::new())
            .unwrap();
        manager
            .set_active_context("review", json!({ "pr": 12 }), "medium", Metadata::new())
            .unwrap();

        let active = manager.active_context().unwrap();
        assert_eq!(active.name, "review");
        assert_eq!(active.sensitivity, "medium");

        manager.clear_active_context();
        assert!(manager.active_context().is_none());
    }

    #[test]
    fn test_passive_contexts_are_named() {
        let mut manager = ContextManager::new();
        manager
            .add_passive_context("project", json!("atrian"), "low", Metadata::new())
            .unwrap();
        manager
            .add_passive_context("customer", json!({ "tier": "gold" }), "high", Metadata::new())
            .unwrap();

        assert_eq!(manager.all_passive_contexts().len(), 2);
        assert_eq!(manager.passive_context("customer").unwrap().sensitivity, "high");

        assert!(manager.remove_passive_context("project"));
        assert!(!manager.remove_passive_context("project"));

        manager
            .set_active_context("editing", json!({}), "low", Metadata::new())
            .unwrap();
        manager.clear_all();
        assert!(manager.active_context().is_none());
        assert!(manager.all_passive_contexts().is_empty());
    }

    #[test]
    fn test_empty_name_or_sensitivity_is_rejected() {
        let mut manager = ContextManager::new();
        match manager.set_active_context("  ", json!({}), "low", Metadata::new()) {
            Err(AtrianError::InvalidInput { .. }) => {}
            other => panic!("expected InvalidInput, got {:?}", other),
        }
        match manager.add_passive_context("project", json!({}), "", Metadata::new()) {
            Err(AtrianError::InvalidInput { .. }) => {}
            other => panic!("expected InvalidInput, got {:?}", other),
        }
        assert!(manager.all_passive_contexts().is_empty());
    }
}
