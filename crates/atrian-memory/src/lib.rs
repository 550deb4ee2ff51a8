//! # atrian-memory
//!
//! Persistence for the ATRiAN runtime.
//!
//! ## Overview
//!
//! Two [`MemoryBackend`](atrian_core::traits::MemoryBackend) implementations:
//!
//! - [`InMemoryBackend`]: a mutex-guarded map, for tests and short-lived runs
//! - [`LocalFileBackend`]: one JSON file per key plus a `.metadata` sidecar
//!
//! [`MemoryStore`] layers the `atrian:{kind}:{user}[:{sub}]` key scheme on
//! top of any backend. It stores trust scores and operations, keeps a
//! bounded per-user history index, and runs every operation through the
//! [`PrivacyFilter`] before writing it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use atrian_memory::{LocalFileBackend, MemoryConfig, MemoryStore};
//!
//! let backend = Arc::new(LocalFileBackend::open("~/.atrian/memory")?);
//! let store = MemoryStore::new(backend, MemoryConfig::default());
//! let id = store.store_operation("alice", "data_access", &context, &result)?;
//! store.prune_expired(chrono::Utc::now())?;
//! ```

pub mod local;
pub mod memory;
pub mod privacy;
pub mod store;

pub use local::LocalFileBackend;
pub use memory::InMemoryBackend;
pub use privacy::{PrivacyFilter, Sensitivity};
pub use store::{storage_key, HistoryIndex, MemoryConfig, MemoryStats, MemoryStore, StoredOperation};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use serde_json::json;

    use atrian_contracts::memory::Metadata;
    use atrian_core::traits::MemoryBackend;

    use super::{
        storage_key, InMemoryBackend, LocalFileBackend, MemoryConfig, MemoryStore, Sensitivity,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn meta(kind: &str) -> Metadata {
        let mut m = Metadata::new();
        m.insert("type".into(), json!(kind));
        m
    }

    fn store_with(config: MemoryConfig) -> MemoryStore {
        MemoryStore::new(Arc::new(InMemoryBackend::new()), config)
    }

    /// Behaviour every backend must share.
    fn exercise_backend(backend: &dyn MemoryBackend) {
        assert!(backend.retrieve("missing").unwrap().is_none());
        assert!(backend.list("").unwrap().is_empty());

        backend.store("atrian:trust:alice", &json!(0.7), &meta("trust_score")).unwrap();
        backend.store("atrian:trust:bob", &json!(0.4), &meta("trust_score")).unwrap();
        backend.store("other:key", &json!({ "a": [1, 2] }), &Metadata::new()).unwrap();

        let entry = backend.retrieve("atrian:trust:alice").unwrap().unwrap();
        assert_eq!(entry.value, json!(0.7));
        assert_eq!(entry.metadata["type"], "trust_score");

        assert_eq!(
            backend.list("atrian:trust:").unwrap(),
            vec!["atrian:trust:alice".to_string(), "atrian:trust:bob".to_string()]
        );
        assert_eq!(backend.list("").unwrap().len(), 3);

        backend.store("atrian:trust:alice", &json!(0.9), &meta("trust_score")).unwrap();
        assert_eq!(backend.retrieve("atrian:trust:alice").unwrap().unwrap().value, json!(0.9));

        assert!(backend.delete("other:key").unwrap());
        assert!(!backend.delete("other:key").unwrap());

        assert_eq!(backend.clear("atrian:").unwrap(), 2);
        assert!(backend.list("").unwrap().is_empty());
    }

    // ── 1. Backends ───────────────────────────────────────────────────────────

    #[test]
    fn test_in_memory_backend_contract() {
        exercise_backend(&InMemoryBackend::new());
    }

    #[test]
    fn test_local_file_backend_contract() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalFileBackend::open(dir.path().join("memory")).unwrap();
        exercise_backend(&backend);
    }

    #[test]
    fn test_local_file_backend_writes_metadata_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalFileBackend::open(dir.path()).unwrap();
        backend.store("atrian:trust:alice", &json!(0.5), &meta("trust_score")).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().any(|n| n.ends_with(".metadata")));
        assert!(names.iter().all(|n| n.starts_with("atrian_trust_alice-")));

        let reopened = LocalFileBackend::open(dir.path()).unwrap();
        assert_eq!(reopened.list("atrian:").unwrap(), vec!["atrian:trust:alice".to_string()]);
    }

    #[test]
    fn test_failed_write_keeps_previous_value_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalFileBackend::open(dir.path()).unwrap();
        let key = "atrian:operation:alice:op1";
        let mut first = meta("operation");
        first.insert("sensitivity".into(), json!("low"));
        backend.store(key, &json!({ "v": 1 }), &first).unwrap();

        // Block the staged metadata file so the next write fails.
        let blocker = crate::local::staging_path(&backend.metadata_path(key));
        std::fs::create_dir(&blocker).unwrap();

        let mut second = meta("operation");
        second.insert("sensitivity".into(), json!("critical"));
        assert!(backend.store(key, &json!({ "v": 2 }), &second).is_err());

        let entry = backend.retrieve(key).unwrap().unwrap();
        assert_eq!(entry.value, json!({ "v": 1 }));
        assert_eq!(entry.metadata["sensitivity"], "low");
        assert_eq!(backend.list("atrian:").unwrap(), vec![key.to_string()]);
    }

    #[test]
    fn test_titled_memories() {
        let backend = InMemoryBackend::new();
        assert!(backend.get_memory_by_title("ATRiAN Trust Scores").unwrap().is_none());

        backend
            .create_memory("ATRiAN Trust Scores", r#"{"alice":0.7}"#, &["atrian", "trust_scores"])
            .unwrap();
        let memory = backend.get_memory_by_title("ATRiAN Trust Scores").unwrap().unwrap();
        assert_eq!(memory.content, r#"{"alice":0.7}"#);
        assert_eq!(memory.tags, vec!["atrian", "trust_scores"]);
    }

    // ── 2. Trust scores ───────────────────────────────────────────────────────

    #[test]
    fn test_trust_score_round_trip_clamps() {
        let store = store_with(MemoryConfig::default());
        assert_eq!(store.retrieve_trust_score("alice").unwrap(), None);

        store.store_trust_score("alice", 1.4).unwrap();
        assert_eq!(store.retrieve_trust_score("alice").unwrap(), Some(1.0));
        assert!(store
            .backend()
            .retrieve(&storage_key("trust", "alice", None))
            .unwrap()
            .is_some());
    }

    // ── 3. Operations & history ───────────────────────────────────────────────

    #[test]
    fn test_store_operation_indexes_history_newest_first() {
        let store = store_with(MemoryConfig::default());
        let first = store
            .store_operation("alice", "code_editing", &json!({ "file": "src/main.rs" }), &json!({}))
            .unwrap();
        let second = store
            .store_operation("alice", "data_access", &json!({ "table": "orders" }), &json!({}))
            .unwrap();

        assert!(first.starts_with("code_editing_"));
        let history = store.history("alice").unwrap();
        let ids: Vec<&str> = history.operations.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);
        assert_eq!(history.by_type["code_editing"].len(), 1);

        let op = store.retrieve_operation("alice", &first).unwrap().unwrap();
        assert_eq!(op.context, json!({ "file": "src/main.rs" }));
        assert_eq!(op.user_id, "alice");
    }

    #[test]
    fn test_history_is_capped() {
        let store = store_with(MemoryConfig {
            max_operation_history: 2,
            ..MemoryConfig::default()
        });
        for n in 0..3 {
            store
                .store_operation("alice", "general", &json!({ "n": n }), &json!({}))
                .unwrap();
        }
        let history = store.history("alice").unwrap();
        assert_eq!(history.operations.len(), 2);
        assert_eq!(history.by_type["general"].len(), 2);

        let recent = store.recent_operations("alice", "general", 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].context, json!({ "n": 2 }));
    }

    #[test]
    fn test_sensitive_operations_are_anonymized() {
        let store = store_with(MemoryConfig::default());
        let id = store
            .store_operation(
                "alice",
                "data_access",
                &json!({ "note": "patient medical record, email bob@example.com" }),
                &json!({ "ok": true }),
            )
            .unwrap();

        let op = store.retrieve_operation("alice", &id).unwrap().unwrap();
        assert_eq!(op.context["note"], "patient medical record, email [EMAIL]");

        let entry = store
            .backend()
            .retrieve(&storage_key("operation", "alice", Some(&id)))
            .unwrap()
            .unwrap();
        assert_eq!(entry.metadata["sensitivity"], "high");
        assert!(entry.metadata.contains_key("retention_date"));
    }

    #[test]
    fn test_privacy_filter_can_be_disabled() {
        let store = store_with(MemoryConfig {
            enable_privacy_filter: false,
            ..MemoryConfig::default()
        });
        let id = store
            .store_operation("alice", "general", &json!({ "note": "password: hunter2" }), &json!({}))
            .unwrap();

        let entry = store
            .backend()
            .retrieve(&storage_key("operation", "alice", Some(&id)))
            .unwrap()
            .unwrap();
        assert!(!entry.metadata.contains_key("sensitivity"));
        assert_eq!(entry.value["context"]["note"], "password: hunter2");
    }

    // ── 4. Clearing & pruning ─────────────────────────────────────────────────

    #[test]
    fn test_clear_user_by_type_and_entirely() {
        let store = store_with(MemoryConfig::default());
        store.store_operation("alice", "general", &json!({ "n": 1 }), &json!({})).unwrap();
        store.store_operation("alice", "data_access", &json!({ "n": 2 }), &json!({})).unwrap();
        store.store_operation("alice", "data_access", &json!({ "n": 3 }), &json!({})).unwrap();

        assert_eq!(store.clear_user("alice", Some("data_access")).unwrap(), 2);
        let history = store.history("alice").unwrap();
        assert_eq!(history.operations.len(), 1);
        assert!(!history.by_type.contains_key("data_access"));

        assert_eq!(store.clear_user("alice", None).unwrap(), 1);
        assert_eq!(store.stats(Some("alice")).unwrap().total_items, 0);
        assert_eq!(store.clear_user("nobody", None).unwrap(), 0);
    }

    #[test]
    fn test_prune_expired_respects_retention() {
        let store = store_with(MemoryConfig::default());
        let critical = store
            .store_operation("alice", "general", &json!({ "note": "password: hunter2" }), &json!({}))
            .unwrap();
        let low = store
            .store_operation("alice", "general", &json!({ "file": "src/lib.rs" }), &json!({}))
            .unwrap();

        assert_eq!(store.prune_expired(Utc::now()).unwrap(), 0);
        assert_eq!(store.prune_expired(Utc::now() + Duration::days(2)).unwrap(), 1);

        assert!(store.retrieve_operation("alice", &critical).unwrap().is_none());
        assert!(store.retrieve_operation("alice", &low).unwrap().is_some());
        let ids: Vec<String> = store
            .history("alice")
            .unwrap()
            .operations
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![low]);
    }

    // ── 5. Stats ──────────────────────────────────────────────────────────────

    #[test]
    fn test_stats_per_user_and_overall() {
        let store = store_with(MemoryConfig::default());
        store.store_trust_score("alice", 0.7).unwrap();
        store.store_trust_score("bob", 0.4).unwrap();
        store
            .store_operation("alice", "general", &json!({ "note": "password: x1" }), &json!({}))
            .unwrap();
        store.store_operation("alice", "general", &json!({ "file": "a.rs" }), &json!({})).unwrap();

        let alice = store.stats(Some("alice")).unwrap();
        assert_eq!(alice.total_items, 4);
        assert_eq!(alice.operation_count, 2);
        assert_eq!(alice.trust_score_count, 1);
        assert_eq!(alice.history_count, 1);
        assert_eq!(alice.by_sensitivity.critical, 1);
        assert_eq!(alice.by_sensitivity.low, 1);

        let all = store.stats(None).unwrap();
        assert_eq!(all.trust_score_count, 2);
        assert_eq!(all.total_items, 5);
    }

    #[test]
    fn test_stats_keep_colon_user_ids_apart() {
        let store = store_with(MemoryConfig::default());
        store.store_trust_score("team:alice", 0.6).unwrap();
        store.store_operation("team:alice", "general", &json!({ "file": "a.rs" }), &json!({})).unwrap();
        store.store_trust_score("team", 0.3).unwrap();

        let scoped = store.stats(Some("team:alice")).unwrap();
        assert_eq!(scoped.total_items, 3);
        assert_eq!(scoped.operation_count, 1);

        let team = store.stats(Some("team")).unwrap();
        assert_eq!(team.total_items, 1);
        assert_eq!(team.trust_score_count, 1);

        assert_eq!(store.retrieve_trust_score("team:alice").unwrap(), Some(0.6));
        assert_eq!(storage_key("trust", "a%b:c", None), "atrian:trust:a%25b%3Ac");
        assert_eq!(store.clear_user("team:alice", None).unwrap(), 1);
        assert_eq!(store.stats(Some("team")).unwrap().total_items, 1);
    }

    #[test]
    fn test_sensitivity_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Sensitivity::Critical).unwrap(), json!("critical"));
    }
}
