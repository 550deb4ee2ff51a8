//! Scenario 3: Memory & Privacy
//!
//! Stores operations of rising sensitivity in a local file backend and shows
//! what the privacy filter keeps, scrubs and eventually prunes.

use std::{path::Path, sync::Arc};

use chrono::{Duration, Utc};
use serde_json::json;

use atrian_contracts::error::AtrianResult;
use atrian_core::traits::MemoryBackend;
use atrian_memory::{storage_key, LocalFileBackend, MemoryConfig, MemoryStore};

/// Run Scenario 3: Memory & Privacy.
pub fn run_scenario(state_dir: &Path) -> AtrianResult<()> {
    println!("=== Scenario 3: Memory & Privacy ===");
    println!();

    let backend = Arc::new(LocalFileBackend::open(state_dir.join("memory"))?);
    let cleared = backend.clear("atrian:")?;
    println!("  Backend:                {}", backend.dir().display());
    println!("  Cleared from last run:  {} key(s)", cleared);

    let store = MemoryStore::new(backend.clone(), MemoryConfig::default());
    store.store_trust_score("alice", 0.72)?;

    let samples = [
        ("code_editing", json!({ "file": "src/parser.rs", "change": "inline helper" })),
        ("data_access", json!({ "query": "select email, phone from contacts" })),
        (
            "data_access",
            json!({
                "note": "patient medical diagnosis for bob@example.com",
                "source": "https://ehr.example.org/records/17"
            }),
        ),
        ("authentication", json!({ "log": "password: hunter2 from 10.0.0.12" })),
    ];

    for (operation_type, context) in samples {
        let id = store.store_operation("alice", operation_type, &context, &json!({ "ok": true }))?;
        let stored = store.retrieve_operation("alice", &id)?;
        let sensitivity = backend
            .retrieve(&storage_key("operation", "alice", Some(&id)))?
            .and_then(|entry| entry.metadata.get("sensitivity").cloned())
            .unwrap_or_default();
        println!("  Stored {:<14} sensitivity={}", operation_type, sensitivity);
        if let Some(op) = stored {
            println!("    context as stored:    {}", op.context);
        }
    }
    println!();

    let stats = store.stats(Some("alice"))?;
    println!(
        "  Stats for alice:        {} item(s), {} operation(s), low={} medium={} high={} critical={}",
        stats.total_items,
        stats.operation_count,
        stats.by_sensitivity.low,
        stats.by_sensitivity.medium,
        stats.by_sensitivity.high,
        stats.by_sensitivity.critical
    );

    let recent = store.recent_operations("alice", "data_access", 5)?;
    println!("  Recent data_access:     {} operation(s)", recent.len());

    let pruned = store.prune_expired(Utc::now() + Duration::days(2))?;
    println!("  Pruned two days later:  {} operation(s)", pruned);
    let pruned = store.prune_expired(Utc::now() + Duration::days(45))?;
    println!("  Pruned 45 days later:   {} operation(s)", pruned);
    println!(
        "  Remaining history:      {} entr(ies)",
        store.history("alice")?.operations.len()
    );
    println!(
        "  alice trust on disk:    {:?}",
        store.retrieve_trust_score("alice")?
    );
    println!("  RESULT: SUCCESS");
    println!();

    Ok(())
}
