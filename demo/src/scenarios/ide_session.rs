//! Scenario 1: IDE Session
//!
//! A host editor reports three operations through the operation adapter:
//!
//! Operation A: trusted agent edits ordinary code       → allowed, silent
//! Operation B: user saves a file holding personal data → allowed, info + trust reward
//! Operation C: user queries a surveillance feed        → denied, warning + trust penalty
//!
//! The session ends by persisting trust scores and guidance to a local
//! file backend and loading them into a fresh runtime.

use std::path::Path;

use serde_json::json;

use atrian_adapter::ContextManager;
use atrian_contracts::{
    error::AtrianResult,
    memory::Metadata,
    operation::{Notification, OperationEvaluation},
};
use atrian_core::traits::TrustLedger;
use atrian_memory::LocalFileBackend;

use crate::runtime::Runtime;

fn print_evaluation(eval: &OperationEvaluation) {
    println!("  Operation id:           {}", eval.operation_id);
    println!("  Allowed:                {}", if eval.allowed { "YES" } else { "NO" });
    println!("  Trust level:            {:.2}", eval.trust_level);
    println!("  Guidance ({}):", eval.guidance_type);
    println!("    {}", eval.guidance);
    if !eval.detected_keywords.is_empty() {
        println!("  Privacy keywords:       {}", eval.detected_keywords.join(", "));
    }
    for warning in &eval.ethical_warnings {
        println!("  Ethical warning:        {}", warning);
    }
    println!(
        "  Notify:                 {} (priority {:?})",
        eval.should_notify, eval.notification_priority
    );
}

fn print_notification(runtime: &Runtime, eval: &OperationEvaluation) {
    match runtime.adapter.generate_notification(&eval.operation_id) {
        Some(Notification::Required { title, message, actions, .. }) => {
            println!("  Notification:           {}", title);
            println!("    {}", message);
            for action in actions {
                println!("    [{}] -> {}", action.label, action.action);
            }
        }
        Some(Notification::NotRequired { .. }) => {
            println!("  Notification:           not required");
        }
        None => println!("  Notification:           unknown operation"),
    }
}

/// Run Scenario 1: IDE Session.
pub fn run_scenario(runtime: &Runtime, state_dir: &Path) -> AtrianResult<()> {
    println!("=== Scenario 1: IDE Session ===");
    println!("  Ethics rules loaded:    {}", runtime.compass.rule_count());

    let mut contexts = ContextManager::new();
    contexts.add_passive_context(
        "workspace",
        json!({ "project": "profile-service", "language": "rust" }),
        "low",
        Metadata::new(),
    )?;
    contexts.set_active_context(
        "editing",
        json!({ "file_path": "src/parser.rs" }),
        "low",
        Metadata::new(),
    )?;
    println!(
        "  Session contexts:       active={} passive={}",
        contexts.active_context().map(|c| c.name.as_str()).unwrap_or("-"),
        contexts.all_passive_contexts().keys().cloned().collect::<Vec<_>>().join(",")
    );
    println!();

    // ── Operation A: clean edit by a trusted agent ────────────────────────────

    println!("  Operation A: Cascade edits a parser module");
    let eval = runtime.adapter.evaluate_operation(
        "code_editing",
        json!({ "language": "rust", "file_path": "src/parser.rs" }),
        "Cascade",
    );
    print_evaluation(&eval);
    print_notification(runtime, &eval);
    println!();

    // ── Operation B: personal data handled properly ───────────────────────────

    println!("  Operation B: alice creates a module that saves personal profiles");
    let before = runtime.ledger.get_trust_score("alice");
    let eval = runtime.adapter.evaluate_operation(
        "file_creation",
        json!({
            "file_path": "src/profile_store.rs",
            "file_content": "fn save(profile: &Profile) { db.store(encrypt(profile)) } // personal",
            "operation": "save",
            "data_type": "profiles",
        }),
        "alice",
    );
    print_evaluation(&eval);
    print_notification(runtime, &eval);
    println!(
        "  Trust:                  {:.2} -> {:.2} (privacy_respect)",
        before,
        runtime.ledger.get_trust_score("alice")
    );
    println!();

    // ── Operation C: surveillance query ───────────────────────────────────────

    println!("  Operation C: alice queries a camera feed for a surveillance report");
    contexts.set_active_context(
        "surveillance-report",
        json!({ "source": "cameras" }),
        "high",
        Metadata::new(),
    )?;
    let before = runtime.ledger.get_trust_score("alice");
    let eval = runtime.adapter.evaluate_operation(
        "data_access",
        json!({
            "domain": "surveillance",
            "operation": "query",
            "data_type": "private camera feed",
            "data_sources": ["sensitive_data_cameras"],
        }),
        "alice",
    );
    print_evaluation(&eval);
    print_notification(runtime, &eval);
    println!(
        "  Trust:                  {:.2} -> {:.2} (privacy_violation)",
        before,
        runtime.ledger.get_trust_score("alice")
    );
    if let Some(active) = contexts.active_context() {
        println!("  Active context:         {} ({})", active.name, active.sensitivity);
    }
    contexts.clear_all();
    println!();

    // ── Adaptive interface ────────────────────────────────────────────────────

    for user in ["Cascade", "alice", "Scraper"] {
        let ui = runtime.adapter.generate_adaptive_interface(user);
        println!(
            "  Interface for {:<8}  trust={:<6} validation={:<8} tone={}",
            user, ui.trust_level, ui.validation_level, ui.messaging_tone
        );
    }
    println!();

    // ── Persistence ───────────────────────────────────────────────────────────

    let backend = LocalFileBackend::open(state_dir.join("ide-session"))?;
    runtime.adapter.persist_state(&backend)?;
    println!("  State persisted to:     {}", backend.dir().display());

    let fresh = Runtime::new(None, None)?;
    let restored = fresh.adapter.load_state(&backend)?;
    println!(
        "  Fresh runtime restored: {} score(s), alice = {:.2}",
        restored,
        fresh.ledger.get_trust_score("alice")
    );
    println!("  RESULT: SUCCESS");
    println!();

    Ok(())
}
