//! Scenario 2: Trust Ledger
//!
//! Walks one ledger through the life of a few agents:
//!
//! Step 1: baselines seeded from the rules file
//! Step 2: plain outcomes and ethics-trust events move scores and dimensions
//! Step 3: a month without activity decays every score toward the floor
//! Step 4: boundary checks and delegation decisions
//! Step 5: the hash-chained log is verified

use chrono::{Duration, Utc};

use atrian_contracts::{
    error::AtrianResult,
    integration::EthicsTrustEvent,
    trust::{TrustDimension, TrustOutcome},
};
use atrian_core::traits::TrustLedger;

use crate::runtime::Runtime;

const AGENTS: [&str; 5] = ["Cascade", "Reviewer", "Tester", "Scraper", "Quarantined"];

fn print_scores(runtime: &Runtime) {
    for agent in AGENTS {
        println!(
            "    {:<12} {:.3}",
            agent,
            runtime.ledger.get_trust_score(agent)
        );
    }
}

/// Run Scenario 2: Trust Ledger.
pub fn run_scenario(runtime: &Runtime) -> AtrianResult<()> {
    println!("=== Scenario 2: Trust Ledger ===");
    println!();

    println!("  Step 1: baselines from {}", runtime.rules.path().display());
    print_scores(runtime);
    println!();

    // ── Step 2: outcomes and events ───────────────────────────────────────────

    println!("  Step 2: outcomes and ethics-trust events");
    let ledger = &runtime.ledger;
    ledger.apply("Tester", "task_completion", TrustOutcome::Positive, 0.1, Some("green build"));
    ledger.apply("Tester", "task_completion", TrustOutcome::Positive, 0.1, None);
    ledger.apply("Reviewer", "review_missed", TrustOutcome::Negative, 0.2, Some("missed a bug"));
    ledger.update_trust_score("Reviewer", "review", "sideways", 0.5, None);

    let integrator = runtime.adapter.integrator();
    let event = integrator.process_ethics_trust_event(
        "Scraper",
        EthicsTrustEvent::TrustBoundaryCrossed,
        "read outside its sandbox",
        0.1,
    );
    println!(
        "    Scraper {} : {:.3} -> {:.3} ({} {:+.3})",
        event.event_type,
        event.original_score,
        event.new_score,
        event.affected_dimension,
        event.adjustment
    );
    println!("      implications: {}", event.ethical_implications.join("; "));

    integrator.process_ethics_trust_event(
        "Cascade",
        EthicsTrustEvent::TransparencyAlignment,
        "explained every change",
        0.005,
    );
    println!(
        "    Cascade transparency after a sub-threshold event: {:.3}",
        ledger.dimension_scores("Cascade")[&TrustDimension::Transparency]
    );

    let rejected = ledger
        .get_trust_log(Some("Reviewer"), None)
        .into_iter()
        .filter(|e| !e.success)
        .count();
    println!("    Reviewer events rejected for an unknown outcome: {}", rejected);
    print_scores(runtime);
    println!();

    // ── Step 3: decay ─────────────────────────────────────────────────────────

    println!("  Step 3: thirty idle days");
    let changed = ledger.tick(Utc::now() + Duration::days(30));
    println!("    scores decayed: {}", changed);
    print_scores(runtime);
    println!();

    // ── Step 4: boundaries and delegation ─────────────────────────────────────

    println!("  Step 4: boundaries and delegation");
    for agent in AGENTS {
        let check = ledger.check_boundaries(agent);
        println!(
            "    {:<12} [{:.2}, {:.2}] within={} warning={:?}",
            agent, check.min_bound, check.max_bound, check.within_bounds, check.warning_level
        );
    }
    for (from, to) in [("Cascade", "Reviewer"), ("Cascade", "Tester"), ("Reviewer", "Cascade")] {
        println!(
            "    {} -> {}: {}",
            from,
            to,
            if ledger.can_delegate(from, to) { "may delegate" } else { "may not delegate" }
        );
    }
    println!();

    // ── Step 5: integrity ─────────────────────────────────────────────────────

    let chain = ledger.chained_log();
    println!(
        "  Step 5: trust log integrity: {} ({} event(s), head {})",
        if ledger.verify_integrity() { "VERIFIED" } else { "FAILED" },
        chain.len(),
        chain.last().and_then(|e| e.this_hash.get(..12)).unwrap_or("-")
    );
    println!("  RESULT: SUCCESS");
    println!();

    Ok(())
}
