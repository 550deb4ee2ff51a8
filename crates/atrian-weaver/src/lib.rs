//! # atrian-weaver
//!
//! Per-agent trust ledger for the ATRiAN runtime.
//!
//! ## Overview
//!
//! [`InMemoryTrustLedger`] implements the
//! [`TrustLedger`](atrian_core::traits::TrustLedger) trait. Scores live in
//! `[0.0, 1.0]` and start from the agent's configured `trust_rules` baseline
//! (or `default_initial_trust`). Every update is appended to a SHA-256
//! hash-chained event log that `verify_integrity` can check at any time.
//!
//! Decay is explicit: call [`InMemoryTrustLedger::tick`] (or `decay` for one
//! agent) with the current time. Reads never mutate.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atrian_weaver::{InMemoryTrustLedger, LedgerConfig};
//! use atrian_core::traits::TrustLedger;
//!
//! let ledger = InMemoryTrustLedger::new(LedgerConfig::default())
//!     .with_baselines(rules.trust_baselines.clone());
//! ledger.update_trust_score("Cascade", "task_completion", "positive", 0.1, None);
//! assert!(ledger.verify_integrity());
//! ```

pub mod chain;
pub mod config;
pub mod ledger;

pub use chain::{hash_event, verify_chain, ChainedEvent, GENESIS_HASH};
pub use config::{DecayConfig, LedgerConfig};
pub use ledger::InMemoryTrustLedger;

// ── Tests ─────────────────────────────────────────────────────────────────────
