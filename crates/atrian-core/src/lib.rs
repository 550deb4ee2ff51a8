//! # atrian-core
//!
//! The service seams of the ATRiAN runtime.
//!
//! This crate provides:
//! - The three core traits (`EthicalEvaluator`, `TrustLedger`, `MemoryBackend`)
//! - The `EthicsTrustIntegrator` that combines evaluator output and ledger
//!   state into a single allow/deny decision
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atrian_core::{EthicsTrustIntegrator, traits::{EthicalEvaluator, TrustLedger}};
//! ```

pub mod integrator;
pub mod traits;

pub use integrator::EthicsTrustIntegrator;
