//! Scripted walk-throughs of the ATRiAN runtime.
//!
//! Each scenario builds the components it needs and prints what they decide.

pub mod ide_session;
pub mod memory_privacy;
pub mod trust_ledger;
