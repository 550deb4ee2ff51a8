//! # atrian-adapter
//!
//! The outward surface of the ATRiAN runtime.
//!
//! ## Overview
//!
//! - [`OperationAdapter`]: evaluates operations requested by a host tool,
//!   tracks privacy-related trust events, builds notifications and persists
//!   its state to any [`MemoryBackend`](atrian_core::traits::MemoryBackend)
//! - [`SilentGuide`]: keyword-rule and fallback guidance on top of the
//!   [`EthicsTrustIntegrator`](atrian_core::EthicsTrustIntegrator)
//! - [`ContextManager`]: one active and many named passive contexts
//! - [`AdapterConfig`]: TOML configuration with lenient loading
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::{path::Path, sync::Arc};
//! use atrian_adapter::{AdapterConfig, OperationAdapter};
//!
//! let config = AdapterConfig::load_or_default(Path::new("config/adapter.toml"));
//! let adapter = OperationAdapter::new(config, evaluator, ledger);
//! let eval = adapter.evaluate_operation("data_access", context, "alice");
//! if eval.should_notify {
//!     let notification = adapter.generate_notification(&eval.operation_id);
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod context;
pub mod guide;

pub use adapter::{OperationAdapter, RECENT_GUIDANCE_TITLE, TRUST_SCORES_TITLE};
pub use config::{AdapterConfig, GuideConfig, GuidanceRule};
pub use context::{ContextEntry, ContextManager};
pub use guide::{ActiveContext, SilentGuide};

// ── Tests ─────────────────────────────────────────────────────────────────────
