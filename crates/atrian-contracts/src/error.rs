//! Runtime error types for the ATRiAN trust/ethics runtime.
//!
//! Most entry points degrade instead of failing: bad rule files, unknown
//! outcomes and empty agent ids are logged and replaced by safe defaults.
//! `AtrianResult<T>` is reserved for the places where a caller genuinely has
//! to decide what to do: strict parsers, strict config loaders, and storage.

use thiserror::Error;

/// The unified error type for the ATRiAN crates.
#[derive(Debug, Error)]
pub enum AtrianError {
    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// A string did not name any variant of the expected enumeration.
    ///
    /// Callers pick the fallback (usually `General`); the parser never does.
    #[error("unrecognized {kind} '{value}'")]
    Parse { kind: &'static str, value: String },

    /// A persistence backend could not read or write a key.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// A value could not be converted to or from its JSON representation.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    /// An argument failed a locally scoped validation contract.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
}

impl AtrianError {
    /// Shorthand for building a `Parse` error.
    pub fn parse(kind: &'static str, value: impl Into<String>) -> Self {
        Self::Parse {
            kind,
            value: value.into(),
        }
    }
}

impl From<serde_json::Error> for AtrianError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            reason: e.to_string(),
        }
    }
}

/// Convenience alias used throughout the ATRiAN crates.
pub type AtrianResult<T> = Result<T, AtrianError>;
