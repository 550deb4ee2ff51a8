//! Ledger configuration.
//!
//! ```toml
//! default_initial_trust = 0.5
//! delegation_threshold = 0.6
//!
//! [decay]
//! enabled = true
//! rate_per_day = 0.01
//! floor = 0.3
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use std::path::Path;

use serde::{Deserialize, Serialize};

use atrian_contracts::{
    error::{AtrianError, AtrianResult},
    trust::DEFAULT_INITIAL_TRUST,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Score for agents with no record and no configured baseline.
    #[serde(default = "default_initial_trust")]
    pub default_initial_trust: f64,

    #[serde(default)]
    pub decay: DecayConfig,

    /// Minimum delegatee score for `can_delegate` to succeed.
    #[serde(default = "default_delegation_threshold")]
    pub delegation_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fraction of the score lost per whole day without an update.
    #[serde(default = "default_rate_per_day")]
    pub rate_per_day: f64,

    /// Decay never pushes a score below this value.
    #[serde(default = "default_floor")]
    pub floor: f64,
}

fn default_initial_trust() -> f64 {
    DEFAULT_INITIAL_TRUST
}

fn default_delegation_threshold() -> f64 {
    0.6
}

fn default_true() -> bool {
    true
}

fn default_rate_per_day() -> f64 {
    0.01
}

fn default_floor() -> f64 {
    0.3
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            rate_per_day: default_rate_per_day(),
            floor: default_floor(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_initial_trust: default_initial_trust(),
            decay: DecayConfig::default(),
            delegation_threshold: default_delegation_threshold(),
        }
    }
}

impl LedgerConfig {
    /// Parse and validate a TOML document.
    ///
    /// Returns `AtrianError::Config` for malformed TOML or out-of-range values.
    pub fn from_toml_str(s: &str) -> AtrianResult<Self> {
        let config: LedgerConfig = toml::from_str(s).map_err(|e| AtrianError::Config {
            reason: format!("failed to parse ledger TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> AtrianResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AtrianError::Config {
            reason: format!("failed to read ledger config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> AtrianResult<()> {
        check_unit("default_initial_trust", self.default_initial_trust)?;
        check_unit("delegation_threshold", self.delegation_threshold)?;
        check_unit("decay.floor", self.decay.floor)?;
        if !(0.0..1.0).contains(&self.decay.rate_per_day) {
            return Err(AtrianError::Config {
                reason: format!(
                    "decay.rate_per_day must be in [0, 1), got {}",
                    self.decay.rate_per_day
                ),
            });
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> AtrianResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AtrianError::Config {
            reason: format!("{} must be in [0, 1], got {}", name, value),
        })
    }
}
