//! Adapter configuration.
//!
//! ```toml
//! enable_auto_guidance = true
//! enable_trust_tracking = true
//! notification_threshold = 0.6
//! privacy_sensitivity = 0.8
//! min_trust_to_allow = 0.2
//!
//! [operation_mapping]
//! file_creation = "DATA_HANDLING"
//! code_editing = "CODE_EDITING"
//!
//! [guide.templates]
//! privacy_warning = "Consider privacy implications when {action}. {principle_reference}"
//!
//! [[guide.rules]]
//! context = "code_editing"
//! keywords = ["user data", "personal information"]
//! template = "privacy_warning"
//! template_vars = { action = "processing user data", principle_reference = "This aligns with Sacred Privacy (SP)." }
//! ```
//!
//! Every key is optional. A partial `operation_mapping` table replaces the
//! whole default mapping, so unlisted operation types route to `GENERAL`.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use atrian_contracts::{
    error::{AtrianError, AtrianResult},
    operation::{GuidanceContext, GuidanceType, OperationType},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// When false the guide skips its rules and fallbacks and returns empty
    /// guidance text. Ethics and trust are still assessed.
    #[serde(default = "default_true")]
    pub enable_auto_guidance: bool,

    /// When false, operations never raise ethics-trust events.
    #[serde(default = "default_true")]
    pub enable_trust_tracking: bool,

    /// Trust below this value makes an operation notify.
    #[serde(default = "default_notification_threshold")]
    pub notification_threshold: f64,

    /// Above 0.5, sensitive data alone makes an operation notify.
    #[serde(default = "default_privacy_sensitivity")]
    pub privacy_sensitivity: f64,

    /// Minimum trust for an operation to be allowed at all.
    #[serde(default = "default_min_trust_to_allow")]
    pub min_trust_to_allow: f64,

    /// Operation type name to guidance context name. Values are parsed at
    /// evaluation time; either spelling (`DATA_HANDLING`, `data_handling`)
    /// works.
    #[serde(default = "default_operation_mapping")]
    pub operation_mapping: BTreeMap<String, String>,

    #[serde(default)]
    pub guide: GuideConfig,
}

/// Templates and keyword rules for the silent guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideConfig {
    /// Template name to text with `{placeholder}` variables.
    #[serde(default = "default_templates")]
    pub templates: BTreeMap<String, String>,

    #[serde(default = "default_rules")]
    pub rules: Vec<GuidanceRule>,
}

/// When an operation in `context` mentions one of `keywords`, answer with
/// `template` filled from `template_vars` (plus `{context}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceRule {
    pub context: GuidanceContext,
    pub keywords: Vec<String>,
    pub template: String,
    #[serde(default)]
    pub guidance_type: GuidanceType,
    /// Rule is skipped for users whose trust is below this.
    #[serde(default)]
    pub trust_threshold: f64,
    #[serde(default)]
    pub template_vars: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_notification_threshold() -> f64 {
    0.6
}

fn default_privacy_sensitivity() -> f64 {
    0.8
}

fn default_min_trust_to_allow() -> f64 {
    0.2
}

fn default_operation_mapping() -> BTreeMap<String, String> {
    OperationType::ALL
        .into_iter()
        .map(|op| {
            (
                op.as_str().to_string(),
                op.default_guidance_context().as_str().to_uppercase(),
            )
        })
        .collect()
}

fn default_templates() -> BTreeMap<String, String> {
    [
        (
            "privacy_warning",
            "Consider privacy implications when {action}. {principle_reference}",
        ),
        (
            "security_recommendation",
            "Enhanced security practices recommended for {context}.",
        ),
        (
            "ethical_consideration",
            "This action has ethical implications related to {principles}.",
        ),
        (
            "trust_based_insight",
            "Based on trust assessment, consider {recommendation}.",
        ),
        (
            "educational_note",
            "Did you know? {fact} This relates to {principle}.",
        ),
        (
            "code_suggestion",
            "Consider {suggestion} when implementing {feature}.",
        ),
        (
            "data_handling",
            "When processing {data_type}, ensure {requirement}.",
        ),
    ]
    .into_iter()
    .map(|(name, text)| (name.to_string(), text.to_string()))
    .collect()
}

fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn default_rules() -> Vec<GuidanceRule> {
    vec![
        GuidanceRule {
            context: GuidanceContext::CodeEditing,
            keywords: vec!["user data".into(), "personal information".into()],
            template: "privacy_warning".into(),
            guidance_type: GuidanceType::Suggestion,
            trust_threshold: 0.0,
            template_vars: vars(&[
                ("action", "processing user data"),
                ("principle_reference", "This aligns with Sacred Privacy (SP)."),
            ]),
        },
        GuidanceRule {
            context: GuidanceContext::DataHandling,
            keywords: vec!["storage".into(), "database".into(), "save".into()],
            template: "data_handling".into(),
            guidance_type: GuidanceType::Suggestion,
            trust_threshold: 0.0,
            template_vars: vars(&[
                ("data_type", "sensitive information"),
                ("requirement", "proper encryption and access controls"),
            ]),
        },
        GuidanceRule {
            context: GuidanceContext::SecurityOperation,
            keywords: vec![
                "authentication".into(),
                "login".into(),
                "credential".into(),
            ],
            template: "security_recommendation".into(),
            guidance_type: GuidanceType::Suggestion,
            trust_threshold: 0.0,
            template_vars: vars(&[("context", "authentication systems")]),
        },
    ]
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            templates: default_templates(),
            rules: default_rules(),
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            enable_auto_guidance: true,
            enable_trust_tracking: true,
            notification_threshold: default_notification_threshold(),
            privacy_sensitivity: default_privacy_sensitivity(),
            min_trust_to_allow: default_min_trust_to_allow(),
            operation_mapping: default_operation_mapping(),
            guide: GuideConfig::default(),
        }
    }
}

impl AdapterConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> AtrianResult<Self> {
        let config: AdapterConfig = toml::from_str(s).map_err(|e| AtrianError::Config {
            reason: format!("failed to parse adapter TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> AtrianResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AtrianError::Config {
            reason: format!("failed to read adapter config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load `path`, falling back to defaults when it is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "no adapter config found, using defaults");
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(config) => {
                info!(path = %path.display(), "loaded adapter config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid adapter config, using defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> AtrianResult<()> {
        for (name, value) in [
            ("notification_threshold", self.notification_threshold),
            ("privacy_sensitivity", self.privacy_sensitivity),
            ("min_trust_to_allow", self.min_trust_to_allow),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AtrianError::Config {
                    reason: format!("{} must be in [0, 1], got {}", name, value),
                });
            }
        }
        Ok(())
    }
}
