//! Rule file schema and lenient parsing.
//!
//! A rules file is a YAML mapping with two optional lists:
//!
//! ```yaml
//! ethics:
//!   - id: ER-SP-001
//!     principle: Sacred Privacy (SP)
//!     keywords: [pii, personal data]
//!     severity: high
//!     disallow_if_triggered: true
//! trust_rules:
//!   - agent: Cascade
//!     level: high
//!     delegation: partial
//!     can_delegate_to: [Reviewer]
//! ```
//!
//! Parsing never fails. Each entry is converted on its own; entries that are
//! missing their required field or have a malformed field are skipped with a
//! warning while valid siblings still load. An unrecognised `severity` is not
//! a reason to skip: the rule loads as `medium`.

use serde_yaml::{Mapping, Value};
use tracing::warn;

use atrian_contracts::{
    ethics::{EthicsRule, Severity},
    trust::TrustBaseline,
};

/// Everything loaded from one rules file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub ethics: Vec<EthicsRule>,
    pub trust_baselines: Vec<TrustBaseline>,
}

impl RuleSet {
    /// Parse a YAML document into a rule set, skipping invalid entries.
    ///
    /// Malformed YAML, or a document that is not a mapping, yields an empty
    /// rule set and a warning.
    pub fn from_yaml_str(source: &str) -> Self {
        let document: Value = match serde_yaml::from_str(source) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "rules document is not valid YAML; using empty rule set");
                return Self::default();
            }
        };

        let mapping = match document {
            Value::Mapping(m) => m,
            Value::Null => return Self::default(),
            other => {
                warn!(kind = value_kind(&other), "rules document is not a mapping; using empty rule set");
                return Self::default();
            }
        };

        let ethics = entries(mapping.get("ethics"), "ethics")
            .filter_map(|(index, entry)| parse_ethics_rule(index, entry))
            .collect();

        let trust_baselines = entries(mapping.get("trust_rules"), "trust_rules")
            .filter_map(|(index, entry)| parse_trust_baseline(index, entry))
            .collect();

        Self {
            ethics,
            trust_baselines,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ethics.is_empty() && self.trust_baselines.is_empty()
    }

    /// Look up an ethics rule by id.
    pub fn ethics_rule(&self, id: &str) -> Option<&EthicsRule> {
        self.ethics.iter().find(|r| r.id == id)
    }

    /// Look up the baseline configured for `agent`.
    pub fn trust_baseline(&self, agent: &str) -> Option<&TrustBaseline> {
        self.trust_baselines.iter().find(|b| b.agent == agent)
    }
}

/// Iterate the items of a top-level list, warning when the key holds
/// something other than a sequence.
fn entries<'a>(
    value: Option<&'a Value>,
    section: &'static str,
) -> Box<dyn Iterator<Item = (usize, &'a Value)> + 'a> {
    match value {
        None | Some(Value::Null) => Box::new(std::iter::empty()),
        Some(Value::Sequence(items)) => Box::new(items.iter().enumerate()),
        Some(other) => {
            warn!(section, kind = value_kind(other), "rules section is not a list; ignoring it");
            Box::new(std::iter::empty())
        }
    }
}

fn parse_ethics_rule(index: usize, entry: &Value) -> Option<EthicsRule> {
    let mut entry = entry.clone();
    if let Value::Mapping(map) = &mut entry {
        normalize_severity(index, map);
    }
    match serde_yaml::from_value::<EthicsRule>(entry) {
        Ok(rule) if rule.id.trim().is_empty() => {
            warn!(index, "ethics rule has an empty id; skipping");
            None
        }
        Ok(rule) => Some(rule),
        Err(e) => {
            warn!(index, error = %e, "skipping malformed ethics rule");
            None
        }
    }
}

/// Rewrite `severity` to its canonical lowercase name, or to the default
/// severity when the value is not one we know.
fn normalize_severity(index: usize, map: &mut Mapping) {
    let Some(raw) = map.get("severity") else {
        return;
    };
    let parsed = match raw {
        Value::String(s) => s.parse::<Severity>().ok(),
        Value::Null => Some(Severity::default()),
        _ => None,
    };
    let severity = parsed.unwrap_or_else(|| {
        let rule_id = map.get("id").and_then(Value::as_str).unwrap_or("");
        warn!(
            index,
            rule_id,
            severity = ?raw,
            "unknown rule severity; using medium"
        );
        Severity::default()
    });
    map.insert(Value::from("severity"), Value::from(severity.as_str()));
}

fn parse_trust_baseline(index: usize, entry: &Value) -> Option<TrustBaseline> {
    match serde_yaml::from_value::<TrustBaseline>(entry.clone()) {
        Ok(baseline) if baseline.agent.trim().is_empty() => {
            warn!(index, "trust rule has an empty agent; skipping");
            None
        }
        Ok(mut baseline) => {
            baseline.agent = baseline.agent.trim().to_string();
            Some(baseline)
        }
        Err(e) => {
            warn!(index, error = %e, "skipping malformed trust rule");
            None
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}
