//! Privacy classification and anonymization of stored operation data.
//!
//! Classification works on the lower-cased JSON text of a value:
//!
//! 1. An SSN-shaped number or a `password: …` assignment is `Critical`.
//! 2. Otherwise, three or more distinct privacy terms make it `High`, one or
//!    two make it `Medium`, none make it `Low`.
//!
//! Anonymization replaces matches of each pattern with a placeholder such as
//! `[EMAIL]`, walking objects and arrays recursively. Only strings change.

use std::{fmt, sync::LazyLock};

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::store::MemoryConfig;

/// How sensitive a stored value is. Ordered from least to most sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
    Critical,
}

impl Sensitivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High => "high",
            Sensitivity::Critical => "critical",
        }
    }

    /// How long a value of this sensitivity may be kept.
    pub fn retention(self) -> Duration {
        match self {
            Sensitivity::Low => Duration::days(365),
            Sensitivity::Medium => Duration::days(90),
            Sensitivity::High => Duration::days(30),
            Sensitivity::Critical => Duration::days(1),
        }
    }

    /// Whether the value must be anonymized before it is stored.
    pub fn requires_anonymization(self) -> bool {
        self >= Sensitivity::High
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const PRIVACY_TERMS: &[&str] = &[
    // Identifiers and secrets
    "password", "secret", "token", "key", "credential", "auth", "authentication",
    "personal", "private", "sensitive", "confidential", "restricted",
    // Financial
    "credit", "debit", "card", "cvv", "ccv", "payment", "bank", "account",
    // Identity
    "ssn", "social security", "passport", "license", "id number", "identity",
    // Contact
    "address", "phone", "email", "contact", "location", "gps", "coordinate",
    // Health
    "health", "medical", "diagnosis", "treatment", "prescription", "patient",
];

macro_rules! privacy_pattern {
    ($name:ident, $regex_str:expr) => {
        static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($regex_str).ok());
    };
}

privacy_pattern!(RE_CREDIT_CARD, r"\b(?:\d[ -]*?){13,16}\b");
privacy_pattern!(RE_EMAIL, r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b");
privacy_pattern!(RE_PHONE, r"\b\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}\b");
privacy_pattern!(RE_SSN, r"\b\d{3}-\d{2}-\d{4}\b");
privacy_pattern!(RE_IP_ADDRESS, r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b");
privacy_pattern!(RE_URL, r"https?://[^\s]+");
privacy_pattern!(RE_API_KEY, r"\b[A-Za-z0-9_\-]{20,}\b");
privacy_pattern!(RE_PASSWORD, r"(?i)password[\s:=]+[^\s]+");
privacy_pattern!(RE_TOKEN, r"(?i)token[\s:=]+[^\s]+");

/// Patterns in the order they are applied, with their placeholders.
static ANONYMIZATION_PATTERNS: [(&LazyLock<Option<Regex>>, &str); 9] = [
    (&RE_CREDIT_CARD, "[CREDIT_CARD]"),
    (&RE_EMAIL, "[EMAIL]"),
    (&RE_PHONE, "[PHONE]"),
    (&RE_SSN, "[SSN]"),
    (&RE_IP_ADDRESS, "[IP_ADDRESS]"),
    (&RE_URL, "[URL]"),
    (&RE_API_KEY, "[API_KEY]"),
    (&RE_PASSWORD, "[PASSWORD]"),
    (&RE_TOKEN, "[TOKEN]"),
];

fn matches(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(text))
}

/// Classifies and scrubs values before they reach a backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivacyFilter;

impl PrivacyFilter {
    pub fn new() -> Self {
        Self
    }

    /// Classify a JSON value.
    pub fn detect_sensitivity(&self, value: &serde_json::Value) -> Sensitivity {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.detect_text_sensitivity(&text)
    }

    pub fn detect_text_sensitivity(&self, text: &str) -> Sensitivity {
        let text = text.to_lowercase();
        if matches(&RE_SSN, &text) || matches(&RE_PASSWORD, &text) {
            return Sensitivity::Critical;
        }

        match self.term_count(&text) {
            0 => Sensitivity::Low,
            1 | 2 => Sensitivity::Medium,
            _ => Sensitivity::High,
        }
    }

    /// Distinct privacy terms occurring in already lower-cased text.
    fn term_count(&self, text: &str) -> usize {
        PRIVACY_TERMS.iter().filter(|term| text.contains(*term)).count()
    }

    /// Replace every pattern match in every string with its placeholder.
    pub fn anonymize(&self, value: &serde_json::Value) -> serde_json::Value {
        use serde_json::Value;

        match value {
            Value::String(s) => Value::String(self.anonymize_text(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.anonymize(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.anonymize(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    pub fn anonymize_text(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (pattern, placeholder) in ANONYMIZATION_PATTERNS.iter() {
            if let Some(re) = pattern.as_ref() {
                result = re.replace_all(&result, *placeholder).into_owned();
            }
        }
        result
    }

    /// Whether a value recorded at `recorded_at` is still inside its
    /// retention window at `now`.
    pub fn should_retain(
        &self,
        sensitivity: Sensitivity,
        recorded_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        now < recorded_at + sensitivity.retention()
    }

    pub fn retention_date(&self, sensitivity: Sensitivity, now: DateTime<Utc>) -> DateTime<Utc> {
        now + sensitivity.retention()
    }

    /// Apply the filter only when the config enables it.
    pub fn enabled_for(config: &MemoryConfig) -> Option<Self> {
        config.enable_privacy_filter.then_some(Self)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::{PrivacyFilter, Sensitivity};

    #[test]
    fn test_sensitivity_levels() {
        let filter = PrivacyFilter::new();
        assert_eq!(filter.detect_text_sensitivity("refactor the parser"), Sensitivity::Low);
        assert_eq!(filter.detect_text_sensitivity("update the phone field"), Sensitivity::Medium);
        assert_eq!(
            filter.detect_text_sensitivity("patient medical diagnosis"),
            Sensitivity::High
        );
        assert_eq!(
            filter.detect_text_sensitivity("Password: hunter2"),
            Sensitivity::Critical
        );
        assert_eq!(filter.detect_text_sensitivity("ssn 123-45-6789"), Sensitivity::Critical);
    }

    #[test]
    fn test_anonymize_walks_nested_values() {
        let filter = PrivacyFilter::new();
        let value = json!({
            "contact": "mail alice@example.com",
            "hosts": ["10.0.0.12", 42],
            "auth": { "line": "token: abc" }
        });

        let scrubbed = filter.anonymize(&value);
        assert_eq!(scrubbed["contact"], "mail [EMAIL]");
        assert_eq!(scrubbed["hosts"][0], "[IP_ADDRESS]");
        assert_eq!(scrubbed["hosts"][1], 42);
        assert_eq!(scrubbed["auth"]["line"], "[TOKEN]");
    }

    #[test]
    fn test_retention_windows() {
        let filter = PrivacyFilter::new();
        let then = Utc::now();

        assert!(filter.should_retain(Sensitivity::Low, then, then + Duration::days(364)));
        assert!(!filter.should_retain(Sensitivity::Medium, then, then + Duration::days(90)));
        assert!(!filter.should_retain(Sensitivity::Critical, then, then + Duration::hours(25)));
        assert_eq!(
            filter.retention_date(Sensitivity::High, then),
            then + Duration::days(30)
        );
    }
}
