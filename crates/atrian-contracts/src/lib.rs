//! # atrian-contracts
//!
//! Shared types, schemas, and contracts for the ATRiAN trust/ethics runtime.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions, enum parsing and error types.

pub mod agent;
pub mod error;
pub mod ethics;
pub mod integration;
pub mod memory;
pub mod operation;
pub mod trust;

#[cfg(test)]
mod tests {
    use super::*;
    use agent::{AgentId, EvaluationId, OperationId};
    use error::AtrianError;
    use ethics::{EthicsRule, Severity};
    use integration::EthicsTrustEvent;
    use operation::{GuidanceContext, NotificationPriority, OperationType};
    use trust::{clamp_score, TrustDimension, TrustLevel, TrustOutcome};

    // ── AgentId ──────────────────────────────────────────────────────────────

    #[test]
    fn agent_id_parse_trims_whitespace() {
        let id = AgentId::parse("  Cascade \n").unwrap();
        assert_eq!(id.as_str(), "Cascade");
    }

    #[test]
    fn agent_id_parse_rejects_empty_and_blank() {
        assert!(AgentId::parse("").is_none());
        assert!(AgentId::parse("   \t").is_none());
    }

    #[test]
    fn evaluation_id_new_produces_unique_values() {
        let unique: std::collections::HashSet<String> =
            (0..100).map(|_| EvaluationId::new().to_string()).collect();
        assert_eq!(unique.len(), 100);
    }

    #[test]
    fn operation_id_is_prefixed_with_type() {
        let id = OperationId::new("file_creation");
        assert!(id.as_str().starts_with("file_creation-"));
        assert_ne!(id, OperationId::new("file_creation"));
    }

    // ── Trust scores & outcomes ──────────────────────────────────────────────

    #[test]
    fn clamp_score_bounds() {
        assert_eq!(clamp_score(1.7), 1.0);
        assert_eq!(clamp_score(-0.2), 0.0);
        assert_eq!(clamp_score(0.42), 0.42);
    }

    #[test]
    fn trust_outcome_sign_ignores_magnitude_sign() {
        assert_eq!(TrustOutcome::Positive.signed(-0.1), 0.1);
        assert_eq!(TrustOutcome::Negative.signed(0.1), -0.1);
        assert_eq!(TrustOutcome::Negative.signed(-0.1), -0.1);
        assert_eq!(TrustOutcome::Neutral.signed(0.5), 0.0);
    }

    #[test]
    fn trust_outcome_parse_is_case_insensitive() {
        assert_eq!("POSITIVE".parse::<TrustOutcome>().unwrap(), TrustOutcome::Positive);
        assert_eq!(" negative ".parse::<TrustOutcome>().unwrap(), TrustOutcome::Negative);
    }

    #[test]
    fn trust_outcome_parse_rejects_unknown() {
        match "catastrophic".parse::<TrustOutcome>() {
            Err(AtrianError::Parse { kind, value }) => {
                assert_eq!(kind, "trust outcome");
                assert_eq!(value, "catastrophic");
            }
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn trust_level_baselines() {
        assert_eq!(TrustLevel::SystemCritical.baseline_score(), 0.9);
        assert_eq!(TrustLevel::Medium.baseline_score(), 0.65);
        assert_eq!(TrustLevel::Blocked.baseline_score(), 0.0);
        assert_eq!("untrusted".parse::<TrustLevel>().unwrap(), TrustLevel::Untrusted);
        assert!("godlike".parse::<TrustLevel>().is_err());
    }

    #[test]
    fn trust_dimension_serializes_lowercase() {
        let json = serde_json::to_string(&TrustDimension::Benevolence).unwrap();
        assert_eq!(json, "\"benevolence\"");
    }

    // ── Ethics rules ─────────────────────────────────────────────────────────

    #[test]
    fn ethics_rule_defaults_apply() {
        let rule: EthicsRule = serde_json::from_str(r#"{"id": "ER-1"}"#).unwrap();
        assert_eq!(rule.severity, Severity::Medium);
        assert!(!rule.disallow_if_triggered);
        assert!(rule.keywords.is_empty());
        assert!(rule.principle.is_none());
    }

    #[test]
    fn severity_orders_by_weight() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    // ── Operation parsing ────────────────────────────────────────────────────

    #[test]
    fn operation_type_parse_known_and_unknown() {
        assert_eq!(
            "external_api_call".parse::<OperationType>().unwrap(),
            OperationType::ExternalApiCall
        );
        match "teleport".parse::<OperationType>() {
            Err(AtrianError::Parse { kind, .. }) => assert_eq!(kind, "operation type"),
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn guidance_context_accepts_upper_case_names() {
        assert_eq!(
            "DATA_HANDLING".parse::<GuidanceContext>().unwrap(),
            GuidanceContext::DataHandling
        );
        assert!("NOWHERE".parse::<GuidanceContext>().is_err());
    }

    #[test]
    fn default_guidance_contexts() {
        assert_eq!(
            OperationType::FileModification.default_guidance_context(),
            GuidanceContext::DataHandling
        );
        assert_eq!(
            OperationType::ExternalApiCall.default_guidance_context(),
            GuidanceContext::SecurityOperation
        );
        assert_eq!(
            OperationType::General.default_guidance_context(),
            GuidanceContext::General
        );
    }

    #[test]
    fn sensitive_operations() {
        assert!(OperationType::Authentication.is_sensitive());
        assert!(!OperationType::CodeEditing.is_sensitive());
        assert!(!OperationType::UserInteraction.is_sensitive());
    }

    #[test]
    fn notification_priority_for_decision() {
        assert_eq!(NotificationPriority::for_decision(false, true), NotificationPriority::High);
        assert_eq!(NotificationPriority::for_decision(true, true), NotificationPriority::Medium);
        assert_eq!(NotificationPriority::for_decision(true, false), NotificationPriority::Low);
    }

    // ── Ethics-trust events ──────────────────────────────────────────────────

    #[test]
    fn ethics_trust_event_penalties() {
        let privacy = EthicsTrustEvent::PrivacyViolation.adjustment(0.1);
        assert!((privacy + 0.15).abs() < 1e-9, "got {}", privacy);

        let boundary = EthicsTrustEvent::TrustBoundaryCrossed.adjustment(0.1);
        assert!((boundary + 0.13).abs() < 1e-9, "got {}", boundary);

        assert_eq!(EthicsTrustEvent::PrivacyRespect.adjustment(0.05), 0.05);
        assert_eq!(
            EthicsTrustEvent::TrustBoundaryCrossed.dimension(),
            TrustDimension::Security
        );
    }

    #[test]
    fn ethics_trust_event_reason_prefix() {
        assert_eq!(
            EthicsTrustEvent::IntegrityCompromise.reason("tampered log"),
            "Integrity compromised: tampered log"
        );
    }

    // ── AtrianError display messages ─────────────────────────────────────────

    #[test]
    fn error_parse_display() {
        let err = AtrianError::parse("severity", "extreme");
        let msg = err.to_string();
        assert!(msg.contains("unrecognized severity"));
        assert!(msg.contains("extreme"));
    }

    #[test]
    fn error_storage_display() {
        let err = AtrianError::Storage {
            reason: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("storage error"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn error_from_serde_json() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        match AtrianError::from(bad) {
            AtrianError::Serialization { .. } => {}
            other => panic!("expected Serialization error, got {:?}", other),
        }
    }
}
