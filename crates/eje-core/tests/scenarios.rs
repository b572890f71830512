//! End-to-end scenarios from the design notes, exercised directly against
//! the aggregator / fallback / governance / override_pipeline modules
//! (no live critics needed).

use chrono::{Duration, Utc};
use eje_core::aggregator::aggregate;
use eje_core::config::{FallbackConfig, GovernanceConfig, RightEntry};
use eje_core::error::ErrorKind;
use eje_core::fallback::{check_and_apply, strategy::FallbackStrategy};
use eje_core::governance::{evaluate as evaluate_governance, RightReport};
use eje_core::model::critic_output::{CriticOutput, Priority, Verdict};
use eje_core::model::evidence_bundle::Environment;
use eje_core::model::override_request::{OverrideRequest, ReviewerRole};
use eje_core::override_pipeline::{apply, validate, ApplyOptions};
use uuid::Uuid;

fn critic_output(name: &str, verdict: Verdict, confidence: f64) -> CriticOutput {
    CriticOutput {
        critic: name.to_string(),
        verdict,
        confidence,
        justification: "scenario input".to_string(),
        weight: 1.0,
        priority: None,
        evidence_sources: vec![],
        config_version: None,
        timestamp: Utc::now(),
        error_type: None,
        attempted_retries: 0,
        completion_rank: None,
    }
}

#[test]
fn s1_clean_allow() {
    let outputs = vec![
        critic_output("c1", Verdict::Allow, 0.9),
        critic_output("c2", Verdict::Allow, 0.8),
        critic_output("c3", Verdict::Allow, 0.85),
    ];
    let aggregation = aggregate(&outputs);
    assert_eq!(aggregation.overall_verdict, Verdict::Allow);
    assert_eq!(
        aggregation.consensus_level,
        eje_core::model::evidence_bundle::ConsensusLevel::Unanimous
    );

    let outcome =
        evaluate_governance("req-s1", &GovernanceConfig::default(), &aggregation, &outputs, &[]).unwrap();
    assert_eq!(outcome.verdict, Verdict::Allow);
    assert!(!outcome.escalate);
    assert!(!outcome.human_modified);

    let fallback_config = FallbackConfig::default();
    let result = check_and_apply(
        &outputs,
        Some(&aggregation),
        Some(10.0),
        &[],
        &fallback_config,
        "req-s1",
        "corr-s1",
        Environment::Test,
        "0.1.0",
    );
    assert!(!result.triggered);
}

#[test]
fn s2_conservative_fallback_on_majority_failure() {
    let outputs = vec![
        critic_output("c1", Verdict::Allow, 0.9),
        CriticOutput::error("c2", "exception", "raised", 0),
        CriticOutput::error("c3", "exception", "raised", 0),
        critic_output("c4", Verdict::Deny, 0.7),
    ];
    let aggregation = aggregate(&outputs);
    let mut fallback_config = FallbackConfig::default();
    fallback_config.default_strategy = FallbackStrategy::Conservative;

    let result = check_and_apply(
        &outputs,
        Some(&aggregation),
        Some(100.0),
        &[],
        &fallback_config,
        "req-s2",
        "corr-s2",
        Environment::Test,
        "0.1.0",
    );
    assert!(result.triggered);
    let bundle = result.bundle.unwrap();
    assert_eq!(
        bundle.fallback_type,
        eje_core::model::fallback_bundle::FallbackType::MajorityCriticsFailed
    );
    assert_eq!(bundle.fallback_decision.verdict, Verdict::Deny);
    assert!((bundle.fallback_decision.confidence - 0.56).abs() < 1e-9);
    assert_eq!(bundle.failed_critics.len(), 2);
}

#[test]
fn s3_global_timeout() {
    let outputs = vec![
        CriticOutput::error("c1", "timeout", "exceeded per-critic timeout", 0),
        CriticOutput::error("c2", "timeout", "exceeded per-critic timeout", 0),
        CriticOutput::error("c3", "timeout", "exceeded per-critic timeout", 0),
    ];
    let mut fallback_config = FallbackConfig::default();
    fallback_config.timeout_threshold_ms = Some(2000);
    fallback_config.default_strategy = FallbackStrategy::Conservative;

    let result = check_and_apply(
        &outputs,
        None,
        Some(2100.0),
        &[],
        &fallback_config,
        "req-s3",
        "corr-s3",
        Environment::Test,
        "0.1.0",
    );
    assert!(result.triggered);
    let bundle = result.bundle.unwrap();
    assert_eq!(
        bundle.fallback_type,
        eje_core::model::fallback_bundle::FallbackType::TimeoutExceeded
    );
    assert_eq!(bundle.fallback_decision.verdict, Verdict::Review);
    assert!(bundle.fallback_decision.requires_human_review);
    assert_eq!(bundle.system_state_at_trigger.elapsed_ms, 2100.0);
}

#[test]
fn s4_hard_right_violation_raises_without_a_verdict() {
    let outputs = vec![critic_output("c1", Verdict::Deny, 0.8)];
    let aggregation = aggregate(&outputs);
    let config = GovernanceConfig {
        rights_hierarchy: vec![RightEntry { name: "dignity".to_string(), required: true }],
    };
    let reports = vec![RightReport {
        right: "dignity".to_string(),
        violated: true,
        evidence: "dehumanizing framing detected".to_string(),
        confidence_score: None,
    }];
    let err = evaluate_governance("req-s4", &config, &aggregation, &outputs, &reports).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RightsViolation);
}

#[test]
fn s5_valid_override_flips_verdict_and_records_reviewer_role() {
    let mut decision = crate::test_support::deny_decision();
    let request = OverrideRequest {
        request_id: Uuid::new_v4(),
        reviewer_id: "reviewer-1".to_string(),
        reviewer_role: ReviewerRole::EthicsOfficer,
        reviewer_name: None,
        reviewer_email: None,
        decision_id: decision.decision_id,
        original_outcome: Some(Verdict::Deny),
        proposed_outcome: Verdict::Allow,
        justification: "New context from the requester clarifies the situation sufficiently.".to_string(),
        reason_category: "new_evidence".to_string(),
        priority: 5,
        is_urgent: false,
        expires_at: None,
        supporting_documents: vec![],
        stakeholder_input: vec![],
        timestamp: Utc::now(),
    };

    let updated = apply(&mut decision, &request, &ApplyOptions::default()).unwrap();
    assert_eq!(updated.current_verdict(), Verdict::Allow);
    let override_record = updated.governance_outcome.override_record.unwrap();
    assert_eq!(override_record.override_by.reviewer_role, ReviewerRole::EthicsOfficer);
    assert_eq!(override_record.original_outcome, Verdict::Deny);
    assert_eq!(override_record.proposed_outcome, Verdict::Allow);
}

#[test]
fn s6_expired_override_rejected_and_decision_unchanged() {
    let decision = crate::test_support::deny_decision();
    let now = Utc::now();
    let request = OverrideRequest {
        request_id: Uuid::new_v4(),
        reviewer_id: "reviewer-1".to_string(),
        reviewer_role: ReviewerRole::EthicsOfficer,
        reviewer_name: None,
        reviewer_email: None,
        decision_id: decision.decision_id,
        original_outcome: Some(Verdict::Deny),
        proposed_outcome: Verdict::Allow,
        justification: "New context from the requester clarifies the situation sufficiently.".to_string(),
        reason_category: "new_evidence".to_string(),
        priority: 5,
        is_urgent: false,
        expires_at: Some(now - Duration::hours(1)),
        supporting_documents: vec![],
        stakeholder_input: vec![],
        timestamp: now - Duration::hours(2),
    };

    let err = validate(&decision, &request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OverrideValidation);
    assert_eq!(decision.current_verdict(), Verdict::Deny);
}

#[test]
fn boundary_avg_confidence_exactly_0_3_does_not_trigger_insufficient_confidence() {
    let outputs = vec![critic_output("c1", Verdict::Allow, 0.3)];
    let aggregation = aggregate(&outputs);
    assert!((aggregation.avg_confidence - 0.3).abs() < 1e-9);

    let config = FallbackConfig::default();
    let result = check_and_apply(
        &outputs,
        Some(&aggregation),
        Some(10.0),
        &[],
        &config,
        "req-boundary",
        "corr-boundary",
        Environment::Test,
        "0.1.0",
    );
    assert!(!result.triggered);
}

#[test]
fn boundary_priority_override_and_veto_coexist_veto_wins_on_deny() {
    let mut vetoer = critic_output("c1", Verdict::Deny, 0.6);
    vetoer.priority = Some(Priority::Veto);
    let mut overrider = critic_output("c2", Verdict::Allow, 0.9);
    overrider.priority = Some(Priority::Override);
    let outputs = vec![vetoer, overrider];
    let aggregation = aggregate(&outputs);
    assert_eq!(aggregation.overall_verdict, Verdict::Deny);
    assert_eq!(aggregation.priority_events.len(), 1);
}

#[test]
fn boundary_two_of_four_timeouts_does_not_trigger_fallback() {
    let outputs = vec![
        CriticOutput::error("c1", "timeout", "exceeded per-critic timeout", 0),
        CriticOutput::error("c2", "timeout", "exceeded per-critic timeout", 0),
        critic_output("c3", Verdict::Allow, 0.9),
        critic_output("c4", Verdict::Allow, 0.8),
    ];
    let aggregation = aggregate(&outputs);
    let config = FallbackConfig::default();
    let result = check_and_apply(
        &outputs,
        Some(&aggregation),
        Some(10.0),
        &[],
        &config,
        "req-boundary-timeouts-4",
        "corr-boundary-timeouts-4",
        Environment::Test,
        "0.1.0",
    );
    assert!(!result.triggered);
}

#[test]
fn boundary_two_of_three_timeouts_triggers_timeout_exceeded() {
    let outputs = vec![
        CriticOutput::error("c1", "timeout", "exceeded per-critic timeout", 0),
        CriticOutput::error("c2", "timeout", "exceeded per-critic timeout", 0),
        critic_output("c3", Verdict::Allow, 0.9),
    ];
    let aggregation = aggregate(&outputs);
    let config = FallbackConfig::default();
    let result = check_and_apply(
        &outputs,
        Some(&aggregation),
        Some(10.0),
        &[],
        &config,
        "req-boundary-timeouts-3",
        "corr-boundary-timeouts-3",
        Environment::Test,
        "0.1.0",
    );
    assert!(result.triggered);
    let bundle = result.bundle.unwrap();
    assert_eq!(
        bundle.fallback_type,
        eje_core::model::fallback_bundle::FallbackType::TimeoutExceeded
    );
}

mod test_support {
    use chrono::Utc;
    use eje_core::aggregator::AggregationResult;
    use eje_core::governance::GovernanceOutcome;
    use eje_core::model::critic_output::Verdict;
    use eje_core::model::decision::Decision;
    use eje_core::model::evidence_bundle::{
        ConsensusLevel, Environment, EvidenceBundle, Flags, Metadata,
    };
    use eje_core::model::request::{InputSnapshot, RequestMetadata};
    use uuid::Uuid;

    pub fn deny_decision() -> Decision {
        Decision {
            decision_id: Uuid::new_v4(),
            bundle: EvidenceBundle {
                bundle_id: Uuid::new_v4(),
                version: "1.0.0".to_string(),
                timestamp: Utc::now(),
                input_snapshot: InputSnapshot::new(
                    "scenario text",
                    serde_json::json!({}),
                    RequestMetadata::default(),
                ),
                critic_outputs: vec![],
                justification_synthesis: None,
                metadata: Metadata {
                    system_version: "0.1.0".to_string(),
                    environment: Environment::Test,
                    correlation_id: "corr-1".to_string(),
                    processing_time_ms: 1.0,
                    critic_config_versions: vec![],
                    precedent_refs: vec![],
                    flags: Flags::default(),
                },
                validation_errors: vec![],
            },
            aggregation: AggregationResult {
                overall_verdict: Verdict::Deny,
                avg_confidence: 0.8,
                confidence_variance: 0.0,
                consensus_level: ConsensusLevel::Unanimous,
                ambiguity: 0.0,
                verdict_distribution: vec![],
                priority_events: vec![],
            },
            governance_outcome: GovernanceOutcome {
                verdict: Verdict::Deny,
                safeguards_triggered: vec![],
                escalate: false,
                fairness_penalty: false,
                advisory_warnings: vec![],
                human_modified: false,
                override_record: None,
            },
            escalated: false,
            precedents: vec![],
            fallback: None,
        }
    }
}

mod context_hash_properties {
    use eje_core::context_hash;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn shuffled_object(pairs: Vec<(String, i64)>) -> (Value, Value) {
        let mut forward = serde_json::Map::new();
        for (k, v) in &pairs {
            forward.insert(k.clone(), json!(v));
        }
        let mut reversed = serde_json::Map::new();
        for (k, v) in pairs.iter().rev() {
            reversed.insert(k.clone(), json!(v));
        }
        (Value::Object(forward), Value::Object(reversed))
    }

    proptest! {
        #[test]
        fn context_hash_is_stable_under_key_permutation(
            pairs in prop::collection::vec(("[a-z]{1,8}", any::<i64>()), 0..8)
        ) {
            let mut unique_pairs = pairs;
            unique_pairs.dedup_by(|a, b| a.0 == b.0);
            let (forward, reversed) = shuffled_object(unique_pairs);
            prop_assert_eq!(context_hash("scenario text", &forward), context_hash("scenario text", &reversed));
        }
    }
}
