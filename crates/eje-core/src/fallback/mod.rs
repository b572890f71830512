//! fallback/mod.rs
//! The fallback engine (spec §4.5): detect unsafe pipeline states and
//! synthesize a safe decision, always accompanied by an audit bundle.

pub mod strategy;
pub mod trigger;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregator::AggregationResult;
use crate::config::FallbackConfig;
use crate::model::critic_output::CriticOutput;
use crate::model::evidence_bundle::{Environment, ValidationError};
use crate::model::fallback_bundle::{
    FailedCriticInfo, FallbackDecision, FallbackEvidenceBundle, FallbackType, SystemStateAtTrigger,
};

pub use strategy::{FallbackStrategy, StrategyOutcome};
pub use trigger::TriggerInputs;

/// Whether a strategy errs toward the conservative/safe side by
/// construction (spec §4.5.2's fail-safe guarantee). `Permissive` and
/// `Majority` can surface the less restrictive verdict among critics, so
/// they are not unconditionally safe defaults.
fn is_safe_default_strategy(strategy: FallbackStrategy) -> bool {
    matches!(
        strategy,
        FallbackStrategy::Conservative | FallbackStrategy::Escalate | FallbackStrategy::FailSafe
    )
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackResult {
    pub triggered: bool,
    pub bundle: Option<FallbackEvidenceBundle>,
}

/// Run trigger detection and, if triggered, apply the configured strategy
/// and assemble the audit bundle (spec §4.5.3). Never fails: a strategy
/// failure (panic-free by construction here, but kept defensive per the
/// spec's "fail-safe must never throw") falls through to fail-safe.
#[allow(clippy::too_many_arguments)]
pub fn check_and_apply(
    outputs: &[CriticOutput],
    aggregation: Option<&AggregationResult>,
    elapsed_ms: Option<f64>,
    validation_errors: &[ValidationError],
    config: &FallbackConfig,
    request_id: &str,
    correlation_id: &str,
    environment: Environment,
    system_version: &str,
) -> FallbackResult {
    let started = Utc::now();
    let trigger = trigger::detect(
        TriggerInputs { outputs, aggregation, elapsed_ms, validation_errors },
        config,
    );

    let Some(fallback_type) = trigger else {
        return FallbackResult { triggered: false, bundle: None };
    };

    let outcome = strategy::apply(config.default_strategy, outputs, config.safe_default_verdict);

    let failed_critics: Vec<FailedCriticInfo> = outputs
        .iter()
        .filter(|o| !o.is_successful())
        .map(|o| FailedCriticInfo {
            name: o.critic.clone(),
            failure_reason: o.justification.clone(),
            error_type: o.error_type.clone().unwrap_or_else(|| "unknown".to_string()),
            error_message: Some(o.justification.clone()),
            stack_trace: None,
            attempted_retries: o.attempted_retries,
        })
        .collect();

    let succeeded = outputs.len() - failed_critics.len();
    let decision_time_ms = (Utc::now() - started).num_milliseconds() as f64;

    let bundle = FallbackEvidenceBundle {
        bundle_id: Uuid::new_v4(),
        fallback_type,
        failed_critics,
        system_state_at_trigger: SystemStateAtTrigger {
            total_expected: outputs.len(),
            attempted: outputs.len(),
            succeeded,
            failed: outputs.len() - succeeded,
            elapsed_ms: elapsed_ms.unwrap_or(0.0),
            timeout_threshold_ms: config.timeout_threshold_ms,
            active_critics: outputs.iter().map(|o| o.critic.clone()).collect(),
            request_id: request_id.to_string(),
            correlation_id: correlation_id.to_string(),
            environment,
            system_version: system_version.to_string(),
        },
        fallback_decision: FallbackDecision {
            verdict: outcome.verdict,
            confidence: outcome.confidence,
            strategy_used: config.default_strategy.to_string(),
            reason: outcome.reason,
            is_safe_default: is_safe_default_strategy(config.default_strategy),
            requires_human_review: outcome.requires_human_review,
            alternative_verdicts: outcome.alternative_verdicts,
            decision_time_ms,
        },
        successful_critic_outputs: outputs.iter().filter(|o| o.is_successful()).cloned().collect(),
        warnings: outcome.warnings,
        errors: validation_errors.to_vec(),
        recovery_attempted: false,
        recovery_successful: false,
        timestamp: Utc::now(),
    };

    FallbackResult { triggered: true, bundle: Some(bundle) }
}
