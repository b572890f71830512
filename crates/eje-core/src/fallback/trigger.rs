//! fallback/trigger.rs
//! Trigger detection (spec §4.5.1). Pure, non-suspending: the first
//! matching condition wins.

use crate::aggregator::AggregationResult;
use crate::config::FallbackConfig;
use crate::model::critic_output::CriticOutput;
use crate::model::evidence_bundle::{Severity, ValidationError};
use crate::model::fallback_bundle::FallbackType;

#[derive(Debug, Clone, Copy)]
pub struct TriggerInputs<'a> {
    pub outputs: &'a [CriticOutput],
    pub aggregation: Option<&'a AggregationResult>,
    pub elapsed_ms: Option<f64>,
    pub validation_errors: &'a [ValidationError],
}

/// Evaluate the eleven trigger conditions of spec §4.5.1 in order;
/// returns `None` if no trigger fired.
pub fn detect(inputs: TriggerInputs<'_>, config: &FallbackConfig) -> Option<FallbackType> {
    let TriggerInputs { outputs, aggregation, elapsed_ms, validation_errors } = inputs;

    if outputs.is_empty() {
        return Some(FallbackType::AllCriticsFailed);
    }

    if let (Some(elapsed), Some(threshold)) = (elapsed_ms, config.timeout_threshold_ms) {
        if elapsed > threshold as f64 {
            return Some(FallbackType::TimeoutExceeded);
        }
    }

    if validation_errors.iter().any(|e| e.severity == Severity::Error) {
        return Some(FallbackType::SchemaValidationFailed);
    }

    let total = outputs.len();
    let timeout_count = outputs.iter().filter(|o| o.is_timeout()).count();
    if timeout_count == total {
        return Some(FallbackType::TimeoutExceeded);
    }
    if timeout_count * 2 > total {
        return Some(FallbackType::TimeoutExceeded);
    }

    let error_count = outputs.iter().filter(|o| !o.is_successful()).count();
    if error_count == total {
        return Some(FallbackType::AllCriticsFailed);
    }
    if error_count * 2 > total {
        return Some(FallbackType::MajorityCriticsFailed);
    }

    let error_rate = error_count as f64 / total as f64;
    if error_rate > config.error_rate_threshold {
        return Some(FallbackType::HighErrorRate);
    }

    if outputs
        .iter()
        .any(|o| !o.is_successful() && config.critical_critics.contains(&o.critic))
    {
        return Some(FallbackType::CriticalCriticFailed);
    }

    let successful_count = total - error_count;
    if successful_count < config.min_successful_critics {
        return Some(FallbackType::MajorityCriticsFailed);
    }

    if let Some(agg) = aggregation {
        if agg.avg_confidence < 0.3 {
            return Some(FallbackType::InsufficientConfidence);
        }
    }

    None
}
