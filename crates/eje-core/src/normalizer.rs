//! normalizer.rs
//! Converts raw per-critic outputs plus an input context into a validated
//! Evidence Bundle (spec §4.1).

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{EjeError, EjeResult};
use crate::model::critic_output::{CriticOutput, Verdict};
use crate::model::evidence_bundle::{
    Environment, EvidenceBundle, Flags, Metadata, PrecedentRef, Severity, ValidationError,
};
use crate::model::request::{InputSnapshot, RequestMetadata};

/// Raw shape a critic plugin is allowed to hand back before validation;
/// `verdict`/`confidence` are `Option` here because a misbehaving critic
/// may omit them, which the normalizer must catch per-field rather than
/// reject the whole bundle (spec §4.1).
#[derive(Debug, Clone)]
pub struct RawCriticOutput {
    pub critic: String,
    pub verdict: Option<Verdict>,
    pub confidence: Option<f64>,
    pub justification: Option<String>,
    pub weight: Option<f64>,
    pub priority: Option<crate::model::critic_output::Priority>,
    pub evidence_sources: Vec<crate::model::critic_output::EvidenceSource>,
    pub config_version: Option<String>,
    pub error_type: Option<String>,
    pub attempted_retries: u32,
    pub completion_rank: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    pub correlation_id: Option<String>,
    pub precedent_refs: Vec<PrecedentRef>,
    pub processing_time_ms: Option<f64>,
    pub environment: Option<Environment>,
    pub system_version: Option<String>,
}

/// `Normalize(input_text, context, metadata, raw_critic_outputs, ...) →
/// EvidenceBundle` (spec §4.1).
pub fn normalize(
    input_text: &str,
    context: Value,
    metadata: RequestMetadata,
    raw_outputs: Vec<RawCriticOutput>,
    options: NormalizeOptions,
) -> EjeResult<EvidenceBundle> {
    if input_text.trim().is_empty() {
        return Err(EjeError::MissingInput {
            message: "input_text is empty".to_string(),
        });
    }
    if raw_outputs.is_empty() {
        return Err(EjeError::MissingInput {
            message: "no critic outputs provided".to_string(),
        });
    }

    if let Some(nested) = context.get("text").and_then(Value::as_str) {
        if nested != input_text {
            return Err(EjeError::InputConflict {
                message: format!(
                    "input_text {input_text:?} disagrees with context.text {nested:?}"
                ),
            });
        }
    }

    let mut validation_errors = Vec::new();
    let mut critic_outputs = Vec::new();

    for (index, raw) in raw_outputs.into_iter().enumerate() {
        let Some(verdict) = raw.verdict else {
            validation_errors.push(ValidationError {
                field: format!("critic_outputs[{index}].verdict"),
                error: format!("critic '{}' produced no verdict", raw.critic),
                severity: Severity::Error,
            });
            continue;
        };
        let Some(confidence) = raw.confidence else {
            validation_errors.push(ValidationError {
                field: format!("critic_outputs[{index}].confidence"),
                error: format!("critic '{}' produced no confidence", raw.critic),
                severity: Severity::Error,
            });
            continue;
        };

        let mut output = CriticOutput {
            critic: raw.critic,
            verdict,
            confidence: confidence.clamp(0.0, 1.0),
            justification: raw.justification.unwrap_or_default(),
            weight: raw.weight.unwrap_or_else(CriticOutput::default_weight),
            priority: raw.priority,
            evidence_sources: raw.evidence_sources,
            config_version: raw.config_version,
            timestamp: Utc::now(),
            error_type: raw.error_type,
            attempted_retries: raw.attempted_retries,
            completion_rank: raw.completion_rank,
        };
        output.clamp_confidence();
        critic_outputs.push(output);
    }

    if critic_outputs.is_empty() {
        return Err(EjeError::MissingInput {
            message: "all critic outputs were dropped during normalization".to_string(),
        });
    }

    let requires_human_review = critic_outputs
        .iter()
        .any(|o| matches!(o.verdict, Verdict::Review | Verdict::Error));

    let input_snapshot = InputSnapshot::new(input_text, context, metadata);

    Ok(EvidenceBundle {
        bundle_id: Uuid::new_v4(),
        version: "1.0.0".to_string(),
        timestamp: Utc::now(),
        input_snapshot,
        critic_outputs,
        justification_synthesis: None,
        metadata: Metadata {
            system_version: options.system_version.unwrap_or_else(|| "0.1.0".to_string()),
            environment: options.environment.unwrap_or_default(),
            correlation_id: options.correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            processing_time_ms: options.processing_time_ms.unwrap_or(0.0),
            critic_config_versions: Vec::new(),
            precedent_refs: options.precedent_refs,
            flags: Flags { requires_human_review, ..Flags::default() },
        },
        validation_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok_raw(critic: &str, verdict: Verdict, confidence: f64) -> RawCriticOutput {
        RawCriticOutput {
            critic: critic.to_string(),
            verdict: Some(verdict),
            confidence: Some(confidence),
            justification: Some("because".to_string()),
            weight: None,
            priority: None,
            evidence_sources: vec![],
            config_version: None,
            error_type: None,
            attempted_retries: 0,
            completion_rank: None,
        }
    }

    #[test]
    fn empty_text_is_missing_input() {
        let err = normalize("", json!({}), RequestMetadata::default(), vec![ok_raw("c1", Verdict::Allow, 0.9)], NormalizeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MissingInput);
    }

    #[test]
    fn conflicting_nested_text_is_input_conflict() {
        let err = normalize(
            "hello",
            json!({"text": "goodbye"}),
            RequestMetadata::default(),
            vec![ok_raw("c1", Verdict::Allow, 0.9)],
            NormalizeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InputConflict);
    }

    #[test]
    fn missing_field_drops_output_but_keeps_others() {
        let mut bad = ok_raw("c2", Verdict::Allow, 0.9);
        bad.confidence = None;
        let bundle = normalize(
            "hello",
            json!({}),
            RequestMetadata::default(),
            vec![ok_raw("c1", Verdict::Allow, 0.9), bad],
            NormalizeOptions::default(),
        )
        .unwrap();
        assert_eq!(bundle.critic_outputs.len(), 1);
        assert_eq!(bundle.validation_errors.len(), 1);
    }

    #[test]
    fn review_verdict_sets_human_review_flag() {
        let bundle = normalize(
            "hello",
            json!({}),
            RequestMetadata::default(),
            vec![ok_raw("c1", Verdict::Review, 0.5)],
            NormalizeOptions::default(),
        )
        .unwrap();
        assert!(bundle.metadata.flags.requires_human_review);
    }

    #[test]
    fn completion_rank_is_carried_from_raw_output_not_slot_index() {
        let mut first = ok_raw("c1", Verdict::Allow, 0.9);
        first.completion_rank = Some(1);
        let mut second = ok_raw("c2", Verdict::Allow, 0.8);
        second.completion_rank = Some(0);
        let bundle = normalize(
            "hello",
            json!({}),
            RequestMetadata::default(),
            vec![first, second],
            NormalizeOptions::default(),
        )
        .unwrap();
        assert_eq!(bundle.critic_outputs[0].completion_rank, Some(1));
        assert_eq!(bundle.critic_outputs[1].completion_rank, Some(0));
    }
}
