//! fallback/strategy.rs
//! The five fallback strategies (spec §4.5.2). Each maps
//! `(outputs, trigger, context)` to a verdict, confidence and reason;
//! none of these ever suspend (spec §5).

use serde::{Deserialize, Serialize};

use crate::model::critic_output::{CriticOutput, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    Conservative,
    Permissive,
    Escalate,
    FailSafe,
    Majority,
}

impl std::fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FallbackStrategy::Conservative => "conservative",
            FallbackStrategy::Permissive => "permissive",
            FallbackStrategy::Escalate => "escalate",
            FallbackStrategy::FailSafe => "fail_safe",
            FallbackStrategy::Majority => "majority",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub verdict: Verdict,
    pub confidence: f64,
    pub reason: String,
    pub requires_human_review: bool,
    pub warnings: Vec<String>,
    pub alternative_verdicts: Vec<Verdict>,
}

/// Apply `strategy` to the successful critic outputs, falling back to
/// fail-safe for anything the strategy can't handle on its own (spec
/// §4.5.3 "fail-safe must never throw").
pub fn apply(
    strategy: FallbackStrategy,
    outputs: &[CriticOutput],
    safe_default_verdict: Verdict,
) -> StrategyOutcome {
    let successful: Vec<&CriticOutput> = outputs.iter().filter(|o| o.is_successful()).collect();

    match strategy {
        FallbackStrategy::Conservative => conservative(&successful),
        FallbackStrategy::Permissive => permissive(&successful),
        FallbackStrategy::Escalate => escalate(),
        FallbackStrategy::FailSafe => fail_safe(safe_default_verdict),
        FallbackStrategy::Majority => majority(&successful, safe_default_verdict),
    }
}

fn conservative(successful: &[&CriticOutput]) -> StrategyOutcome {
    if successful.is_empty() {
        return StrategyOutcome {
            verdict: Verdict::Review,
            confidence: 0.0,
            reason: "no successful critic outputs; defaulting to REVIEW".to_string(),
            requires_human_review: true,
            warnings: vec![],
            alternative_verdicts: vec![],
        };
    }
    let most_restrictive = [Verdict::Deny, Verdict::Review, Verdict::Allow]
        .into_iter()
        .find(|v| successful.iter().any(|o| o.verdict == *v))
        .unwrap_or(Verdict::Review);
    let min_confidence = successful
        .iter()
        .map(|o| o.confidence)
        .fold(f64::INFINITY, f64::min);
    StrategyOutcome {
        verdict: most_restrictive,
        confidence: min_confidence * 0.8,
        reason: format!("conservative strategy selected most restrictive verdict {most_restrictive:?}"),
        requires_human_review: most_restrictive != Verdict::Allow,
        warnings: vec![],
        alternative_verdicts: vec![],
    }
}

fn permissive(successful: &[&CriticOutput]) -> StrategyOutcome {
    let any_allow = successful.iter().any(|o| o.verdict == Verdict::Allow);
    let (verdict, confidence) = if any_allow {
        let max_confidence = successful
            .iter()
            .map(|o| o.confidence)
            .fold(f64::NEG_INFINITY, f64::max);
        (Verdict::Allow, max_confidence * 0.7)
    } else {
        (Verdict::Review, 0.3)
    };
    StrategyOutcome {
        verdict,
        confidence,
        reason: "permissive strategy preferred ALLOW where any critic voted it".to_string(),
        requires_human_review: verdict != Verdict::Allow,
        warnings: vec!["permissive fallback strategy applied; monitor outcome".to_string()],
        alternative_verdicts: vec![],
    }
}

fn escalate() -> StrategyOutcome {
    StrategyOutcome {
        verdict: Verdict::Review,
        confidence: 0.0,
        reason: "escalate strategy always defers to human review".to_string(),
        requires_human_review: true,
        warnings: vec![],
        alternative_verdicts: vec![],
    }
}

fn fail_safe(safe_default_verdict: Verdict) -> StrategyOutcome {
    StrategyOutcome {
        verdict: safe_default_verdict,
        confidence: 0.5,
        reason: "fail-safe strategy returned the configured safe default".to_string(),
        requires_human_review: safe_default_verdict != Verdict::Allow,
        warnings: vec![],
        alternative_verdicts: vec![],
    }
}

fn majority(successful: &[&CriticOutput], safe_default_verdict: Verdict) -> StrategyOutcome {
    if successful.is_empty() {
        return fail_safe(safe_default_verdict);
    }
    let mut counts: Vec<(Verdict, usize)> = Vec::new();
    for verdict in [Verdict::Allow, Verdict::Deny, Verdict::Review, Verdict::Escalate] {
        let count = successful.iter().filter(|o| o.verdict == verdict).count();
        if count > 0 {
            counts.push((verdict, count));
        }
    }
    let (winner, winning_count) = counts
        .iter()
        .max_by(|(va, ca), (vb, cb)| {
            ca.cmp(cb).then(va.conservatism_rank().cmp(&vb.conservatism_rank()))
        })
        .copied()
        .unwrap_or((safe_default_verdict, 0));
    let confidence = (winning_count as f64 / successful.len() as f64) * 0.8;
    let alternatives: Vec<Verdict> = counts.iter().map(|(v, _)| *v).filter(|v| *v != winner).collect();
    StrategyOutcome {
        verdict: winner,
        confidence,
        reason: format!("majority strategy: {winning_count}/{} successful critics agreed", successful.len()),
        requires_human_review: winner != Verdict::Allow,
        warnings: vec![],
        alternative_verdicts: alternatives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn out(verdict: Verdict, confidence: f64) -> CriticOutput {
        CriticOutput {
            critic: "c".into(),
            verdict,
            confidence,
            justification: "because".into(),
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
    fn conservative_picks_most_restrictive_and_scales_confidence() {
        let outputs = vec![out(Verdict::Allow, 0.9), out(Verdict::Deny, 0.7)];
        let outcome = apply(FallbackStrategy::Conservative, &outputs, Verdict::Review);
        assert_eq!(outcome.verdict, Verdict::Deny);
        assert!((outcome.confidence - 0.56).abs() < 1e-9);
    }

    #[test]
    fn permissive_prefers_allow_when_present() {
        let outputs = vec![out(Verdict::Allow, 0.5), out(Verdict::Review, 0.9)];
        let outcome = apply(FallbackStrategy::Permissive, &outputs, Verdict::Review);
        assert_eq!(outcome.verdict, Verdict::Allow);
        assert!(!outcome.warnings.is_empty());
    }

    #[test]
    fn majority_falls_through_to_fail_safe_when_empty() {
        let outcome = apply(FallbackStrategy::Majority, &[], Verdict::Review);
        assert_eq!(outcome.verdict, Verdict::Review);
        assert_eq!(outcome.confidence, 0.5);
    }

    #[test]
    fn escalate_always_reviews() {
        let outputs = vec![out(Verdict::Allow, 0.99)];
        let outcome = apply(FallbackStrategy::Escalate, &outputs, Verdict::Review);
        assert_eq!(outcome.verdict, Verdict::Review);
        assert!(outcome.requires_human_review);
    }
}
