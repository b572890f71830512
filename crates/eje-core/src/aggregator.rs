//! aggregator.rs
//! Folds critic outputs into a proposed verdict and statistics (spec §4.3).
//! Pure and non-suspending (spec §5).

use serde::{Deserialize, Serialize};

use crate::model::critic_output::{CriticOutput, Priority, Verdict};
use crate::model::evidence_bundle::ConsensusLevel;

/// Recorded when priority markers conflict (spec §4.3 step 2, and the
/// veto/override precedence note in spec §9 open question (a)).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriorityEvent {
    /// Two (or more) successful outputs claimed `priority=override` with
    /// different verdicts; resolution fell through to the weighted tally.
    ConflictingOverrides { critics: Vec<String> },
    /// Both an `override` (non-DENY) and a `veto` (DENY) were present on the
    /// same request; veto wins per spec §4.3 step 2, but the conflict is
    /// still recorded for auditability (§9 open question (a)).
    OverrideVetoConflict { override_critic: String, veto_critic: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregationResult {
    pub overall_verdict: Verdict,
    pub avg_confidence: f64,
    pub confidence_variance: f64,
    pub consensus_level: ConsensusLevel,
    pub ambiguity: f64,
    pub verdict_distribution: Vec<(Verdict, f64)>,
    pub priority_events: Vec<PriorityEvent>,
}

/// Fold a slice of critic outputs per spec §4.3's algorithm.
pub fn aggregate(outputs: &[CriticOutput]) -> AggregationResult {
    let successful: Vec<&CriticOutput> = outputs.iter().filter(|o| o.is_successful()).collect();

    let mut priority_events = Vec::new();

    if successful.is_empty() {
        return AggregationResult {
            overall_verdict: Verdict::Review,
            avg_confidence: 0.0,
            confidence_variance: 0.0,
            consensus_level: ConsensusLevel::Conflicted,
            ambiguity: 1.0,
            verdict_distribution: Vec::new(),
            priority_events,
        };
    }

    // Step 1: priority resolution.
    let veto = successful
        .iter()
        .find(|o| o.priority == Some(Priority::Veto) && o.verdict == Verdict::Deny);

    let overrides: Vec<&&CriticOutput> = successful
        .iter()
        .filter(|o| o.priority == Some(Priority::Override))
        .collect();

    let priority_verdict: Option<Verdict> = if let Some(vetoer) = veto {
        if let Some(first_override) = overrides.first() {
            if first_override.verdict != Verdict::Deny {
                priority_events.push(PriorityEvent::OverrideVetoConflict {
                    override_critic: first_override.critic.clone(),
                    veto_critic: vetoer.critic.clone(),
                });
            }
        }
        Some(Verdict::Deny)
    } else {
        let distinct_override_verdicts: std::collections::HashSet<Verdict> =
            overrides.iter().map(|o| o.verdict).collect();
        if overrides.len() == 1 {
            Some(overrides[0].verdict)
        } else if overrides.len() > 1 && distinct_override_verdicts.len() > 1 {
            priority_events.push(PriorityEvent::ConflictingOverrides {
                critics: overrides.iter().map(|o| o.critic.clone()).collect(),
            });
            None
        } else if overrides.len() > 1 {
            // Multiple overrides, but they all agree: honor the shared verdict.
            Some(overrides[0].verdict)
        } else {
            None
        }
    };

    // Step 4/5 stats computed regardless, since they're reported alongside
    // whatever verdict wins.
    let confidences: Vec<f64> = successful.iter().map(|o| o.confidence.clamp(0.0, 1.0)).collect();
    let avg_confidence = mean(&confidences);
    let confidence_variance = population_variance(&confidences, avg_confidence);

    // Verdict distribution over successful outputs (by share of weighted score,
    // used below for both the weighted tally and ambiguity).
    let mut scores: Vec<(Verdict, f64)> = Vec::new();
    for verdict in [Verdict::Allow, Verdict::Deny, Verdict::Review, Verdict::Escalate] {
        let score: f64 = successful
            .iter()
            .filter(|o| o.verdict == verdict)
            .map(|o| o.weight.max(0.0) * o.confidence.clamp(0.0, 1.0))
            .sum();
        if score > 0.0 || successful.iter().any(|o| o.verdict == verdict) {
            scores.push((verdict, score));
        }
    }

    let overall_verdict = priority_verdict.unwrap_or_else(|| weighted_argmax(&scores));

    let total_score: f64 = scores.iter().map(|(_, s)| s).sum();
    let verdict_distribution: Vec<(Verdict, f64)> = if total_score > 0.0 {
        scores.iter().map(|(v, s)| (*v, s / total_score)).collect()
    } else {
        // No confidence anywhere to weight by; fall back to a plain count share.
        let n = successful.len() as f64;
        [Verdict::Allow, Verdict::Deny, Verdict::Review, Verdict::Escalate]
            .into_iter()
            .map(|v| {
                let count = successful.iter().filter(|o| o.verdict == v).count() as f64;
                (v, if n > 0.0 { count / n } else { 0.0 })
            })
            .filter(|(_, share)| *share > 0.0)
            .collect()
    };

    let max_share = verdict_distribution.iter().map(|(_, s)| *s).fold(0.0_f64, f64::max);
    let ambiguity = 1.0 - max_share;

    let unique_verdicts: std::collections::HashSet<Verdict> =
        successful.iter().map(|o| o.verdict).collect();
    let consensus_level = if unique_verdicts.len() == 1 {
        ConsensusLevel::Unanimous
    } else if max_share >= 0.8 {
        ConsensusLevel::Strong
    } else if max_share >= 0.5 {
        ConsensusLevel::Moderate
    } else if has_unique_plurality(&verdict_distribution, max_share) {
        ConsensusLevel::Weak
    } else {
        ConsensusLevel::Conflicted
    };

    AggregationResult {
        overall_verdict,
        avg_confidence,
        confidence_variance,
        consensus_level,
        ambiguity,
        verdict_distribution,
        priority_events,
    }
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

fn population_variance(xs: &[f64], mean: f64) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64
    }
}

/// True if exactly one verdict holds the top share, i.e. there's a plurality
/// leader rather than a tie between two or more verdicts (spec §4.3 step 5:
/// "weak if majority plurality; conflicted if no majority").
fn has_unique_plurality(distribution: &[(Verdict, f64)], max_share: f64) -> bool {
    distribution.iter().filter(|(_, s)| (*s - max_share).abs() < 1e-9).count() == 1
}

/// Argmax over weighted scores, ties broken by the conservative ordering
/// (spec §4.3 step 3: "DENY > REVIEW > ALLOW > ESCALATE, DENY wins ties").
fn weighted_argmax(scores: &[(Verdict, f64)]) -> Verdict {
    scores
        .iter()
        .max_by(|(va, sa), (vb, sb)| {
            sa.partial_cmp(sb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(va.conservatism_rank().cmp(&vb.conservatism_rank()))
        })
        .map(|(v, _)| *v)
        .unwrap_or(Verdict::Review)
}
