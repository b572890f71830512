//! governance/mod.rs
//! Governance rule layer (spec §4.4): lexicographic rights hierarchy
//! evaluated over the aggregator's proposed verdict.

pub mod mode;
pub mod rights;

use serde::{Deserialize, Serialize};

use crate::aggregator::AggregationResult;
use crate::config::GovernanceConfig;
use crate::error::{EjeError, EjeResult};
use crate::model::critic_output::{CriticOutput, Verdict};

pub use mode::{evaluate_mode_compliance, ModeComplianceReport};
pub use rights::RightReport;

/// Override block attached once a human has revised a decision (spec §4.6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OverrideRecord {
    pub override_id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub override_by: OverrideBy,
    pub justification: String,
    pub reason_category: String,
    pub original_outcome: Verdict,
    pub proposed_outcome: Verdict,
    pub is_urgent: bool,
    pub priority: u8,
    #[serde(default)]
    pub supporting_documents: Vec<String>,
    #[serde(default)]
    pub stakeholder_input: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OverrideBy {
    pub reviewer_id: String,
    pub reviewer_role: crate::model::override_request::ReviewerRole,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GovernanceOutcome {
    pub verdict: Verdict,
    pub safeguards_triggered: Vec<String>,
    pub escalate: bool,
    pub fairness_penalty: bool,
    pub advisory_warnings: Vec<String>,
    #[serde(default)]
    pub human_modified: bool,
    #[serde(default)]
    pub override_record: Option<OverrideRecord>,
}

/// Apply the lexicographic rights hierarchy of spec §4.4 to the
/// aggregator's output. Returns `Err(RightsViolation)` if a hard right is
/// flagged — no verdict is ever emitted in that case (spec §4.4 step 1,
/// §8 invariant 6).
pub fn evaluate(
    request_id: &str,
    config: &GovernanceConfig,
    aggregation: &AggregationResult,
    critic_outputs: &[CriticOutput],
    reports: &[RightReport],
) -> EjeResult<GovernanceOutcome> {
    let mut safeguards_triggered = Vec::new();
    let mut advisory_warnings = Vec::new();
    let mut escalate = false;
    let mut fairness_penalty = false;

    for right in &config.rights_hierarchy {
        let flagged = reports.iter().find(|r| r.right == right.name && r.violated);
        let Some(flagged) = flagged else { continue };

        if right.required {
            return Err(EjeError::RightsViolation {
                right: right.name.clone(),
                request_id: request_id.to_string(),
                evidence: flagged.evidence.clone(),
            });
        }

        match right.name.as_str() {
            "safety" => {
                escalate = true;
                safeguards_triggered.push("safety".to_string());
            }
            "fairness" => {
                fairness_penalty = true;
                safeguards_triggered.push("fairness".to_string());
            }
            "transparency" | "proportionality" => {
                safeguards_triggered.push(right.name.clone());
                advisory_warnings.push(format!("{} flagged: {}", right.name, flagged.evidence));
            }
            other => {
                safeguards_triggered.push(other.to_string());
            }
        }
    }

    // Uncertainty and precedent-conflict checks (spec §4.4 steps 5-6) ride
    // on the same `RightReport` collection, matched by a synthetic name so
    // callers don't need a separate data path for them.
    if let Some(uncertainty) = reports.iter().find(|r| r.right == "uncertainty") {
        if let Some(score) = uncertainty.confidence_score {
            if score < 0.4 {
                escalate = true;
            }
        }
    }
    if reports.iter().any(|r| r.right == "precedent_conflict" && r.violated) {
        escalate = true;
    }

    Ok(GovernanceOutcome {
        verdict: aggregation.overall_verdict,
        safeguards_triggered,
        escalate,
        fairness_penalty,
        advisory_warnings,
        human_modified: false,
        override_record: None,
    })
}
