//! governance/mode.rs
//! Governance-mode compliance overlay (spec §4.4 "Mode overlay"). Advisory
//! by default: annotates a decision rather than blocking it, per spec §9
//! open question (b).

use serde::{Deserialize, Serialize};

use crate::config::{GovernanceModeConfig, ModeThresholds};
use crate::model::evidence_bundle::Flags;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModeComplianceReport {
    pub compliant: bool,
    pub missing: Vec<String>,
}

/// Check the decision's observable state against the active mode's
/// thresholds. `explanation_depth` is the number of justification
/// sentences/clauses the caller is prepared to supply; `has_risk_assessment`
/// / `has_impact_assessment` reflect whether those optional fields were
/// populated upstream.
pub fn evaluate_mode_compliance(
    cfg: &GovernanceModeConfig,
    flags: &Flags,
    explanation_depth: usize,
    has_risk_assessment: bool,
    has_impact_assessment: bool,
) -> ModeComplianceReport {
    let thresholds: ModeThresholds = cfg.active_thresholds();
    let mut missing = Vec::new();

    if thresholds.requires_human_review && !flags.requires_human_review {
        missing.push("human_review_flag".to_string());
    }
    if thresholds.explainability_required && explanation_depth < thresholds.min_explanation_depth {
        missing.push("explanation_depth".to_string());
    }
    if thresholds.requires_risk_assessment && !has_risk_assessment {
        missing.push("risk_assessment".to_string());
    }
    if thresholds.requires_impact_assessment && !has_impact_assessment {
        missing.push("impact_assessment".to_string());
    }

    ModeComplianceReport { compliant: missing.is_empty(), missing }
}
