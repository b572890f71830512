//! model/decision.rs
//! Wraps an evidence bundle with the aggregator and governance outputs
//! (spec §3.4). A Decision owns exactly one EvidenceBundle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::evidence_bundle::{EvidenceBundle, PrecedentRef};
use super::fallback_bundle::FallbackEvidenceBundle;
use crate::aggregator::AggregationResult;
use crate::governance::GovernanceOutcome;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Decision {
    pub decision_id: Uuid,
    pub bundle: EvidenceBundle,
    pub aggregation: AggregationResult,
    pub governance_outcome: GovernanceOutcome,
    #[serde(default)]
    pub escalated: bool,
    #[serde(default)]
    pub precedents: Vec<PrecedentRef>,
    #[serde(default)]
    pub fallback: Option<FallbackEvidenceBundle>,
}

impl Decision {
    pub fn current_verdict(&self) -> crate::model::critic_output::Verdict {
        self.governance_outcome.verdict
    }

    pub fn is_human_modified(&self) -> bool {
        self.governance_outcome.human_modified
    }
}
