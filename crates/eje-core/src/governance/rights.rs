//! governance/rights.rs
//! A flagged-right report contributed by critics (spec §4.4). Critics are
//! out of scope plugins; this is the minimal shape the governance layer
//! needs from whatever a critic reported, derived from its
//! `evidence_sources` / `justification` by the caller building the pipeline.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RightReport {
    pub right: String,
    pub violated: bool,
    pub evidence: String,
    /// Only meaningful for the synthetic `"uncertainty"` right (spec §4.4
    /// step 5): the uncertainty-critic's own confidence score.
    #[serde(default)]
    pub confidence_score: Option<f64>,
}
