//! model/critic_output.rs
//! Per-critic output (spec §3.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Allow,
    Deny,
    Review,
    Escalate,
    Error,
    Abstain,
}

impl Verdict {
    /// Conservative ordering used to break ties: DENY > REVIEW > ALLOW > ESCALATE
    /// (spec §4.3 step 3). Higher is more conservative / wins ties.
    pub fn conservatism_rank(self) -> u8 {
        match self {
            Verdict::Deny => 3,
            Verdict::Review => 2,
            Verdict::Allow => 1,
            Verdict::Escalate => 0,
            Verdict::Error | Verdict::Abstain => 0,
        }
    }

    pub fn is_decision_verdict(self) -> bool {
        matches!(self, Verdict::Allow | Verdict::Deny | Verdict::Review | Verdict::Escalate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Override,
    Veto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSourceKind {
    Policy,
    Precedent,
    Rule,
    ConstitutionalPrinciple,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvidenceSource {
    pub kind: EvidenceSourceKind,
    pub reference: String,
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CriticOutput {
    pub critic: String,
    pub verdict: Verdict,
    pub confidence: f64,
    pub justification: String,
    #[serde(default = "CriticOutput::default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub evidence_sources: Vec<EvidenceSource>,
    #[serde(default)]
    pub config_version: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub error_type: Option<String>,
    /// Number of retry attempts the runner made for this critic (spec §4.2
    /// retry policy). Not part of the wire contract a critic *returns*, but
    /// stamped on by the runner before the output is stored.
    #[serde(default)]
    pub attempted_retries: u32,
    /// Rank in which this output finished relative to its siblings
    /// (spec §5 "completion_rank"), stamped by the runner.
    #[serde(default)]
    pub completion_rank: Option<usize>,
}

impl CriticOutput {
    pub fn default_weight() -> f64 {
        1.0
    }

    /// Clamp confidence to [0, 1] (spec §9 "Numeric semantics").
    pub fn clamp_confidence(&mut self) {
        self.confidence = self.confidence.clamp(0.0, 1.0);
    }

    pub fn is_successful(&self) -> bool {
        !matches!(self.verdict, Verdict::Error | Verdict::Abstain)
    }

    pub fn is_timeout(&self) -> bool {
        self.verdict == Verdict::Error && self.error_type.as_deref() == Some("timeout")
    }

    pub fn error(critic: impl Into<String>, error_type: impl Into<String>, justification: impl Into<String>, attempted_retries: u32) -> Self {
        Self {
            critic: critic.into(),
            verdict: Verdict::Error,
            confidence: 0.0,
            justification: justification.into(),
            weight: Self::default_weight(),
            priority: None,
            evidence_sources: Vec::new(),
            config_version: None,
            timestamp: Utc::now(),
            error_type: Some(error_type.into()),
            attempted_retries,
            completion_rank: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conservative_ordering_denies_wins() {
        assert!(Verdict::Deny.conservatism_rank() > Verdict::Review.conservatism_rank());
        assert!(Verdict::Review.conservatism_rank() > Verdict::Allow.conservatism_rank());
        assert!(Verdict::Allow.conservatism_rank() > Verdict::Escalate.conservatism_rank());
    }

    #[test]
    fn error_output_has_zero_confidence() {
        let out = CriticOutput::error("c1", "timeout", "timed out after 500ms", 0);
        assert_eq!(out.confidence, 0.0);
        assert!(out.is_timeout());
        assert!(!out.is_successful());
    }
}
