//! model/evidence_bundle.rs
//! The atomic unit threaded through the pipeline (spec §3.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::critic_output::CriticOutput;
use super::request::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusLevel {
    Unanimous,
    Strong,
    Moderate,
    Weak,
    Conflicted,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfidenceAssessment {
    pub average: f64,
    pub variance: f64,
    pub consensus_level: ConsensusLevel,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConflictingEvidence {
    pub critics: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JustificationSynthesis {
    pub summary: String,
    #[serde(default)]
    pub supporting_evidence: Vec<String>,
    #[serde(default)]
    pub conflicting_evidence: Vec<ConflictingEvidence>,
    pub confidence_assessment: ConfidenceAssessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Development,
    Test,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrecedentRef {
    pub precedent_id: String,
    pub similarity_score: f64,
    pub influence_weight: f64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct Flags {
    #[serde(default)]
    pub requires_human_review: bool,
    #[serde(default)]
    pub is_override: bool,
    #[serde(default)]
    pub is_fallback: bool,
    #[serde(default)]
    pub is_test: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Metadata {
    pub system_version: String,
    #[serde(default)]
    pub environment: Environment,
    pub correlation_id: String,
    pub processing_time_ms: f64,
    #[serde(default)]
    pub critic_config_versions: Vec<(String, String)>,
    #[serde(default)]
    pub precedent_refs: Vec<PrecedentRef>,
    #[serde(default)]
    pub flags: Flags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub error: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvidenceBundle {
    pub bundle_id: Uuid,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub input_snapshot: InputSnapshot,
    pub critic_outputs: Vec<CriticOutput>,
    #[serde(default)]
    pub justification_synthesis: Option<JustificationSynthesis>,
    pub metadata: Metadata,
    #[serde(default)]
    pub validation_errors: Vec<ValidationError>,
}

impl EvidenceBundle {
    /// §3.3: "presence of any `severity=error` item forces fallback".
    pub fn has_fatal_validation_errors(&self) -> bool {
        self.validation_errors.iter().any(|e| e.severity == Severity::Error)
    }
}
