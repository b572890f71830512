//! model/mod.rs
//! The canonical data carriers (spec §3), re-exported flat for callers.

pub mod request;
pub mod critic_output;
pub mod evidence_bundle;
pub mod decision;
pub mod override_request;
pub mod fallback_bundle;

pub use critic_output::{CriticOutput, EvidenceSource, EvidenceSourceKind, Priority, Verdict};
pub use decision::Decision;
pub use evidence_bundle::{
    ConfidenceAssessment, ConflictingEvidence, ConsensusLevel, EvidenceBundle, Flags,
    JustificationSynthesis, Metadata, PrecedentRef, Severity, ValidationError,
};
pub use fallback_bundle::{
    FailedCriticInfo, FallbackDecision, FallbackEvidenceBundle, FallbackType, SystemStateAtTrigger,
};
pub use override_request::{OverrideRequest, ReviewerRole};
pub use request::{InputSnapshot, RequestMetadata};
