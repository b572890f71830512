//! model/fallback_bundle.rs
//! Captures a fallback event (spec §3.6). Embedded in a Decision's metadata
//! whenever the fallback engine fires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::critic_output::{CriticOutput, Verdict};
use super::evidence_bundle::{Environment, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackType {
    AllCriticsFailed,
    MajorityCriticsFailed,
    CriticalCriticFailed,
    TimeoutExceeded,
    SchemaValidationFailed,
    InsufficientConfidence,
    HighErrorRate,
    ManualOverride,
    SystemError,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FailedCriticInfo {
    pub name: String,
    pub failure_reason: String,
    pub error_type: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub stack_trace: Option<String>,
    pub attempted_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemStateAtTrigger {
    pub total_expected: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: f64,
    #[serde(default)]
    pub timeout_threshold_ms: Option<u64>,
    pub active_critics: Vec<String>,
    pub request_id: String,
    pub correlation_id: String,
    pub environment: Environment,
    pub system_version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackDecision {
    pub verdict: Verdict,
    pub confidence: f64,
    pub strategy_used: String,
    pub reason: String,
    pub is_safe_default: bool,
    pub requires_human_review: bool,
    #[serde(default)]
    pub alternative_verdicts: Vec<Verdict>,
    pub decision_time_ms: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackEvidenceBundle {
    pub bundle_id: Uuid,
    pub fallback_type: FallbackType,
    pub failed_critics: Vec<FailedCriticInfo>,
    pub system_state_at_trigger: SystemStateAtTrigger,
    pub fallback_decision: FallbackDecision,
    #[serde(default)]
    pub successful_critic_outputs: Vec<CriticOutput>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<ValidationError>,
    #[serde(default)]
    pub recovery_attempted: bool,
    #[serde(default)]
    pub recovery_successful: bool,
    pub timestamp: DateTime<Utc>,
}
