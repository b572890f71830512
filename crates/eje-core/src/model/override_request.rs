//! model/override_request.rs
//! Human override request (spec §3.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::critic_output::Verdict;
use crate::error::{EjeError, EjeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerRole {
    SeniorReviewer,
    EthicsOfficer,
    LegalCounsel,
    TechnicalLead,
    GovernanceBoard,
    Auditor,
    SystemAdministrator,
}

const PLACEHOLDER_PATTERNS: &[&str] = &["todo", "tbd", "placeholder", "n/a", "tba", "xxx"];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OverrideRequest {
    pub request_id: Uuid,
    pub reviewer_id: String,
    pub reviewer_role: ReviewerRole,
    #[serde(default)]
    pub reviewer_name: Option<String>,
    #[serde(default)]
    pub reviewer_email: Option<String>,
    pub decision_id: Uuid,
    #[serde(default)]
    pub original_outcome: Option<Verdict>,
    pub proposed_outcome: Verdict,
    pub justification: String,
    pub reason_category: String,
    pub priority: u8,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub supporting_documents: Vec<String>,
    #[serde(default)]
    pub stakeholder_input: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl OverrideRequest {
    /// Construction-time validation (spec §3.5 invariants). Distinct from
    /// the pipeline's `Validate` (spec §4.6), which additionally checks
    /// the request against a specific `Decision`.
    pub fn validate_fields(&self) -> EjeResult<()> {
        let len = self.justification.chars().count();
        if !(10..=10000).contains(&len) {
            return Err(EjeError::OverrideValidation {
                request_id: self.request_id.to_string(),
                reason: format!("justification length {len} is outside [10, 10000]"),
            });
        }
        if self.justification.trim().is_empty() {
            return Err(EjeError::OverrideValidation {
                request_id: self.request_id.to_string(),
                reason: "justification is whitespace-only".to_string(),
            });
        }
        if len < 40 {
            let lowered = self.justification.to_ascii_lowercase();
            if PLACEHOLDER_PATTERNS.iter().any(|p| lowered.contains(p)) {
                return Err(EjeError::OverrideValidation {
                    request_id: self.request_id.to_string(),
                    reason: "justification looks like a placeholder".to_string(),
                });
            }
        }
        if self.priority > 10 {
            return Err(EjeError::OverrideValidation {
                request_id: self.request_id.to_string(),
                reason: format!("priority {} is outside [0, 10]", self.priority),
            });
        }
        if let Some(original) = self.original_outcome {
            if original == self.proposed_outcome {
                return Err(EjeError::OverrideValidation {
                    request_id: self.request_id.to_string(),
                    reason: "proposed_outcome must differ from original_outcome".to_string(),
                });
            }
        }
        if let Some(expires_at) = self.expires_at {
            if expires_at <= self.timestamp {
                return Err(EjeError::OverrideValidation {
                    request_id: self.request_id.to_string(),
                    reason: "expires_at must be strictly after timestamp".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }
}
