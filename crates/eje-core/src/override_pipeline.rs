//! override_pipeline.rs
//! Apply a validated human override to a Decision (spec §4.6).

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditLog};
use crate::error::{EjeError, EjeResult};
use crate::governance::{OverrideBy, OverrideRecord};
use crate::model::decision::Decision;
use crate::model::override_request::OverrideRequest;

/// Status of a single override within a batch (SPEC_FULL §2 supplement:
/// distinguishes "applied" from "rejected at validation" without callers
/// inspecting error variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideStatus {
    Proposed,
    Applied,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub preserve_original: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self { preserve_original: true }
    }
}

/// `Validate(decision, request)` (spec §4.6).
pub fn validate(decision: &Decision, request: &OverrideRequest) -> EjeResult<()> {
    request.validate_fields()?;

    if request.is_expired(Utc::now()) {
        return Err(EjeError::OverrideValidation {
            request_id: request.request_id.to_string(),
            reason: "override request has expired".to_string(),
        });
    }
    if request.decision_id != decision.decision_id {
        return Err(EjeError::OverrideValidation {
            request_id: request.request_id.to_string(),
            reason: format!(
                "request targets decision {} but was validated against {}",
                request.decision_id, decision.decision_id
            ),
        });
    }
    if let Some(original) = request.original_outcome {
        if original != decision.current_verdict() {
            return Err(EjeError::OverrideValidation {
                request_id: request.request_id.to_string(),
                reason: format!(
                    "request's original_outcome {original:?} does not match current verdict {:?}",
                    decision.current_verdict()
                ),
            });
        }
    }
    Ok(())
}

fn apply_fields(target: &mut Decision, request: &OverrideRequest) {
    let pre_override_verdict = target.governance_outcome.verdict;
    let was_escalated_before = pre_override_verdict == crate::model::critic_output::Verdict::Escalate;

    target.governance_outcome.verdict = request.proposed_outcome;
    target.governance_outcome.human_modified = true;
    target.governance_outcome.override_record = Some(OverrideRecord {
        override_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        override_by: OverrideBy {
            reviewer_id: request.reviewer_id.clone(),
            reviewer_role: request.reviewer_role,
            name: request.reviewer_name.clone(),
            email: request.reviewer_email.clone(),
        },
        justification: request.justification.clone(),
        reason_category: request.reason_category.clone(),
        original_outcome: pre_override_verdict,
        proposed_outcome: request.proposed_outcome,
        is_urgent: request.is_urgent,
        priority: request.priority,
        supporting_documents: request.supporting_documents.clone(),
        stakeholder_input: request.stakeholder_input.clone(),
    });

    if request.proposed_outcome == crate::model::critic_output::Verdict::Escalate || was_escalated_before {
        target.escalated = true;
    }
}

/// `Apply(decision, request, {preserve_original})` (spec §4.6). When
/// `preserve_original` is true, `decision` is left untouched and the
/// updated state is returned as a copy; when false, `decision` itself is
/// updated in place (for callers that already hold the only live
/// reference, e.g. a batch's `decisions_by_id` entry) and the same state
/// is returned for API consistency.
pub fn apply(decision: &mut Decision, request: &OverrideRequest, opts: &ApplyOptions) -> EjeResult<Decision> {
    validate(decision, request)?;
    if opts.preserve_original {
        let mut target = decision.clone();
        apply_fields(&mut target, request);
        Ok(target)
    } else {
        apply_fields(decision, request);
        Ok(decision.clone())
    }
}

/// `LogEvent(decision', request) → event_bundle` (spec §4.6). Idempotent
/// under `request_id`: the event id is the request id, so a resubmitted
/// write to an idempotent store collapses to the same receipt.
pub fn log_event(decision: &Decision, request: &OverrideRequest, audit_log: &dyn AuditLog) -> EjeResult<()> {
    let override_record = decision
        .governance_outcome
        .override_record
        .as_ref()
        .ok_or_else(|| EjeError::OverrideValidation {
            request_id: request.request_id.to_string(),
            reason: "decision carries no override record to log".to_string(),
        })?;

    let payload = json!({
        "event_type": "override_applied",
        "event_id": request.request_id,
        "decision_id": decision.decision_id,
        "request_timestamp": request.timestamp,
        "applied_timestamp": override_record.timestamp,
        "reviewer": {
            "id": override_record.override_by.reviewer_id,
            "name": override_record.override_by.name,
            "role": override_record.override_by.reviewer_role,
            "email": override_record.override_by.email,
        },
        "justification": override_record.justification,
        "reason_category": override_record.reason_category,
        "outcome_change": {
            "original": override_record.original_outcome,
            "proposed": override_record.proposed_outcome,
            "current": decision.current_verdict(),
        },
        "escalation_status": decision.escalated,
        "decision_snapshot": {
            "aggregation_verdict": decision.aggregation.overall_verdict,
            "critic_count": decision.bundle.critic_outputs.len(),
            "precedent_count": decision.precedents.len(),
        },
    });

    audit_log
        .write_signed(AuditEvent {
            event_id: request.request_id.to_string(),
            request_id: decision.bundle.metadata.correlation_id.clone(),
            event_type: "override_applied".to_string(),
            timestamp: Utc::now(),
            payload,
        })
        .map(|_| ())
}

#[derive(Debug, Clone)]
pub struct BatchError {
    pub request_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub applied: usize,
    pub rejected: usize,
    pub statuses: HashMap<Uuid, OverrideStatus>,
    pub errors: Vec<BatchError>,
}

/// `ApplyBatch(decisions_by_id, batch, {continue_on_error})` (spec §4.6).
pub fn apply_batch(
    decisions_by_id: &mut HashMap<Uuid, Decision>,
    batch: &[OverrideRequest],
    continue_on_error: bool,
    audit_log: &dyn AuditLog,
) -> EjeResult<BatchSummary> {
    let mut summary = BatchSummary {
        applied: 0,
        rejected: 0,
        statuses: HashMap::new(),
        errors: Vec::new(),
    };

    for request in batch {
        summary.statuses.insert(request.request_id, OverrideStatus::Proposed);

        let Some(decision) = decisions_by_id.get_mut(&request.decision_id) else {
            summary.rejected += 1;
            summary.statuses.insert(request.request_id, OverrideStatus::Rejected);
            let err = BatchError {
                request_id: request.request_id,
                error: format!("no decision found for decision_id {}", request.decision_id),
            };
            if !continue_on_error {
                return Err(EjeError::OverrideValidation {
                    request_id: request.request_id.to_string(),
                    reason: err.error,
                });
            }
            summary.errors.push(err);
            continue;
        };

        match apply(decision, request, &ApplyOptions { preserve_original: false }) {
            Ok(_) => {
                log_event(decision, request, audit_log)?;
                summary.applied += 1;
                summary.statuses.insert(request.request_id, OverrideStatus::Applied);
            }
            Err(e) => {
                summary.rejected += 1;
                summary.statuses.insert(request.request_id, OverrideStatus::Rejected);
                let err = BatchError { request_id: request.request_id, error: e.to_string() };
                if !continue_on_error {
                    return Err(e);
                }
                summary.errors.push(err);
            }
        }
    }

    Ok(summary)
}
