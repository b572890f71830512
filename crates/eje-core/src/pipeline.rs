//! pipeline.rs
//! Orchestrates the full request lifecycle (spec §2): normalize → run
//! critics → aggregate → apply governance → check fallback → persist.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::aggregator::{self, AggregationResult};
use crate::audit::{AuditEvent, AuditLog};
use crate::config::EngineConfig;
use crate::critic::{self, Critic, RetryPolicy, RunBudget};
use crate::error::EjeResult;
use crate::fallback;
use crate::governance::{self, GovernanceOutcome, RightReport};
use crate::model::decision::Decision;
use crate::model::evidence_bundle::Environment;
use crate::model::request::RequestMetadata;
use crate::normalizer::{self, NormalizeOptions, RawCriticOutput};
use crate::precedent::{PrecedentStore, RankedPrecedent, SearchOptions};

pub struct Engine {
    pub config: EngineConfig,
    pub critics: Vec<Arc<dyn Critic>>,
    pub audit_log: Arc<dyn AuditLog>,
    pub precedent_store: Option<Arc<dyn PrecedentStore>>,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub correlation_id: Option<String>,
    pub environment: Option<Environment>,
    /// Right-violation reports contributed by critics for this request
    /// (spec §4.4); the pipeline doesn't derive these from critic output
    /// itself since the mapping from a critic's own schema to a flagged
    /// right is plugin-specific.
    pub right_reports: Vec<RightReport>,
    pub expected_verdict: Option<crate::model::critic_output::Verdict>,
}

impl Engine {
    /// Process one request end to end. Returns the finished `Decision`,
    /// which already carries any triggered fallback bundle and any
    /// precedents surfaced by the configured store.
    pub async fn process(
        &self,
        text: &str,
        context: Value,
        metadata: RequestMetadata,
        options: ProcessOptions,
    ) -> EjeResult<Decision> {
        let request_id = Uuid::new_v4().to_string();
        let correlation_id = options.correlation_id.unwrap_or_else(|| request_id.clone());

        let budget = RunBudget::default();
        let retry_policy = RetryPolicy::default();

        let run_result =
            critic::run_all(text, &context, &self.critics, budget, retry_policy).await;

        let raw_outputs: Vec<RawCriticOutput> = run_result
            .outputs
            .iter()
            .map(|o| RawCriticOutput {
                critic: o.critic.clone(),
                verdict: Some(o.verdict),
                confidence: Some(o.confidence),
                justification: Some(o.justification.clone()),
                weight: Some(o.weight),
                priority: o.priority,
                evidence_sources: o.evidence_sources.clone(),
                config_version: o.config_version.clone(),
                error_type: o.error_type.clone(),
                attempted_retries: o.attempted_retries,
                completion_rank: o.completion_rank,
            })
            .collect();

        let bundle = normalizer::normalize(
            text,
            context,
            metadata,
            raw_outputs,
            NormalizeOptions {
                correlation_id: Some(correlation_id.clone()),
                precedent_refs: Vec::new(),
                processing_time_ms: Some(run_result.elapsed_ms),
                environment: options.environment,
                system_version: None,
            },
        )?;

        let aggregation: AggregationResult = aggregator::aggregate(&bundle.critic_outputs);

        let governance_outcome: GovernanceOutcome = governance::evaluate(
            &request_id,
            &self.config.governance,
            &aggregation,
            &bundle.critic_outputs,
            &options.right_reports,
        )?;

        let fallback_result = fallback::check_and_apply(
            &bundle.critic_outputs,
            Some(&aggregation),
            Some(run_result.elapsed_ms),
            &bundle.validation_errors,
            &self.config.fallback,
            &request_id,
            &correlation_id,
            bundle.metadata.environment,
            &bundle.metadata.system_version,
        );

        let final_governance = if fallback_result.triggered {
            let fb = fallback_result.bundle.as_ref().unwrap();
            GovernanceOutcome { verdict: fb.fallback_decision.verdict, ..governance_outcome }
        } else {
            governance_outcome
        };

        let escalated = final_governance.escalate || final_governance.verdict == crate::model::critic_output::Verdict::Escalate;

        let precedents = self.search_precedents(text, &bundle.input_snapshot.context_hash, options.expected_verdict);

        let decision = Decision {
            decision_id: Uuid::new_v4(),
            bundle,
            aggregation,
            governance_outcome: final_governance,
            escalated,
            precedents: precedents.iter().map(|r| crate::model::evidence_bundle::PrecedentRef {
                precedent_id: r.precedent.precedent_id.clone(),
                similarity_score: r.similarity,
                influence_weight: r.scores.combined,
            }).collect(),
            fallback: fallback_result.bundle,
        };

        self.audit_log.write_signed(AuditEvent {
            event_id: decision.decision_id.to_string(),
            request_id: request_id.clone(),
            event_type: "decision_recorded".to_string(),
            timestamp: chrono::Utc::now(),
            payload: serde_json::json!({
                "verdict": decision.current_verdict(),
                "escalated": decision.escalated,
            }),
        })?;

        if let Some(store) = &self.precedent_store {
            store.store(&decision)?;
        }

        Ok(decision)
    }

    fn search_precedents(
        &self,
        text: &str,
        case_hash: &str,
        expected_verdict: Option<crate::model::critic_output::Verdict>,
    ) -> Vec<RankedPrecedent> {
        let Some(store) = &self.precedent_store else { return Vec::new() };
        if !self.config.precedent.enabled {
            return Vec::new();
        }
        let options = SearchOptions { limit: self.config.precedent.limit, ..SearchOptions::default() };
        let raw = match store.search_similar(case_hash, text, &options) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "precedent search failed; continuing without precedents");
                return Vec::new();
            }
        };
        crate::precedent::rank_hybrid(raw, expected_verdict, chrono::Utc::now(), &self.config.precedent)
    }
}
