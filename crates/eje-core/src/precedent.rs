//! precedent.rs
//! Precedent store contract (spec §4.7): interface only, plus the hybrid
//! similarity ranker the core applies when a store exposes raw similarity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PrecedentConfig;
use crate::error::EjeResult;
use crate::model::critic_output::Verdict;
use crate::model::decision::Decision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    Cosine,
    Euclidean,
    Dot,
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub domain: Option<String>,
    pub verdict: Option<Verdict>,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub min_similarity: f64,
    pub filters: SearchFilters,
    pub metric: SimilarityMetric,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_similarity: 0.0,
            filters: SearchFilters::default(),
            metric: SimilarityMetric::Cosine,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Precedent {
    pub precedent_id: String,
    pub case_hash: String,
    pub text: String,
    pub verdict: Verdict,
    pub avg_confidence: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RankedPrecedent {
    pub precedent: Precedent,
    pub similarity: f64,
    pub scores: ScoreBreakdown,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreBreakdown {
    pub similarity: f64,
    pub recency: f64,
    pub confidence: f64,
    pub outcome_alignment: f64,
    pub combined: f64,
}

/// `PrecedentStore` of spec §4.7. Implementations (vector DB, file-backed
/// index, …) are external collaborators; the core depends only on this
/// interface.
pub trait PrecedentStore: Send + Sync {
    fn store(&self, decision: &Decision) -> EjeResult<String>;
    fn search_similar(
        &self,
        query_case_hash: &str,
        query_text: &str,
        options: &SearchOptions,
    ) -> EjeResult<Vec<(Precedent, f64)>>;
    fn get_by_id(&self, id: &str) -> EjeResult<Option<Precedent>>;
    fn delete(&self, id: &str) -> EjeResult<()>;
}

/// Combine a store's raw similarity scores with recency/confidence/outcome
/// alignment per the weighted formula of spec §4.7, deduplicate by
/// `precedent_id`, and cap at `config.limit`.
pub fn rank_hybrid(
    raw: Vec<(Precedent, f64)>,
    expected_verdict: Option<Verdict>,
    now: DateTime<Utc>,
    config: &PrecedentConfig,
) -> Vec<RankedPrecedent> {
    let total_weight =
        config.weight_similarity + config.weight_recency + config.weight_confidence + config.weight_outcome;
    let (w_sim, w_rec, w_conf, w_out) = if total_weight > 0.0 {
        (
            config.weight_similarity / total_weight,
            config.weight_recency / total_weight,
            config.weight_confidence / total_weight,
            config.weight_outcome / total_weight,
        )
    } else {
        (0.6, 0.2, 0.15, 0.05)
    };

    let mut seen = std::collections::HashSet::new();
    let mut ranked: Vec<RankedPrecedent> = Vec::new();

    for (precedent, similarity) in raw {
        if !seen.insert(precedent.precedent_id.clone()) {
            continue;
        }
        let age_days = (now - precedent.recorded_at).num_seconds() as f64 / 86_400.0;
        let half_life = config.recency_decay_days.max(1e-9);
        let recency = (-std::f64::consts::LN_2 * age_days.max(0.0) / half_life).exp();
        let confidence = precedent.avg_confidence.clamp(0.0, 1.0);
        let outcome_alignment = match expected_verdict {
            Some(expected) if expected == precedent.verdict => 1.0,
            Some(_) => 0.0,
            None => 0.5,
        };
        let combined =
            w_sim * similarity + w_rec * recency + w_conf * confidence + w_out * outcome_alignment;

        ranked.push(RankedPrecedent {
            precedent,
            similarity,
            scores: ScoreBreakdown { similarity, recency, confidence, outcome_alignment, combined },
        });
    }

    ranked.sort_by(|a, b| b.scores.combined.partial_cmp(&a.scores.combined).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(config.limit);
    ranked
}
