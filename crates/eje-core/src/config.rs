//! config.rs
//! Configuration surface (spec §6). Mirrors the teacher's `CoreConfig`:
//! an optional TOML file, every field defaulted via `#[serde(default = ...)]`
//! so a missing file or missing key never fails a load.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EjeError, EjeResult};
use crate::fallback::strategy::FallbackStrategy;
use crate::model::critic_output::Verdict;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub governance: GovernanceConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub precedent: PrecedentConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub governance_mode: GovernanceModeConfig,
}

impl EngineConfig {
    /// Load `path/eje.toml` if present, else fall back to defaults
    /// end to end (never fails just because the file is absent).
    pub fn load(dir: &Path) -> EjeResult<Self> {
        let path = dir.join("eje.toml");
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file found, using EngineConfig::default()");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| EjeError::Configuration {
            message: format!("reading {}: {e}", path.display()),
        })?;
        toml::from_str(&text).map_err(|e| EjeError::Configuration {
            message: format!("parsing {}: {e}", path.display()),
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            governance: GovernanceConfig::default(),
            fallback: FallbackConfig::default(),
            precedent: PrecedentConfig::default(),
            audit: AuditConfig::default(),
            governance_mode: GovernanceModeConfig::default(),
        }
    }
}

/// One entry of the lexicographic rights hierarchy (spec §4.4).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RightEntry {
    pub name: String,
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GovernanceConfig {
    #[serde(default = "GovernanceConfig::default_hierarchy")]
    pub rights_hierarchy: Vec<RightEntry>,
}

impl GovernanceConfig {
    fn default_hierarchy() -> Vec<RightEntry> {
        vec![
            RightEntry { name: "dignity".into(), required: true },
            RightEntry { name: "autonomy".into(), required: true },
            RightEntry { name: "non_discrimination".into(), required: true },
            RightEntry { name: "safety".into(), required: false },
            RightEntry { name: "fairness".into(), required: false },
            RightEntry { name: "transparency".into(), required: false },
            RightEntry { name: "proportionality".into(), required: false },
        ]
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self { rights_hierarchy: Self::default_hierarchy() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackConfig {
    #[serde(default = "FallbackConfig::default_strategy")]
    pub default_strategy: FallbackStrategy,
    #[serde(default = "FallbackConfig::default_error_rate_threshold")]
    pub error_rate_threshold: f64,
    #[serde(default)]
    pub timeout_threshold_ms: Option<u64>,
    #[serde(default = "FallbackConfig::default_min_successful_critics")]
    pub min_successful_critics: usize,
    #[serde(default)]
    pub critical_critics: Vec<String>,
    #[serde(default = "FallbackConfig::default_safe_verdict")]
    pub safe_default_verdict: Verdict,
    #[serde(default = "FallbackConfig::default_enable_audit_bundles")]
    pub enable_audit_bundles: bool,
}

impl FallbackConfig {
    fn default_strategy() -> FallbackStrategy {
        FallbackStrategy::Conservative
    }
    fn default_error_rate_threshold() -> f64 {
        0.5
    }
    fn default_min_successful_critics() -> usize {
        1
    }
    fn default_safe_verdict() -> Verdict {
        Verdict::Review
    }
    fn default_enable_audit_bundles() -> bool {
        true
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            default_strategy: Self::default_strategy(),
            error_rate_threshold: Self::default_error_rate_threshold(),
            timeout_threshold_ms: None,
            min_successful_critics: Self::default_min_successful_critics(),
            critical_critics: Vec::new(),
            safe_default_verdict: Self::default_safe_verdict(),
            enable_audit_bundles: Self::default_enable_audit_bundles(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrecedentBackend {
    Vector,
    File,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrecedentConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "PrecedentConfig::default_backend")]
    pub backend: PrecedentBackend,
    #[serde(default = "PrecedentConfig::default_min_similarity")]
    pub min_similarity: f64,
    #[serde(default = "PrecedentConfig::default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default = "PrecedentConfig::default_recency_decay_days")]
    pub recency_decay_days: f64,
    #[serde(default = "PrecedentConfig::default_weight_similarity")]
    pub weight_similarity: f64,
    #[serde(default = "PrecedentConfig::default_weight_recency")]
    pub weight_recency: f64,
    #[serde(default = "PrecedentConfig::default_weight_confidence")]
    pub weight_confidence: f64,
    #[serde(default = "PrecedentConfig::default_weight_outcome")]
    pub weight_outcome: f64,
}

impl PrecedentConfig {
    fn default_backend() -> PrecedentBackend {
        PrecedentBackend::File
    }
    fn default_min_similarity() -> f64 {
        0.0
    }
    fn default_limit() -> usize {
        10
    }
    fn default_recency_decay_days() -> f64 {
        365.0
    }
    fn default_weight_similarity() -> f64 {
        0.6
    }
    fn default_weight_recency() -> f64 {
        0.2
    }
    fn default_weight_confidence() -> f64 {
        0.15
    }
    fn default_weight_outcome() -> f64 {
        0.05
    }
}

impl Default for PrecedentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: Self::default_backend(),
            min_similarity: Self::default_min_similarity(),
            limit: Self::default_limit(),
            embedding_model: None,
            recency_decay_days: Self::default_recency_decay_days(),
            weight_similarity: Self::default_weight_similarity(),
            weight_recency: Self::default_weight_recency(),
            weight_confidence: Self::default_weight_confidence(),
            weight_outcome: Self::default_weight_outcome(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub db_uri: Option<String>,
    #[serde(default = "AuditConfig::default_enable_signing")]
    pub enable_signing: bool,
}

impl AuditConfig {
    fn default_enable_signing() -> bool {
        true
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { db_uri: None, enable_signing: Self::default_enable_signing() }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceMode {
    Default,
    EuAiAct,
    Oecd,
    UnGlobal,
    NistRmf,
    KoreaBasic,
    JapanSociety5,
}

impl Default for GovernanceMode {
    fn default() -> Self {
        GovernanceMode::Default
    }
}

/// Per-mode compliance thresholds (spec §4.4 "Mode overlay").
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModeThresholds {
    #[serde(default)]
    pub requires_human_review: bool,
    #[serde(default)]
    pub explainability_required: bool,
    #[serde(default)]
    pub requires_risk_assessment: bool,
    #[serde(default)]
    pub requires_impact_assessment: bool,
    #[serde(default = "ModeThresholds::default_min_explanation_depth")]
    pub min_explanation_depth: usize,
}

impl ModeThresholds {
    fn default_min_explanation_depth() -> usize {
        1
    }
}

impl Default for ModeThresholds {
    fn default() -> Self {
        Self {
            requires_human_review: false,
            explainability_required: false,
            requires_risk_assessment: false,
            requires_impact_assessment: false,
            min_explanation_depth: Self::default_min_explanation_depth(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GovernanceModeConfig {
    #[serde(default)]
    pub mode: GovernanceMode,
    /// Hard-block on non-compliance. Off by default per spec §9 open question (b).
    #[serde(default)]
    pub hard_block_on_noncompliance: bool,
    #[serde(default)]
    pub thresholds: BTreeMap<String, ModeThresholds>,
}

impl Default for GovernanceModeConfig {
    fn default() -> Self {
        Self {
            mode: GovernanceMode::Default,
            hard_block_on_noncompliance: false,
            thresholds: BTreeMap::new(),
        }
    }
}

impl GovernanceModeConfig {
    pub fn active_thresholds(&self) -> ModeThresholds {
        let key = format!("{:?}", self.mode);
        self.thresholds.get(&key).cloned().unwrap_or_default()
    }
}
