use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use eje_core::audit::HashChainAuditLog;
use eje_core::config::EngineConfig;
use eje_core::critic::{Critic, CriticVerdict};
use eje_core::error::EjeResult;
use eje_core::model::critic_output::Verdict;
use eje_core::model::request::RequestMetadata;
use eje_core::pipeline::{Engine, ProcessOptions};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "eje", about = "Ethical Judgment Engine command-line front end")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run a single request through the adjudication pipeline
    Evaluate {
        /// Free-form request text
        text: String,
        #[arg(long)]
        context: Option<String>,
        #[arg(long, default_value = "./eje-data")]
        data_dir: PathBuf,
    },
}

/// A minimal keyword-triggered critic used as a placeholder plugin for the
/// CLI; production critics are out-of-scope plugins (spec §1).
struct KeywordSafetyCritic;

#[async_trait]
impl Critic for KeywordSafetyCritic {
    fn name(&self) -> &str {
        "keyword_safety"
    }

    async fn evaluate(&self, text: &str, _context: &Value) -> EjeResult<CriticVerdict> {
        let lowered = text.to_ascii_lowercase();
        let flagged = ["harm", "attack", "exploit"].iter().any(|w| lowered.contains(w));
        Ok(CriticVerdict {
            verdict: if flagged { Verdict::Deny } else { Verdict::Allow },
            confidence: if flagged { 0.8 } else { 0.6 },
            justification: if flagged {
                "request text contains a flagged keyword".to_string()
            } else {
                "no flagged keywords found".to_string()
            },
            weight: 1.0,
            priority: None,
            evidence_sources: vec![],
            config_version: Some("0.1.0".to_string()),
        })
    }
}

struct AlwaysReviewCritic;

#[async_trait]
impl Critic for AlwaysReviewCritic {
    fn name(&self) -> &str {
        "conservative_reviewer"
    }

    async fn evaluate(&self, _text: &str, _context: &Value) -> EjeResult<CriticVerdict> {
        Ok(CriticVerdict {
            verdict: Verdict::Review,
            confidence: 0.5,
            justification: "defers to human judgment by default".to_string(),
            weight: 0.5,
            priority: None,
            evidence_sources: vec![],
            config_version: Some("0.1.0".to_string()),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Evaluate { text, context, data_dir } => evaluate(&text, context.as_deref(), &data_dir).await,
    }
}

async fn evaluate(text: &str, context: Option<&str>, data_dir: &PathBuf) -> Result<()> {
    let config = EngineConfig::load(data_dir).context("loading engine config")?;
    let context_value: Value = match context {
        Some(raw) => serde_json::from_str(raw).context("parsing --context as JSON")?,
        None => serde_json::json!({}),
    };

    let audit_path = data_dir.join("audit.jsonl");
    let engine = Engine {
        config,
        critics: vec![Arc::new(KeywordSafetyCritic), Arc::new(AlwaysReviewCritic)],
        audit_log: Arc::new(HashChainAuditLog::new(audit_path)),
        precedent_store: None,
    };

    let decision = engine
        .process(text, context_value, RequestMetadata::default(), ProcessOptions::default())
        .await?;

    println!("{}", serde_json::to_string_pretty(&decision.current_verdict())?);
    println!("escalated: {}", decision.escalated);
    println!("critics consulted: {}", decision.bundle.critic_outputs.len());
    Ok(())
}
