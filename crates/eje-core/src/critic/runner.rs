//! critic/runner.rs
//! Concurrent critic dispatch with per-critic and global timeouts
//! (spec §4.2, §5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::model::critic_output::CriticOutput;

use super::plugin::Critic;
use super::retry::{RetryPolicy, RetryableErrorKind};

#[derive(Debug, Clone, Copy)]
pub struct RunBudget {
    pub per_critic_timeout: Duration,
    pub global_timeout: Duration,
    pub max_parallelism: usize,
}

impl Default for RunBudget {
    fn default() -> Self {
        Self {
            per_critic_timeout: Duration::from_millis(2000),
            global_timeout: Duration::from_millis(5000),
            max_parallelism: 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PerCriticStats {
    pub critic: String,
    pub attempted_retries: u32,
    pub completion_rank: Option<usize>,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub outputs: Vec<CriticOutput>,
    pub elapsed_ms: f64,
    pub stats: Vec<PerCriticStats>,
}

/// `RunAll(req, critics[], budget) → (outputs[], elapsed_ms, per-critic_stats)`
/// (spec §4.2). Dispatches all critics concurrently bounded by
/// `max_parallelism`, enforces per-critic and global timeouts, isolates
/// panics per task, and returns outputs in the same slot order as
/// `critics[]` with `completion_rank` recorded separately (spec §5).
pub async fn run_all(
    text: &str,
    context: &serde_json::Value,
    critics: &[Arc<dyn Critic>],
    budget: RunBudget,
    retry_policy: RetryPolicy,
) -> RunResult {
    let started = Instant::now();
    let semaphore = Arc::new(Semaphore::new(budget.max_parallelism.max(1)));
    let mut join_set: JoinSet<(usize, CriticOutput, Duration)> = JoinSet::new();
    let mut task_indices: HashMap<tokio::task::Id, usize> = HashMap::new();

    for (index, critic) in critics.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let text = text.to_string();
        let context = context.clone();
        let per_critic_timeout = budget.per_critic_timeout;

        let handle = join_set.spawn(async move {
            let permit = semaphore.acquire_owned().await;
            let task_start = Instant::now();
            let output = run_one(&*critic, &text, &context, per_critic_timeout, retry_policy).await;
            drop(permit);
            (index, output, task_start.elapsed())
        });
        task_indices.insert(handle.id(), index);
    }

    let mut slots: Vec<Option<CriticOutput>> = (0..critics.len()).map(|_| None).collect();
    let mut stats: Vec<Option<PerCriticStats>> = (0..critics.len()).map(|_| None).collect();
    let mut rank = 0usize;

    let global_deadline = tokio::time::sleep(budget.global_timeout);
    tokio::pin!(global_deadline);

    loop {
        tokio::select! {
            biased;
            _ = &mut global_deadline => {
                break;
            }
            joined = join_set.join_next_with_id() => {
                match joined {
                    Some(Ok((_id, (index, mut output, duration)))) => {
                        output.completion_rank = Some(rank);
                        stats[index] = Some(PerCriticStats {
                            critic: output.critic.clone(),
                            attempted_retries: output.attempted_retries,
                            completion_rank: Some(rank),
                            duration,
                        });
                        slots[index] = Some(output);
                        rank += 1;
                    }
                    Some(Err(join_error)) => {
                        // A critic task panicked; isolate it as an ERROR output
                        // rather than letting the panic propagate (spec §4.2 step 5).
                        tracing::warn!(error = %join_error, "critic task panicked");
                        if let Some(&index) = task_indices.get(&join_error.id()) {
                            let critic_name = critics
                                .get(index)
                                .map(|c| c.name().to_string())
                                .unwrap_or_else(|| format!("critic_{index}"));
                            let output =
                                CriticOutput::error(critic_name.clone(), "panic", "critic task panicked", 0);
                            stats[index] = Some(PerCriticStats {
                                critic: critic_name,
                                attempted_retries: 0,
                                completion_rank: Some(rank),
                                duration: started.elapsed(),
                            });
                            slots[index] = Some(output);
                        }
                        rank += 1;
                    }
                    None => break,
                }
            }
        }
    }

    // Anything still outstanding at the global deadline is abandoned.
    join_set.abort_all();
    for (index, slot) in slots.iter_mut().enumerate() {
        if slot.is_none() {
            let critic_name = critics
                .get(index)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| format!("critic_{index}"));
            let output = CriticOutput::error(critic_name.clone(), "timeout", "global timeout exceeded", 0);
            stats[index] = Some(PerCriticStats {
                critic: critic_name,
                attempted_retries: 0,
                completion_rank: None,
                duration: started.elapsed(),
            });
            *slot = Some(output);
        }
    }

    let outputs: Vec<CriticOutput> = slots.into_iter().map(|s| s.unwrap()).collect();
    let stats: Vec<PerCriticStats> = stats.into_iter().map(|s| s.unwrap()).collect();

    RunResult { outputs, elapsed_ms: started.elapsed().as_secs_f64() * 1000.0, stats }
}

async fn run_one(
    critic: &dyn Critic,
    text: &str,
    context: &serde_json::Value,
    per_critic_timeout: Duration,
    retry_policy: RetryPolicy,
) -> CriticOutput {
    let mut attempt = 0u32;
    loop {
        let call = tokio::time::timeout(per_critic_timeout, critic.evaluate(text, context)).await;

        match call {
            Ok(Ok(verdict)) => {
                return CriticOutput {
                    critic: critic.name().to_string(),
                    verdict: verdict.verdict,
                    confidence: verdict.confidence,
                    justification: verdict.justification,
                    weight: verdict.weight,
                    priority: verdict.priority,
                    evidence_sources: verdict.evidence_sources,
                    config_version: verdict.config_version,
                    timestamp: chrono::Utc::now(),
                    error_type: None,
                    attempted_retries: attempt,
                    completion_rank: None,
                };
            }
            Ok(Err(e)) => {
                let error_type = format!("{:?}", e.kind());
                let kind = RetryableErrorKind::from_error_type(&error_type);
                if retry_policy.should_retry(kind, attempt) {
                    tokio::time::sleep(retry_policy.backoff_for(attempt)).await;
                    attempt += 1;
                    continue;
                }
                return CriticOutput::error(critic.name(), error_type, e.to_string(), attempt);
            }
            Err(_elapsed) => {
                return CriticOutput::error(
                    critic.name(),
                    "timeout",
                    format!("critic '{}' exceeded per-critic timeout", critic.name()),
                    attempt,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::critic::plugin::CriticVerdict;
    use crate::error::{EjeError, EjeResult};
    use crate::model::critic_output::Verdict;
    use async_trait::async_trait;

    struct AlwaysAllow;

    #[async_trait]
    impl Critic for AlwaysAllow {
        fn name(&self) -> &str {
            "always_allow"
        }
        async fn evaluate(&self, _text: &str, _context: &serde_json::Value) -> EjeResult<CriticVerdict> {
            Ok(CriticVerdict {
                verdict: Verdict::Allow,
                confidence: 0.9,
                justification: "looks fine".to_string(),
                weight: 1.0,
                priority: None,
                evidence_sources: vec![],
                config_version: None,
            })
        }
    }

    struct AlwaysSlow;

    #[async_trait]
    impl Critic for AlwaysSlow {
        fn name(&self) -> &str {
            "always_slow"
        }
        async fn evaluate(&self, _text: &str, _context: &serde_json::Value) -> EjeResult<CriticVerdict> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(CriticVerdict {
                verdict: Verdict::Allow,
                confidence: 0.9,
                justification: "eventually fine".to_string(),
                weight: 1.0,
                priority: None,
                evidence_sources: vec![],
                config_version: None,
            })
        }
    }

    struct AlwaysErrors;

    #[async_trait]
    impl Critic for AlwaysErrors {
        fn name(&self) -> &str {
            "always_errors"
        }
        async fn evaluate(&self, _text: &str, _context: &serde_json::Value) -> EjeResult<CriticVerdict> {
            Err(EjeError::PluginLoad { module: "x".into(), detail: "boom".into() })
        }
    }

    #[tokio::test]
    async fn stable_slot_ordering_matches_input_order() {
        let critics: Vec<Arc<dyn Critic>> = vec![Arc::new(AlwaysAllow), Arc::new(AlwaysErrors)];
        let result = run_all(
            "hi",
            &serde_json::json!({}),
            &critics,
            RunBudget::default(),
            RetryPolicy::default(),
        )
        .await;
        assert_eq!(result.outputs.len(), 2);
        assert_eq!(result.outputs[0].critic, "always_allow");
        assert_eq!(result.outputs[1].critic, "always_errors");
    }

    #[tokio::test]
    async fn per_critic_timeout_yields_timeout_error() {
        let critics: Vec<Arc<dyn Critic>> = vec![Arc::new(AlwaysSlow)];
        let budget = RunBudget {
            per_critic_timeout: Duration::from_millis(50),
            global_timeout: Duration::from_millis(1000),
            max_parallelism: 1,
        };
        let result = run_all("hi", &serde_json::json!({}), &critics, budget, RetryPolicy::default()).await;
        assert!(result.outputs[0].is_timeout());
    }

    #[tokio::test]
    async fn global_timeout_abandons_outstanding_critics() {
        let critics: Vec<Arc<dyn Critic>> = vec![Arc::new(AlwaysSlow), Arc::new(AlwaysAllow)];
        let budget = RunBudget {
            per_critic_timeout: Duration::from_millis(2000),
            global_timeout: Duration::from_millis(50),
            max_parallelism: 2,
        };
        let result = run_all("hi", &serde_json::json!({}), &critics, budget, RetryPolicy::default()).await;
        assert_eq!(result.outputs.len(), 2);
        assert!(result.outputs.iter().any(|o| o.is_timeout()));
    }
}
