//! Batch scoring loop.
//!
//! Unscored records are fetched a batch at a time. Each batch fans out to a
//! bounded set of tasks (one backend call chain per record); the batch is
//! joined before any result is written and before the next fetch.

use super::prompt::build_prompt;
use super::response::{parse_score_response, ScoreParseError, ScoreResult};
use super::retry::{AttemptFailure, RetryPolicy};
use crate::job_store::{JobStore, UnscoredJob};
use crate::llm::{LlmError, LlmProvider};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Tunables for a scoring run.
#[derive(Debug, Clone)]
pub struct ScoringSettings {
    pub batch_size: usize,
    pub retry: RetryPolicy,
    /// Upper bound on concurrent backend calls, on top of the CPU-derived one.
    pub max_workers: Option<usize>,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            retry: RetryPolicy::default(),
            max_workers: None,
        }
    }
}

/// Counters for one scoring run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoringSummary {
    pub batches: usize,
    pub scored: usize,
    /// Records left unscored because they have no description.
    pub skipped: usize,
    /// Records left unscored after exhausting retries.
    pub failed: usize,
}

/// Result of scoring one record.
#[derive(Debug)]
enum Outcome {
    Scored(ScoreResult),
    Failed,
    /// The backend rejects our credentials; stop the run.
    Fatal(LlmError),
}

/// Worker count for a batch: one less than the available parallelism, never
/// more than the batch, never zero, optionally capped.
pub fn worker_count(batch_len: usize, available: usize, cap: Option<usize>) -> usize {
    let workers = available.saturating_sub(1).min(batch_len).max(1);
    match cap {
        Some(cap) => workers.min(cap.max(1)),
        None => workers,
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
}

async fn score_one(
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    job_id: String,
    prompt: String,
) -> Outcome {
    let mut attempt = 0u32;
    let mut last_raw: Option<String> = None;

    loop {
        attempt += 1;
        let failure = match provider.generate(&prompt).await {
            Ok(Some(raw)) => match parse_score_response(&raw) {
                Ok(result) => {
                    debug!(job_id = %job_id, attempt, "Parsed scores");
                    return Outcome::Scored(result);
                }
                Err(e) => {
                    if e.is_contract_violation() {
                        warn!(
                            job_id = %job_id,
                            attempt,
                            "Response violates the score contract ({}), payload: {}",
                            e,
                            raw
                        );
                    } else {
                        warn!(job_id = %job_id, attempt, "Could not parse response: {}", e);
                    }
                    last_raw = Some(raw);
                    AttemptFailure::Parse(e)
                }
            },
            Ok(None) => {
                warn!(job_id = %job_id, attempt, "Backend returned an empty response");
                AttemptFailure::Parse(ScoreParseError::Empty)
            }
            Err(e) if e.is_fatal() => return Outcome::Fatal(e),
            Err(e) => {
                warn!(job_id = %job_id, attempt, "Backend call failed: {}", e);
                AttemptFailure::Backend(e)
            }
        };

        if !retry.should_retry(&failure, attempt) {
            error!(
                job_id = %job_id,
                attempts = attempt,
                "Giving up on scoring ({}); raw response: {}",
                failure,
                last_raw.as_deref().unwrap_or("<none>")
            );
            return Outcome::Failed;
        }
        if let Some(delay) = retry.delay_before_retry(&failure) {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Scores every unscored record in the store.
pub struct JobScorer {
    store: Arc<dyn JobStore>,
    provider: Arc<dyn LlmProvider>,
    settings: ScoringSettings,
}

impl JobScorer {
    pub fn new(
        store: Arc<dyn JobStore>,
        provider: Arc<dyn LlmProvider>,
        settings: ScoringSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    /// Score until a fetch comes back empty.
    ///
    /// Per-record failures are contained; only store errors and a backend
    /// that rejects our credentials end the run with an error.
    pub async fn run(&self, profile: &str, resume_text: &str) -> Result<ScoringSummary> {
        let batch_size = self.settings.batch_size.max(1);
        let mut summary = ScoringSummary::default();
        let mut offset = 0usize;

        info!(
            "Scoring unscored jobs with {} ({}), batch size {}",
            self.provider.name(),
            self.provider.model(),
            batch_size
        );

        loop {
            let batch = self
                .store
                .get_unscored(batch_size, offset)
                .context("Failed to fetch unscored jobs")?;
            if batch.is_empty() {
                break;
            }
            summary.batches += 1;
            info!(
                "Batch {}: {} unscored jobs (offset {})",
                summary.batches,
                batch.len(),
                offset
            );

            let still_unscored = self
                .process_batch(batch, profile, resume_text, &mut summary)
                .await?;
            // Records that stay unscored keep their place at the head of the
            // unscored set; step over them
            offset += still_unscored;
        }

        info!(
            "Scoring complete: {} scored, {} skipped without description, {} failed",
            summary.scored, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Returns how many records of the batch remain unscored.
    async fn process_batch(
        &self,
        batch: Vec<UnscoredJob>,
        profile: &str,
        resume_text: &str,
        summary: &mut ScoringSummary,
    ) -> Result<usize> {
        let mut still_unscored = 0usize;
        let mut to_score = Vec::with_capacity(batch.len());

        for job in batch {
            match job.description.as_deref().map(str::trim) {
                Some(description) if !description.is_empty() => {
                    let prompt = build_prompt(profile, description, resume_text);
                    to_score.push((job, prompt));
                }
                _ => {
                    debug!(job_id = %job.job_id, "No description, skipping");
                    summary.skipped += 1;
                    still_unscored += 1;
                }
            }
        }

        let workers = worker_count(
            to_score.len(),
            available_parallelism(),
            self.settings.max_workers,
        );
        debug!("Scoring {} jobs with {} workers", to_score.len(), workers);

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        for (index, (job, prompt)) in to_score.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let provider = Arc::clone(&self.provider);
            let retry = self.settings.retry.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = score_one(provider, retry, job.job_id.clone(), prompt).await;
                (index, job, outcome)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!("Scoring task failed: {}", e);
                    summary.failed += 1;
                    still_unscored += 1;
                }
            }
        }
        results.sort_by_key(|(index, _, _)| *index);

        let mut fatal: Option<LlmError> = None;
        for (_, job, outcome) in results {
            match outcome {
                Outcome::Scored(result) => {
                    let written = self
                        .store
                        .update_scores(
                            &job.job_id,
                            result.match_score,
                            result.likelihood_score,
                            &result.combined_reason(),
                        )
                        .with_context(|| format!("Failed to store scores for {}", job.job_id))?;
                    if written {
                        info!(
                            job_id = %job.job_id,
                            "Scored '{}' match={} likelihood={} {}",
                            job.title.as_deref().unwrap_or(""),
                            result.match_score,
                            result.likelihood_score,
                            job.url.as_deref().unwrap_or("")
                        );
                        summary.scored += 1;
                    } else {
                        warn!(job_id = %job.job_id, "Job disappeared before its scores were stored");
                    }
                }
                Outcome::Failed => {
                    summary.failed += 1;
                    still_unscored += 1;
                }
                Outcome::Fatal(e) => {
                    still_unscored += 1;
                    fatal.get_or_insert(e);
                }
            }
        }

        if let Some(e) = fatal {
            bail!("Scoring backend {} rejected the request: {}", self.provider.name(), e);
        }
        Ok(still_unscored)
    }
}
