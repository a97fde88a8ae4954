//! Round-based fan-out/retry orchestration.
//!
//! One run drives generation over a transcript's chunks:
//!
//! ```text
//! split → round 1: fan out one Generator+Validator unit per chunk
//!       → merge successes, collect failures (original order)
//!       → round 2..max_attempts: fan out over the failed subset only
//!       → full success, or exhaustion carrying the partial report
//! ```
//!
//! Each unit runs as its own tokio task on a `JoinSet`, concurrency bounded
//! by a semaphore; a unit's failure is captured as a value and never aborts
//! its siblings. Merging happens single-threaded between rounds, so no locks
//! are held anywhere. Retry is immediate — the upstream non-determinism is
//! the randomness source, not a backoff schedule.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::chunker::{self, CharCountEstimator, TokenEstimator};
use crate::config::EngineConfig;
use crate::errors::PipelineError;
use crate::provider::{generate, Provider};
use crate::transcript::Transcript;
use crate::types::{
    ArtifactKind, GenerationReport, MergedArtifacts, ValidatedArtifact, ValidationFailure,
};
use crate::validate;

/// Drives generation for one artifact kind over one provider.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    estimator: Arc<dyn TokenEstimator>,
    token_budget: u64,
    max_attempts: u32,
    max_parallel: usize,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>, token_budget: u64, max_attempts: u32) -> Self {
        Self {
            provider,
            estimator: Arc::new(CharCountEstimator),
            token_budget,
            max_attempts,
            max_parallel: 4,
        }
    }

    /// Build from config, constructing the provider the config routes to
    /// for this artifact kind.
    pub fn from_config(config: &EngineConfig, kind: ArtifactKind) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;
        Ok(Self::new(
            config.build_provider(kind)?,
            config.token_budget,
            config.max_attempts,
        )
        .with_max_parallel(config.max_parallel))
    }

    /// Override the token estimator (model-specific tokenizers, tests).
    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Run the full pipeline: split the transcript, then generate.
    ///
    /// # Errors
    ///
    /// `PipelineError::InferenceExhausted` when chunks are still failing
    /// after the final attempt — the partial report rides inside the error.
    /// `PipelineError::Config` when the attempt budget is zero.
    pub async fn run(
        &self,
        kind: ArtifactKind,
        transcript: &Transcript,
    ) -> Result<GenerationReport, PipelineError> {
        let (chunks, token_sum) = chunker::split(transcript, self.token_budget, &*self.estimator);
        self.run_chunks(kind, chunks, token_sum).await
    }

    /// Parse-then-run entry point for callers holding raw JSON.
    ///
    /// Input-shape defects surface here, before any generation call.
    pub async fn run_value(
        &self,
        kind: ArtifactKind,
        value: &serde_json::Value,
    ) -> Result<GenerationReport, PipelineError> {
        let transcript = Transcript::from_value(value)?;
        self.run(kind, &transcript).await
    }

    /// Generate over an already-split chunk list.
    ///
    /// `token_sum` is the caller's usage-accounting total; it is carried
    /// through unchanged across rounds.
    pub async fn run_chunks(
        &self,
        kind: ArtifactKind,
        chunks: Vec<Transcript>,
        token_sum: u64,
    ) -> Result<GenerationReport, PipelineError> {
        if self.max_attempts == 0 {
            return Err(PipelineError::Config("max_attempts must be > 0".into()));
        }

        let mut merged = MergedArtifacts::empty(kind);
        let mut remaining: Vec<(usize, Transcript)> = chunks.into_iter().enumerate().collect();
        let mut attempt: u32 = 1;

        loop {
            info!(
                kind = %kind,
                attempt,
                max_attempts = self.max_attempts,
                chunks = remaining.len(),
                "dispatching generation round"
            );

            let outcomes = self.run_round(kind, &remaining).await;

            let mut successes: Vec<(usize, ValidatedArtifact)> = Vec::new();
            let mut failures: Vec<ValidationFailure> = Vec::new();
            for (index, outcome) in outcomes {
                match outcome {
                    Ok(artifact) => successes.push((index, artifact)),
                    Err(failure) => failures.push(failure),
                }
            }

            // Merge in original chunk order so repeated runs are deterministic
            // given deterministic failures.
            successes.sort_by_key(|(index, _)| *index);
            for (_, artifact) in successes {
                merged.absorb(artifact);
            }

            for failure in &failures {
                match &failure.error {
                    PipelineError::Provider { provider, message } => warn!(
                        chunk = failure.chunk_index,
                        provider = %provider,
                        message = %message,
                        "provider call failed"
                    ),
                    error => warn!(
                        chunk = failure.chunk_index,
                        error = %error,
                        raw_len = failure.raw.as_deref().map_or(0, str::len),
                        "output failed validation"
                    ),
                }
            }

            // `retain` keeps the original split order, so retries stay
            // deterministic given deterministic failures.
            let failed_indices: HashSet<usize> =
                failures.iter().map(|f| f.chunk_index).collect();
            remaining.retain(|(index, _)| failed_indices.contains(index));

            if remaining.is_empty() {
                info!(kind = %kind, attempt, merged = merged.len(), "generation complete");
                return Ok(GenerationReport {
                    kind,
                    artifacts: merged,
                    token_sum,
                    failed_chunks: 0,
                });
            }

            if attempt == self.max_attempts {
                warn!(
                    kind = %kind,
                    failed_chunks = remaining.len(),
                    "attempt budget exhausted with chunks still failing"
                );
                let failed_chunks = remaining.len();
                return Err(PipelineError::InferenceExhausted {
                    failed_chunks,
                    attempts: attempt,
                    partial: Box::new(GenerationReport {
                        kind,
                        artifacts: merged,
                        token_sum,
                        failed_chunks,
                    }),
                });
            }

            attempt += 1;
        }
    }

    /// Fan one round out over the remaining chunks and wait for every unit.
    async fn run_round(
        &self,
        kind: ArtifactKind,
        round: &[(usize, Transcript)],
    ) -> Vec<(usize, Result<ValidatedArtifact, ValidationFailure>)> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut join_set: JoinSet<(usize, Result<ValidatedArtifact, ValidationFailure>)> =
            JoinSet::new();

        for (index, chunk) in round {
            let index = *index;
            let chunk = chunk.clone();
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);

            join_set.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                let outcome = generate_and_validate(&*provider, kind, &chunk, index).await;
                (index, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(round.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(error = %e, "generation unit panicked"),
            }
        }

        // A panicked unit never reported back; its chunk stays failed.
        let reported: HashSet<usize> = outcomes.iter().map(|(index, _)| *index).collect();
        for (index, _) in round {
            if !reported.contains(index) {
                outcomes.push((
                    *index,
                    Err(ValidationFailure {
                        chunk_index: *index,
                        error: PipelineError::provider(
                            self.provider.name(),
                            "generation unit panicked",
                        ),
                        raw: None,
                    }),
                ));
            }
        }

        outcomes
    }
}

/// One unit of concurrency: a provider call followed by validation.
async fn generate_and_validate(
    provider: &dyn Provider,
    kind: ArtifactKind,
    chunk: &Transcript,
    index: usize,
) -> Result<ValidatedArtifact, ValidationFailure> {
    let raw = match generate(provider, kind, chunk).await {
        Ok(raw) => raw,
        Err(error) => {
            return Err(ValidationFailure {
                chunk_index: index,
                error,
                raw: None,
            });
        }
    };

    debug!(chunk = index, raw_len = raw.len(), "provider responded");

    match validate::validate(kind, &raw, provider.output_sentinel()) {
        Ok(artifact) => Ok(artifact),
        Err(shape) => Err(ValidationFailure {
            chunk_index: index,
            error: shape.into(),
            raw: Some(raw),
        }),
    }
}
