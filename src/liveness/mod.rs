//! Stream liveness validation
//!
//! [`LivenessValidator`] probes every candidate of a source batch with at
//! most `workers` probes in flight, retrying per [`RetryPolicy`], and hands
//! the outcomes back in input order. Probe failures never escape as errors;
//! they are classified into [`LivenessOutcome`] values.

pub mod log;
pub mod prober;
pub mod retry;

use futures::stream::{self, StreamExt};
use tracing::debug;

pub use log::LivenessLog;
pub use prober::{FailureKind, HttpStreamProber, ProbeAttempt, StreamProber};
pub use retry::{is_success_status, RetryDecision, RetryPolicy};

use crate::config::LivenessConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{Candidate, LivenessOutcome, ProbedCandidate};
use crate::utils::url::UrlUtils;

pub struct LivenessValidator<P = HttpStreamProber> {
    prober: P,
    policy: RetryPolicy,
    workers: usize,
}

impl LivenessValidator<HttpStreamProber> {
    pub fn from_config(config: &LivenessConfig) -> AppResult<Self> {
        let prober = HttpStreamProber::new(config)?;
        Self::new(
            prober,
            RetryPolicy::new(config.retries, config.backoff_step),
            config.workers,
        )
    }
}

impl<P: StreamProber> LivenessValidator<P> {
    pub fn new(prober: P, policy: RetryPolicy, workers: usize) -> AppResult<Self> {
        if workers == 0 {
            return Err(AppError::configuration(
                "Liveness worker count must be at least 1",
            ));
        }
        Ok(Self {
            prober,
            policy,
            workers,
        })
    }

    /// Probe one URL until the retry policy settles on an outcome
    pub async fn check(&self, url: &str) -> LivenessOutcome {
        let mut attempts = 0u32;
        loop {
            let attempt = self.prober.probe(url).await;
            attempts += 1;

            match self.policy.evaluate(&attempt, attempts) {
                RetryDecision::Finish(outcome) => return outcome,
                RetryDecision::Retry => {
                    let delay = self.policy.backoff(attempts - 1);
                    debug!(
                        "Attempt {} for {} gave {:?}, retrying in {:?}",
                        attempts,
                        UrlUtils::obfuscate_credentials(url),
                        attempt,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Probe a batch; the result has one entry per candidate, in input order
    pub async fn probe_batch(&self, candidates: Vec<Candidate>) -> Vec<ProbedCandidate> {
        let mut outcomes: Vec<(usize, LivenessOutcome)> =
            stream::iter(candidates.iter().enumerate())
                .map(|(index, candidate)| async move {
                    let outcome = self.check(&candidate.url).await;
                    debug!(
                        "{} -> live={} reason={} attempts={}",
                        UrlUtils::obfuscate_credentials(&candidate.url),
                        outcome.is_live,
                        outcome.reason,
                        outcome.attempts
                    );
                    (index, outcome)
                })
                .buffer_unordered(self.workers)
                .collect()
                .await;

        outcomes.sort_by_key(|(index, _)| *index);

        candidates
            .into_iter()
            .zip(outcomes)
            .map(|(candidate, (_, outcome))| ProbedCandidate { candidate, outcome })
            .collect()
    }
}

/// Live candidates of a probed batch, in batch order
pub fn accepted(probed: &[ProbedCandidate]) -> Vec<Candidate> {
    probed
        .iter()
        .filter(|p| p.outcome.is_live)
        .map(|p| p.candidate.clone())
        .collect()
}
