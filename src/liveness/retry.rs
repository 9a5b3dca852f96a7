//! Retry policy for stream probes
//!
//! A probe is a small state machine: every attempt produces a
//! [`ProbeAttempt`], and the policy decides from it (and the number of
//! attempts made so far) whether to try again or settle on an outcome.

use std::time::Duration;

use super::prober::ProbeAttempt;
use crate::config::defaults::{DEFAULT_LIVENESS_BACKOFF_STEP_MS, DEFAULT_LIVENESS_RETRIES};
use crate::models::{LivenessOutcome, LivenessReason};

/// HTTP statuses that count as a stream answering
pub fn is_success_status(status: u16) -> bool {
    matches!(status, 200 | 206)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Finish(LivenessOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_LIVENESS_RETRIES as u32,
            backoff_step: Duration::from_millis(DEFAULT_LIVENESS_BACKOFF_STEP_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff_step: Duration) -> Self {
        Self {
            retries,
            backoff_step,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay before the retry following attempt `attempt_index` (0-based)
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        self.backoff_step * attempt_index.saturating_add(1)
    }

    pub fn evaluate(&self, attempt: &ProbeAttempt, attempts_made: u32) -> RetryDecision {
        let exhausted = attempts_made >= self.max_attempts();

        match attempt {
            ProbeAttempt::Body {
                status,
                has_data: true,
            } => RetryDecision::Finish(LivenessOutcome::live(*status, attempts_made)),
            // Empty content is not transient
            ProbeAttempt::Body {
                status,
                has_data: false,
            } => RetryDecision::Finish(LivenessOutcome::dead(
                Some(*status),
                LivenessReason::EmptyBody,
                attempts_made,
            )),
            ProbeAttempt::Status(status) if exhausted => RetryDecision::Finish(
                LivenessOutcome::dead(Some(*status), LivenessReason::HttpStatus, attempts_made),
            ),
            ProbeAttempt::Failed(kind) if exhausted => RetryDecision::Finish(
                LivenessOutcome::dead(None, LivenessReason::RequestException, attempts_made)
                    .with_error(kind.to_string()),
            ),
            _ => RetryDecision::Retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::prober::FailureKind;
    use rstest::rstest;

    #[rstest]
    #[case(200, true)]
    #[case(206, true)]
    #[case(204, false)]
    #[case(301, false)]
    #[case(404, false)]
    #[case(503, false)]
    fn test_success_statuses(#[case] status: u16, #[case] expected: bool) {
        assert_eq!(is_success_status(status), expected);
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(400));
        assert_eq!(policy.backoff(1), Duration::from_millis(800));
        assert_eq!(policy.backoff(2), Duration::from_millis(1200));
    }

    #[test]
    fn test_data_is_live_on_first_attempt() {
        let policy = RetryPolicy::default();
        let decision = policy.evaluate(
            &ProbeAttempt::Body {
                status: 206,
                has_data: true,
            },
            1,
        );
        assert_eq!(decision, RetryDecision::Finish(LivenessOutcome::live(206, 1)));
    }

    #[test]
    fn test_empty_body_is_terminal() {
        let policy = RetryPolicy::default();
        let decision = policy.evaluate(
            &ProbeAttempt::Body {
                status: 200,
                has_data: false,
            },
            1,
        );
        match decision {
            RetryDecision::Finish(outcome) => {
                assert!(!outcome.is_live);
                assert_eq!(outcome.reason, LivenessReason::EmptyBody);
                assert_eq!(outcome.attempts, 1);
            }
            RetryDecision::Retry => panic!("empty body must not be retried"),
        }
    }

    #[test]
    fn test_bad_status_retries_until_exhausted() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let attempt = ProbeAttempt::Status(404);

        assert_eq!(policy.evaluate(&attempt, 1), RetryDecision::Retry);
        assert_eq!(policy.evaluate(&attempt, 2), RetryDecision::Retry);
        assert_eq!(
            policy.evaluate(&attempt, 3),
            RetryDecision::Finish(LivenessOutcome::dead(
                Some(404),
                LivenessReason::HttpStatus,
                3
            ))
        );
    }

    #[test]
    fn test_network_failure_records_kind() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        match policy.evaluate(&ProbeAttempt::Failed(FailureKind::ConnectError), 1) {
            RetryDecision::Finish(outcome) => {
                assert_eq!(outcome.reason, LivenessReason::RequestException);
                assert_eq!(outcome.status_code, None);
                assert_eq!(outcome.error, "ConnectError");
            }
            RetryDecision::Retry => panic!("no retries configured"),
        }
    }
}
