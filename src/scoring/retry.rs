//! Per-record retry policy for backend calls.

use super::response::ScoreParseError;
use crate::llm::LlmError;
use std::fmt;
use std::time::Duration;

/// Why one backend attempt did not produce scores.
#[derive(Debug)]
pub enum AttemptFailure {
    Backend(LlmError),
    Parse(ScoreParseError),
}

impl AttemptFailure {
    pub fn is_retryable(&self) -> bool {
        match self {
            AttemptFailure::Backend(e) => e.is_transient(),
            AttemptFailure::Parse(_) => true,
        }
    }

    pub fn is_empty_response(&self) -> bool {
        matches!(self, AttemptFailure::Parse(ScoreParseError::Empty))
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Backend(e) => write!(f, "backend error: {}", e),
            AttemptFailure::Parse(e) => write!(f, "{}", e),
        }
    }
}

/// Bounded retries with a pause before re-asking after an empty or
/// throttled answer.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per record, including the first.
    pub max_attempts: u32,
    /// Pause before retrying an empty response or a transient backend error.
    pub empty_retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, empty_retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            empty_retry_delay,
        }
    }

    /// Whether another attempt follows attempt number `attempt` (1-based).
    pub fn should_retry(&self, failure: &AttemptFailure, attempt: u32) -> bool {
        failure.is_retryable() && attempt < self.max_attempts
    }

    /// Pause before the next attempt, if any.
    pub fn delay_before_retry(&self, failure: &AttemptFailure) -> Option<Duration> {
        match failure {
            AttemptFailure::Parse(ScoreParseError::Empty) | AttemptFailure::Backend(_) => {
                Some(self.empty_retry_delay)
            }
            AttemptFailure::Parse(_) => None,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            empty_retry_delay: Duration::from_secs(2),
        }
    }
}
