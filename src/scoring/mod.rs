//! Scoring engine: rates unscored postings against the candidate's profile
//! and resume.

mod engine;
mod prompt;
mod response;
mod retry;

pub use engine::{worker_count, JobScorer, ScoringSettings, ScoringSummary};
pub use prompt::build_prompt;
pub use response::{
    clean_response, format_reason, parse_score_response, ScoreParseError, ScoreResult,
};
pub use retry::{AttemptFailure, RetryPolicy};
