//! JobStore trait definition.

use super::models::{JobRecord, JobStats, NewJob, SyncSnapshot, UnscoredJob};
use anyhow::Result;
use chrono::NaiveDateTime;

/// Trait for job storage backends.
///
/// Every stage of the pipeline shares this store and nothing else, so the
/// contract here is what keeps extraction, scoring and sync consistent.
pub trait JobStore: Send + Sync {
    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Insert a new posting. A second insert with the same `job_id` is a
    /// silent no-op: the first stored values are kept.
    ///
    /// Returns true if a row was actually written.
    fn insert_or_ignore(&self, job: &NewJob) -> Result<bool>;

    /// Whether a posting with this identifier is already stored.
    fn exists(&self, job_id: &str) -> Result<bool>;

    /// Full record lookup.
    fn get(&self, job_id: &str) -> Result<Option<JobRecord>>;

    // =========================================================================
    // Scoring
    // =========================================================================

    /// Records missing either score, in insertion order.
    fn get_unscored(&self, limit: usize, offset: usize) -> Result<Vec<UnscoredJob>>;

    /// Write both scores and the combined reason together, advancing
    /// `date_updated`. Returns false when no record has this identifier.
    fn update_scores(
        &self,
        job_id: &str,
        match_score: u8,
        likelihood_score: u8,
        reason: &str,
    ) -> Result<bool>;

    // =========================================================================
    // Sync
    // =========================================================================

    /// Header row and every record, for the spreadsheet reconciler.
    fn get_all_for_sync(&self) -> Result<SyncSnapshot>;

    /// Advance the sync watermark for one record to `synced_at`.
    fn update_last_synced(&self, job_id: &str, synced_at: NaiveDateTime) -> Result<()>;

    // =========================================================================
    // Statistics
    // =========================================================================

    fn get_stats(&self) -> Result<JobStats>;
}
