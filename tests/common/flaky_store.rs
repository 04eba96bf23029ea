//! [`JobStore`] over a real store whose inserts can be made to fail.

use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use jobscout::job_store::{JobRecord, JobStats, NewJob, SyncSnapshot, UnscoredJob};
use jobscout::{JobStore, SqliteJobStore};
use std::sync::{Arc, Mutex};

pub struct FlakyStore {
    inner: Arc<SqliteJobStore>,
    failing_inserts: Mutex<usize>,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteJobStore>) -> Self {
        Self {
            inner,
            failing_inserts: Mutex::new(0),
        }
    }

    /// The next `count` inserts fail without writing anything.
    pub fn failing_next_inserts(self, count: usize) -> Self {
        *self.failing_inserts.lock().unwrap() = count;
        self
    }
}

impl JobStore for FlakyStore {
    fn insert_or_ignore(&self, job: &NewJob) -> Result<bool> {
        {
            let mut failing = self.failing_inserts.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                bail!("disk I/O error while inserting {}", job.job_id);
            }
        }
        self.inner.insert_or_ignore(job)
    }

    fn exists(&self, job_id: &str) -> Result<bool> {
        self.inner.exists(job_id)
    }

    fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.inner.get(job_id)
    }

    fn get_unscored(&self, limit: usize, offset: usize) -> Result<Vec<UnscoredJob>> {
        self.inner.get_unscored(limit, offset)
    }

    fn update_scores(
        &self,
        job_id: &str,
        match_score: u8,
        likelihood_score: u8,
        reason: &str,
    ) -> Result<bool> {
        self.inner
            .update_scores(job_id, match_score, likelihood_score, reason)
    }

    fn get_all_for_sync(&self) -> Result<SyncSnapshot> {
        self.inner.get_all_for_sync()
    }

    fn update_last_synced(&self, job_id: &str, synced_at: NaiveDateTime) -> Result<()> {
        self.inner.update_last_synced(job_id, synced_at)
    }

    fn get_stats(&self) -> Result<JobStats> {
        self.inner.get_stats()
    }
}
