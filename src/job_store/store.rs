//! SQLite-backed job store implementation.

use super::models::{
    format_timestamp, now_timestamp, parse_timestamp, JobRecord, JobStats, NewJob, SyncRow,
    SyncSnapshot, UnscoredJob,
};
use super::schema::JOBS_SCHEMA;
use super::trait_def::JobStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Highest score either scoring dimension may hold.
pub const MAX_SCORE: u8 = 100;

/// How long a connection waits on another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed job store.
///
/// Holds only the database path: every operation opens its own connection and
/// drops it when done, so separate pipeline stages (even separate processes)
/// can share the file and rely on sqlite's own write serialization.
#[derive(Clone, Debug)]
pub struct SqliteJobStore {
    db_path: PathBuf,
}

fn create_or_validate(conn: &Connection) -> Result<()> {
    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;
    if table_count == 0 {
        info!("Creating job db schema at version {}", JOBS_SCHEMA.version);
        return JOBS_SCHEMA.create(conn);
    }

    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if db_version < BASE_DB_VERSION as i64 {
        bail!(
            "Database has user_version {}, it was not created by this tool",
            db_version
        );
    }
    if db_version != JOBS_SCHEMA.user_version() as i64 {
        bail!(
            "Job database is at schema version {}, this build only knows version {}",
            db_version - BASE_DB_VERSION as i64,
            JOBS_SCHEMA.version
        );
    }

    JOBS_SCHEMA
        .validate(conn)
        .context("Job database schema does not match the expected layout")
}

impl SqliteJobStore {
    /// Open (creating if needed) the job database and bring its schema up to date.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {:?}", parent)
                })?;
            }
        }

        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open job database at {:?}", db_path))?;

        create_or_validate(&conn)?;

        // WAL is persistent, setting it once covers every later connection
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on job database")?;

        let store = Self { db_path };
        let stats = store.get_stats()?;
        info!(
            "Job store ready: {} jobs, {} unscored, {} pending sync",
            stats.total, stats.unscored, stats.pending_sync
        );
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open job database at {:?}", self.db_path))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

fn optional_timestamp(s: Option<String>) -> Option<NaiveDateTime> {
    s.as_deref().and_then(parse_timestamp)
}

impl JobStore for SqliteJobStore {
    fn insert_or_ignore(&self, job: &NewJob) -> Result<bool> {
        let conn = self.connect()?;
        let now = format_timestamp(&now_timestamp());
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO jobs
             (job_id, job_title, company, location, url, pay, job_type,
              shift_and_schedule, benefits, description, description_html,
              match_score, match_reason, likelihood_score,
              date_scraped, last_synced, date_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                     NULL, NULL, NULL, ?12, NULL, ?12)",
            params![
                job.job_id,
                job.title,
                job.company,
                job.location,
                job.url,
                job.pay,
                job.job_type,
                job.shift_and_schedule,
                job.benefits,
                job.description,
                job.description_html,
                now,
            ],
        )?;
        if inserted == 0 {
            debug!(job_id = %job.job_id, "Job already stored, insert ignored");
        }
        Ok(inserted > 0)
    }

    fn exists(&self, job_id: &str) -> Result<bool> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE job_id = ?1",
            params![job_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT job_id, job_title, company, location, url, pay, job_type,
                    shift_and_schedule, benefits, description, description_html,
                    match_score, likelihood_score, match_reason,
                    date_scraped, date_updated, last_synced
             FROM jobs WHERE job_id = ?1",
        )?;
        let record = stmt
            .query_row(params![job_id], |row| {
                Ok(JobRecord {
                    job_id: row.get(0)?,
                    title: row.get(1)?,
                    company: row.get(2)?,
                    location: row.get(3)?,
                    url: row.get(4)?,
                    pay: row.get(5)?,
                    job_type: row.get(6)?,
                    shift_and_schedule: row.get(7)?,
                    benefits: row.get(8)?,
                    description: row.get(9)?,
                    description_html: row.get(10)?,
                    match_score: row.get(11)?,
                    likelihood_score: row.get(12)?,
                    match_reason: row.get(13)?,
                    date_scraped: optional_timestamp(row.get(14)?),
                    date_updated: optional_timestamp(row.get(15)?),
                    last_synced: optional_timestamp(row.get(16)?),
                })
            })
            .optional()?;
        Ok(record)
    }

    fn get_unscored(&self, limit: usize, offset: usize) -> Result<Vec<UnscoredJob>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT job_id, job_title, description, url
             FROM jobs
             WHERE match_score IS NULL OR likelihood_score IS NULL
             ORDER BY id
             LIMIT ?1 OFFSET ?2",
        )?;
        let jobs = stmt
            .query_map(params![limit as i64, offset as i64], |row| {
                Ok(UnscoredJob {
                    job_id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    url: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn update_scores(
        &self,
        job_id: &str,
        match_score: u8,
        likelihood_score: u8,
        reason: &str,
    ) -> Result<bool> {
        if match_score > MAX_SCORE || likelihood_score > MAX_SCORE {
            bail!(
                "Scores for job {} out of range: match={}, likelihood={}",
                job_id,
                match_score,
                likelihood_score
            );
        }
        let conn = self.connect()?;
        let updated = conn.execute(
            "UPDATE jobs
             SET match_score = ?1,
                 likelihood_score = ?2,
                 match_reason = ?3,
                 date_updated = ?4
             WHERE job_id = ?5",
            params![
                i64::from(match_score),
                i64::from(likelihood_score),
                reason,
                format_timestamp(&now_timestamp()),
                job_id,
            ],
        )?;
        Ok(updated > 0)
    }

    fn get_all_for_sync(&self) -> Result<SyncSnapshot> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT job_id, job_title, company, location, url,
                    match_score, likelihood_score, match_reason, description,
                    last_synced, date_updated
             FROM jobs
             ORDER BY id",
        )?;
        let headers = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let rows = stmt
            .query_map([], |row| {
                Ok(SyncRow {
                    job_id: row.get(0)?,
                    title: row.get(1)?,
                    company: row.get(2)?,
                    location: row.get(3)?,
                    url: row.get(4)?,
                    match_score: row.get(5)?,
                    likelihood_score: row.get(6)?,
                    match_reason: row.get(7)?,
                    description: row.get(8)?,
                    last_synced: row.get(9)?,
                    date_updated: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SyncSnapshot { headers, rows })
    }

    fn update_last_synced(&self, job_id: &str, synced_at: NaiveDateTime) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE jobs SET last_synced = ?1 WHERE job_id = ?2",
            params![format_timestamp(&synced_at), job_id],
        )?;
        Ok(())
    }

    fn get_stats(&self) -> Result<JobStats> {
        let conn = self.connect()?;
        let total: usize = conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))?;
        let unscored: usize = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE match_score IS NULL OR likelihood_score IS NULL",
            [],
            |r| r.get(0),
        )?;
        let pending_sync: usize = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE last_synced IS NULL OR date_updated > last_synced",
            [],
            |r| r.get(0),
        )?;
        Ok(JobStats {
            total,
            unscored,
            pending_sync,
        })
    }
}
