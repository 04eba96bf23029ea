//! Data models for the job database.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Text layout of every timestamp column. Lexicographic order matches time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Current local time, truncated to the precision the database stores.
pub fn now_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    // Round-trip through text so in-memory and stored values compare equal
    parse_timestamp(&format_timestamp(&now)).unwrap_or(now)
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses the stored layout plus the shorter variants sqlite defaults and
/// hand-edited spreadsheet cells produce.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    const LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
}

/// A freshly extracted posting, before any scoring.
///
/// Every descriptive field is optional: listings routinely omit pay, schedule
/// or benefits, and a partially loaded detail pane still yields a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub job_id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub pay: Option<String>,
    pub job_type: Option<String>,
    pub shift_and_schedule: Option<String>,
    pub benefits: Option<String>,
    pub description: Option<String>,
    pub description_html: Option<String>,
}

impl NewJob {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            ..Default::default()
        }
    }

    /// True when extraction produced nothing beyond the identifier.
    pub fn is_empty(&self) -> bool {
        [
            &self.title,
            &self.company,
            &self.location,
            &self.url,
            &self.pay,
            &self.job_type,
            &self.shift_and_schedule,
            &self.benefits,
            &self.description,
            &self.description_html,
        ]
        .iter()
        .all(|field| field.is_none())
    }
}

/// A stored job record, as read back in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub pay: Option<String>,
    pub job_type: Option<String>,
    pub shift_and_schedule: Option<String>,
    pub benefits: Option<String>,
    pub description: Option<String>,
    pub description_html: Option<String>,
    pub match_score: Option<i64>,
    pub likelihood_score: Option<i64>,
    pub match_reason: Option<String>,
    pub date_scraped: Option<NaiveDateTime>,
    pub date_updated: Option<NaiveDateTime>,
    pub last_synced: Option<NaiveDateTime>,
}

impl JobRecord {
    pub fn is_scored(&self) -> bool {
        self.match_score.is_some() && self.likelihood_score.is_some()
    }
}

/// The slice of a record the scoring engine needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnscoredJob {
    pub job_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

/// One row of the outbound sync table. Field order matches [`SYNC_COLUMNS`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncRow {
    pub job_id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub match_score: Option<i64>,
    pub likelihood_score: Option<i64>,
    pub match_reason: Option<String>,
    pub description: Option<String>,
    pub last_synced: Option<String>,
    pub date_updated: Option<String>,
}

/// Columns exported to the spreadsheet, in sheet order.
pub const SYNC_COLUMNS: &[&str] = &[
    "job_id",
    "job_title",
    "company",
    "location",
    "url",
    "match_score",
    "likelihood_score",
    "match_reason",
    "description",
    "last_synced",
    "date_updated",
];

impl SyncRow {
    /// Cells in sheet order; absent values become empty cells.
    pub fn to_cells(&self) -> Vec<String> {
        fn text(v: &Option<String>) -> String {
            v.clone().unwrap_or_default()
        }
        fn number(v: &Option<i64>) -> String {
            v.map(|n| n.to_string()).unwrap_or_default()
        }
        vec![
            self.job_id.clone(),
            text(&self.title),
            text(&self.company),
            text(&self.location),
            text(&self.url),
            number(&self.match_score),
            number(&self.likelihood_score),
            text(&self.match_reason),
            text(&self.description),
            text(&self.last_synced),
            text(&self.date_updated),
        ]
    }

    pub fn date_updated_at(&self) -> Option<NaiveDateTime> {
        self.date_updated.as_deref().and_then(parse_timestamp)
    }
}

/// Header row plus every record, as handed to the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<SyncRow>,
}

/// Summary counts for the job database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    pub total: usize,
    pub unscored: usize,
    pub pending_sync: usize,
}
