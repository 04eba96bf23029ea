//! SQLite schema definitions for the job database.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema, DEFAULT_LOCAL_TIMESTAMP};

/// One row per posting, keyed by the listing site's own identifier.
const JOBS_TABLE: Table = Table {
    name: "jobs",
    columns: &[
        sqlite_column!("id", SqlType::Integer, primary_key = true),
        sqlite_column!("job_id", SqlType::Text, non_null = true, unique = true),
        sqlite_column!("job_title", SqlType::Text),
        sqlite_column!("company", SqlType::Text),
        sqlite_column!("location", SqlType::Text),
        sqlite_column!("url", SqlType::Text),
        sqlite_column!("pay", SqlType::Text),
        sqlite_column!("job_type", SqlType::Text),
        sqlite_column!("shift_and_schedule", SqlType::Text),
        sqlite_column!("benefits", SqlType::Text),
        sqlite_column!("description", SqlType::Text),
        sqlite_column!("description_html", SqlType::Text),
        // Scoring
        sqlite_column!("match_score", SqlType::Integer),
        sqlite_column!("match_reason", SqlType::Text),
        sqlite_column!("likelihood_score", SqlType::Integer),
        // Timestamps
        sqlite_column!(
            "date_scraped",
            SqlType::Text,
            default_value = Some(DEFAULT_LOCAL_TIMESTAMP)
        ),
        sqlite_column!("last_synced", SqlType::Text),
        sqlite_column!(
            "date_updated",
            SqlType::Text,
            default_value = Some(DEFAULT_LOCAL_TIMESTAMP)
        ),
    ],
    indices: &[("idx_jobs_match_score", "match_score")],
};

pub const JOBS_SCHEMA: VersionedSchema = VersionedSchema {
    version: 0,
    tables: &[JOBS_TABLE],
};
