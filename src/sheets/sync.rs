//! Store → spreadsheet reconciliation.
//!
//! Each pass reads the whole sheet, indexes rows by `job_id`, and then walks
//! every stored record:
//!
//! - unknown to the sheet: append it;
//! - known and `date_updated` newer than the row's `last_synced` cell (or that
//!   cell is blank or unreadable): overwrite the row;
//! - otherwise: leave it alone.
//!
//! Every written row carries the instant of the write in its `last_synced`
//! cell, and the same instant becomes the local watermark once the service
//! confirms the write. A second pass without local changes writes nothing.

use super::worksheet::{SheetsError, Worksheet};
use crate::job_store::{format_timestamp, now_timestamp, parse_timestamp, JobStore, SyncRow};
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const JOB_ID_COLUMN: &str = "job_id";
const LAST_SYNCED_COLUMN: &str = "last_synced";

/// Tunables for a sync run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Passes attempted before giving up on rate limiting.
    pub max_attempts: u32,
    /// Pause after a rate-limit response that did not say how long to wait.
    pub rate_limit_backoff: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_backoff: Duration::from_secs(60),
        }
    }
}

/// Counters for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub appended: usize,
    pub updated: usize,
    /// Records already current in the sheet (last pass only).
    pub unchanged: usize,
    pub passes: u32,
}

impl SyncSummary {
    pub fn writes(&self) -> usize {
        self.appended + self.updated
    }
}

#[derive(Debug, Error)]
enum PassError {
    #[error(transparent)]
    Sheets(#[from] SheetsError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Where an existing sheet row lives and when it was last written.
struct RemoteRow {
    row_number: usize,
    last_synced: Option<String>,
}

/// Decision for one local record.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Append,
    Update(usize),
    Skip,
}

fn decide(row: &SyncRow, remote: Option<&RemoteRow>) -> Action {
    let Some(remote) = remote else {
        return Action::Append;
    };
    // Blank or unparsable remote values count as the earliest time
    let remote_synced = remote.last_synced.as_deref().and_then(parse_timestamp);
    let newer = match (row.date_updated_at(), remote_synced) {
        (_, None) => true,
        (Some(local), Some(remote)) => local > remote,
        (None, Some(_)) => false,
    };
    if newer {
        Action::Update(remote.row_number)
    } else {
        Action::Skip
    }
}

/// Reconciles the job store with one worksheet.
pub struct SheetSync {
    store: Arc<dyn JobStore>,
    worksheet: Arc<dyn Worksheet>,
    settings: SyncSettings,
}

impl SheetSync {
    pub fn new(
        store: Arc<dyn JobStore>,
        worksheet: Arc<dyn Worksheet>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            store,
            worksheet,
            settings,
        }
    }

    /// Run passes until one completes, sleeping and starting over whenever
    /// the service rate limits us, up to `max_attempts` passes.
    pub async fn run(&self) -> anyhow::Result<SyncSummary> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut summary = SyncSummary::default();

        loop {
            summary.passes += 1;
            match self.pass(&mut summary).await {
                Ok(()) => break,
                Err(PassError::Sheets(SheetsError::RateLimited { retry_after }))
                    if summary.passes < max_attempts =>
                {
                    let wait = retry_after.unwrap_or(self.settings.rate_limit_backoff);
                    warn!(
                        "Rate limited by the spreadsheet service, retrying the whole pass in {:?} (pass {}/{})",
                        wait, summary.passes, max_attempts
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(PassError::Sheets(e)) => {
                    return Err(anyhow::Error::new(e).context("Spreadsheet sync failed"))
                }
                Err(PassError::Other(e)) => return Err(e),
            }
        }

        info!(
            "Sync complete: {} appended, {} updated, {} unchanged",
            summary.appended, summary.updated, summary.unchanged
        );
        Ok(summary)
    }

    async fn pass(&self, summary: &mut SyncSummary) -> Result<(), PassError> {
        summary.unchanged = 0;

        let snapshot = self
            .store
            .get_all_for_sync()
            .context("Failed to read jobs for sync")?;
        let existing = self.worksheet.read_all().await?;

        let is_blank = |row: &Vec<String>| row.iter().all(|cell| cell.trim().is_empty());

        let (header, data): (Vec<String>, &[Vec<String>]) = match existing.first() {
            Some(first) if !is_blank(first) => (first.clone(), &existing[1..]),
            _ if existing.iter().all(is_blank) => {
                info!("Worksheet is empty, writing header row");
                self.worksheet.insert_row(1, &snapshot.headers).await?;
                (snapshot.headers.clone(), &[])
            }
            _ => {
                return Err(anyhow::anyhow!(
                    "Worksheet header row is missing: row 1 is blank but rows below it are not"
                )
                .into())
            }
        };

        if header != snapshot.headers {
            warn!(
                "Worksheet header {:?} differs from local columns {:?}",
                header, snapshot.headers
            );
        }

        let column = |name: &str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| anyhow::anyhow!("Worksheet header has no '{}' column", name))
        };
        let id_column = column(JOB_ID_COLUMN)?;
        let synced_column = column(LAST_SYNCED_COLUMN)?;
        let local_synced_column = snapshot
            .headers
            .iter()
            .position(|h| h == LAST_SYNCED_COLUMN)
            .ok_or_else(|| anyhow::anyhow!("Local columns have no '{}'", LAST_SYNCED_COLUMN))?;

        let mut remote: HashMap<String, RemoteRow> = HashMap::new();
        for (idx, row) in data.iter().enumerate() {
            let Some(job_id) = row.get(id_column).map(|id| id.trim()).filter(|id| !id.is_empty())
            else {
                continue;
            };
            remote.entry(job_id.to_string()).or_insert(RemoteRow {
                row_number: idx + 2,
                last_synced: row.get(synced_column).cloned(),
            });
        }

        for row in &snapshot.rows {
            let row_number = match decide(row, remote.get(&row.job_id)) {
                Action::Skip => {
                    summary.unchanged += 1;
                    continue;
                }
                Action::Update(row_number) => Some(row_number),
                Action::Append => None,
            };

            let synced_at = now_timestamp();
            let mut cells = row.to_cells();
            cells[local_synced_column] = format_timestamp(&synced_at);

            match row_number {
                Some(row_number) => {
                    debug!(job_id = %row.job_id, "Updating sheet row {}", row_number);
                    self.worksheet.update_row(row_number, &cells).await?;
                    summary.updated += 1;
                }
                None => {
                    debug!(job_id = %row.job_id, "Appending to sheet");
                    self.worksheet.append_row(&cells).await?;
                    summary.appended += 1;
                }
            }

            self.store
                .update_last_synced(&row.job_id, synced_at)
                .with_context(|| format!("Failed to record sync of {}", row.job_id))?;
        }

        Ok(())
    }
}
