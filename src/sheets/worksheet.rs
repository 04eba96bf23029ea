//! Worksheet trait definition.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the spreadsheet service.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Rate limited by the spreadsheet service")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl SheetsError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SheetsError::RateLimited { .. })
    }
}

/// One worksheet (tab) of a spreadsheet.
///
/// Row numbers are 1-based, as shown in the spreadsheet UI; row 1 is the
/// header row.
#[async_trait]
pub trait Worksheet: Send + Sync {
    /// Every non-empty row, header first. Empty when the sheet is blank.
    async fn read_all(&self) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Insert `values` as a new row at `row_number`, shifting rows below.
    async fn insert_row(&self, row_number: usize, values: &[String]) -> Result<(), SheetsError>;

    /// Add `values` after the last row.
    async fn append_row(&self, values: &[String]) -> Result<(), SheetsError>;

    /// Overwrite the cells `A{row}` through the column `values` reaches.
    async fn update_row(&self, row_number: usize, values: &[String]) -> Result<(), SheetsError>;
}

/// Spreadsheet column letters for a 1-based column index (1 → "A", 27 → "AA").
pub fn column_letters(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// A1 range covering `width` cells of one row, e.g. "A5:K5".
pub fn row_range(row_number: usize, width: usize) -> String {
    format!(
        "A{row}:{col}{row}",
        row = row_number,
        col = column_letters(width.max(1))
    )
}
