//! Spreadsheet service client and the store → sheet reconciler.

mod auth;
mod client;
mod sync;
mod worksheet;

pub use auth::{ServiceAccountAuth, ServiceAccountKey};
pub use client::GoogleWorksheet;
pub use sync::{SheetSync, SyncSettings, SyncSummary};
pub use worksheet::{column_letters, row_range, SheetsError, Worksheet};
