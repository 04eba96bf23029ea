mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{
    format_timestamp, now_timestamp, parse_timestamp, JobRecord, JobStats, NewJob, SyncRow,
    SyncSnapshot, UnscoredJob, SYNC_COLUMNS, TIMESTAMP_FORMAT,
};
pub use store::{SqliteJobStore, MAX_SCORE};
pub use trait_def::JobStore;
