//! jobscout library
//!
//! Job-posting pipeline: extract postings from a listing site into SQLite,
//! score them against a resume with a text generation backend, and mirror
//! the table into a spreadsheet. Exposed as a library for the binary and for
//! the integration tests.

pub mod browser;
pub mod cli_style;
pub mod config;
pub mod extraction;
pub mod job_store;
pub mod llm;
pub mod resume;
pub mod scoring;
pub mod sheets;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use job_store::{JobStore, SqliteJobStore};
pub use llm::LlmProvider;
pub use sheets::Worksheet;
