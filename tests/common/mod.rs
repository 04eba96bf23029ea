//! Common test infrastructure
//!
//! Test doubles for the outside systems the pipeline talks to and for the
//! store, plus fixture data. Tests should only import from this module, not from
//! internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{listing_site, temp_store, JobFixture};
//!
//! #[tokio::test]
//! async fn test_search() {
//!     let (_dir, store) = temp_store();
//!     let site = listing_site(&[vec![JobFixture::numbered(1)]]);
//!     // ...
//! }
//! ```

#![allow(dead_code)]

mod constants;
mod fixture_page;
mod flaky_store;
mod fixtures;
mod memory_worksheet;
mod scripted_provider;

// Public API - this is what tests import
pub use constants::*;
pub use fixture_page::FixturePage;
pub use fixtures::{
    filter_controls_html, listing_site, new_job, results_html, score_json, search_form_html,
    temp_store, JobFixture,
};
pub use flaky_store::FlakyStore;
pub use memory_worksheet::MemoryWorksheet;
pub use scripted_provider::ScriptedProvider;
