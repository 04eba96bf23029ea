//! Listing-site extraction engine.

mod cards;
mod criteria;
mod engine;
mod fields;
mod pacing;

pub use cards::{
    collect_cards, job_id_from_class, read_card, resolve_url, JobCard, RESULTS_CONTAINER,
};
pub use criteria::{
    job_type_checkbox_id, salary_menu_label, LocationFilter, Recency, SearchCriteria,
};
pub use engine::{JobSearcher, SearchSummary};
pub use fields::{
    clean_title, extract_detail, first_match, job_type_from_combo, join_unique, DetailExtraction,
    Strategy, DETAIL_PANE, PANE_TITLE,
};
pub use pacing::{DelayBand, Pacer};
