//! Search criteria and the listing site's filter vocabulary.

use serde::{Deserialize, Serialize};

/// One location to search, with its own recency window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationFilter {
    pub location: String,
    #[serde(default = "default_date_posted")]
    pub date_posted: String,
}

fn default_date_posted() -> String {
    "any".to_string()
}

impl LocationFilter {
    pub fn new(location: impl Into<String>, date_posted: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            date_posted: date_posted.into(),
        }
    }

    pub fn recency(&self) -> Recency {
        Recency::parse(&self.date_posted)
    }
}

/// Everything the extraction engine searches for in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub job_titles: Vec<String>,
    pub locations: Vec<LocationFilter>,
    pub salary_min: Option<u32>,
    pub job_types: Vec<String>,
}

impl SearchCriteria {
    /// Number of (title, location) searches a run performs.
    pub fn pair_count(&self) -> usize {
        self.job_titles.len() * self.locations.len()
    }
}

/// "Date posted" filter window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recency {
    Last24Hours,
    Last3Days,
    Last7Days,
    Last14Days,
    Any,
}

impl Recency {
    /// Unknown values fall back to the 7 day window.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "last_24_hours" => Recency::Last24Hours,
            "last_3_days" => Recency::Last3Days,
            "last_7_days" => Recency::Last7Days,
            "last_14_days" => Recency::Last14Days,
            "any" | "" => Recency::Any,
            _ => Recency::Last7Days,
        }
    }

    /// Menu entry label, `None` when no filter should be applied.
    pub fn menu_label(self) -> Option<&'static str> {
        match self {
            Recency::Last24Hours => Some("Last 24 hours"),
            Recency::Last3Days => Some("Last 3 days"),
            Recency::Last7Days => Some("Last 7 days"),
            Recency::Last14Days => Some("Last 14 days"),
            Recency::Any => None,
        }
    }
}

/// Menu entry label for a salary floor. Only the floors the site offers map.
pub fn salary_menu_label(salary_min: u32) -> Option<&'static str> {
    match salary_min {
        60_000 => Some("$60,000+"),
        80_000 => Some("$80,000+"),
        100_000 => Some("$100,000+"),
        _ => None,
    }
}

/// Checkbox id for a job type in the job type filter dialog.
pub fn job_type_checkbox_id(job_type: &str) -> Option<&'static str> {
    match job_type.trim() {
        "full_time" => Some("filter-jobtype1-0"),
        "permanent" => Some("filter-jobtype1-1"),
        "contract" => Some("filter-jobtype1-2"),
        "temporary" => Some("filter-jobtype1-4"),
        "part_time" => Some("filter-jobtype1-5"),
        "internship" => Some("filter-jobtype1-6"),
        _ => None,
    }
}
