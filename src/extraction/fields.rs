//! Detail pane field extraction.
//!
//! Every field is described by an ordered list of [`Strategy`] values. They
//! are tried in order and the first one yielding non-empty text wins; a field
//! for which nothing matches is recorded as `None`. Driver failures inside a
//! field are contained to that field.

use super::cards::JobCard;
use crate::browser::{DriverError, Page};
use crate::job_store::NewJob;
use tracing::{debug, warn};

pub const DETAIL_PANE: &str = "div#jobsearch-ViewjobPaneWrapper";

/// Selector that becomes visible once the detail pane has loaded a posting.
pub const PANE_TITLE: &str = "div#jobsearch-ViewjobPaneWrapper h2.jobsearch-JobInfoHeader-title";

/// One way of locating a field's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Inner text of the first element matching the selector.
    Text(&'static str),
    /// Inner text of the first `inner` match under the first `outer` match.
    Within {
        outer: &'static str,
        inner: &'static str,
    },
    /// Texts of every `items` match under `container`, de-duplicated and
    /// joined with ", ".
    List {
        container: &'static str,
        items: &'static str,
    },
}

pub const TITLE: &[Strategy] = &[
    Strategy::Text(
        "div#jobsearch-ViewjobPaneWrapper h2[data-testid=\"jobsearch-JobInfoHeader-title\"] span, \
         div#jobsearch-ViewjobPaneWrapper h2.jobsearch-JobInfoHeader-title span",
    ),
    Strategy::Text(
        "div#jobsearch-ViewjobPaneWrapper h2[data-testid=\"jobsearch-JobInfoHeader-title\"], \
         div#jobsearch-ViewjobPaneWrapper h2.jobsearch-JobInfoHeader-title",
    ),
];

const COMPANY_INFO: &str =
    "div#jobsearch-ViewjobPaneWrapper div[data-testid=\"jobsearch-CompanyInfoContainer\"]";

pub const COMPANY: &[Strategy] = &[
    Strategy::Text("div#jobsearch-ViewjobPaneWrapper div[data-testid=\"inlineHeader-companyName\"] a"),
    Strategy::Within {
        outer: COMPANY_INFO,
        inner: "div > div:first-child > div:first-child a, div[data-company-name=\"true\"] > span > a",
    },
    Strategy::Within {
        outer: COMPANY_INFO,
        inner: "div > div:first-child > div:first-child > span, div[data-company-name=\"true\"]",
    },
];

pub const LOCATION: &[Strategy] = &[
    Strategy::Text(
        "div#jobsearch-ViewjobPaneWrapper div[data-testid=\"inlineHeader-companyLocation\"] > div",
    ),
    Strategy::Text(
        "div#jobsearch-ViewjobPaneWrapper div#jobLocationText \
         div[data-testid=\"jobsearch-JobInfoHeader-companyLocation\"]",
    ),
];

const SALARY_AND_TYPE: &str = "div#jobsearch-ViewjobPaneWrapper div#salaryInfoAndJobType";
const DETAILS_SECTION: &str = "div#jobsearch-ViewjobPaneWrapper div#jobDetailsSection";

pub const PAY: &[Strategy] = &[
    Strategy::Within {
        outer: SALARY_AND_TYPE,
        inner: "span",
    },
    Strategy::Within {
        outer: DETAILS_SECTION,
        inner: "div[aria-label=\"Pay\"] span, div[aria-label=\"Pay\"] li span",
    },
];

/// The combined "pay - job type" line; parsed with [`job_type_from_combo`].
pub const PAY_AND_TYPE_LINE: &[Strategy] = &[Strategy::Text(SALARY_AND_TYPE)];

pub const JOB_TYPE: &[Strategy] = &[Strategy::Within {
    outer: DETAILS_SECTION,
    inner: "div[aria-label=\"Job type\"] span, div[aria-label=\"Job type\"] li span",
}];

pub const SHIFT_AND_SCHEDULE: &[Strategy] = &[Strategy::List {
    container: "div#jobsearch-ViewjobPaneWrapper div#jobDetailsSection div[aria-label=\"Shift and schedule\"]",
    items: "ul li span, ul li div[data-testid*=\"-tile\"] span",
}];

pub const BENEFITS: &[Strategy] = &[Strategy::List {
    container: "div#jobsearch-ViewjobPaneWrapper div#benefits[data-testid=\"benefits-test\"]",
    items: "ul li",
}];

pub const DESCRIPTION: &str = "div#jobsearch-ViewjobPaneWrapper div#jobDescriptionText";

/// Trimmed text, `None` when blank.
pub fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Pane titles are sometimes suffixed with "- job post".
pub fn clean_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let without_suffix = trimmed
        .strip_suffix("- job post")
        .or_else(|| trimmed.strip_suffix("-job post"))
        .unwrap_or(trimmed);
    non_empty(without_suffix)
}

/// Separator between the pay and the job type on the combined line.
const COMBO_SEPARATOR: &str = " - ";

/// Pay wording that never appears in a job type.
fn looks_like_pay(text: &str) -> bool {
    let lower = text.to_lowercase();
    text.contains(['$', '€', '£'])
        || [" an hour", " a year", " a month", " a week", " a day"]
            .iter()
            .any(|unit| lower.contains(unit))
}

/// Job type from a combined line such as "$70,000 a year - Full-time".
pub fn job_type_from_combo(line: &str, pay: Option<&str>) -> Option<String> {
    let line = line.trim();
    let rest = match pay.map(str::trim).filter(|pay| !pay.is_empty()) {
        Some(pay) => {
            let rest = line.strip_prefix(pay)?.trim_start();
            rest.strip_prefix('-').unwrap_or(rest)
        }
        None => match line.rsplit_once(COMBO_SEPARATOR) {
            Some((_, rest)) => rest,
            None if looks_like_pay(line) => return None,
            None => line,
        },
    };
    non_empty(rest)
}

/// De-duplicates while keeping first-seen order.
pub fn join_unique(items: impl IntoIterator<Item = String>) -> Option<String> {
    let mut unique: Vec<String> = Vec::new();
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !unique.iter().any(|u| u == item) {
            unique.push(item.to_string());
        }
    }
    if unique.is_empty() {
        None
    } else {
        Some(unique.join(", "))
    }
}

async fn apply(page: &dyn Page, strategy: Strategy) -> Result<Option<String>, DriverError> {
    match strategy {
        Strategy::Text(selector) => match page.query(selector).await? {
            Some(element) => Ok(non_empty(&page.inner_text(element).await?)),
            None => Ok(None),
        },
        Strategy::Within { outer, inner } => {
            let Some(scope) = page.query(outer).await? else {
                return Ok(None);
            };
            match page.query_within(scope, inner).await? {
                Some(element) => Ok(non_empty(&page.inner_text(element).await?)),
                None => Ok(None),
            }
        }
        Strategy::List { container, items } => {
            let Some(scope) = page.query(container).await? else {
                return Ok(None);
            };
            let mut texts = Vec::new();
            for element in page.query_all_within(scope, items).await? {
                texts.push(page.inner_text(element).await?);
            }
            Ok(join_unique(texts))
        }
    }
}

/// First strategy that yields text.
pub async fn first_match(
    page: &dyn Page,
    strategies: &[Strategy],
) -> Result<Option<String>, DriverError> {
    for strategy in strategies {
        if let Some(text) = apply(page, *strategy).await? {
            return Ok(Some(text));
        }
    }
    Ok(None)
}

/// Result of reading one detail pane.
#[derive(Debug, Clone)]
pub struct DetailExtraction {
    pub job: NewJob,
    /// One entry per field whose extraction hit a driver error.
    pub errors: Vec<String>,
}

impl DetailExtraction {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

struct FieldReader<'a> {
    page: &'a dyn Page,
    job_id: &'a str,
    errors: Vec<String>,
}

impl FieldReader<'_> {
    async fn read(&mut self, field: &str, strategies: &[Strategy]) -> Option<String> {
        match first_match(self.page, strategies).await {
            Ok(value) => value,
            Err(e) => {
                warn!(job_id = %self.job_id, "Failed to extract {}: {}", field, e);
                self.errors.push(format!("{}: {}", field, e));
                None
            }
        }
    }

    async fn read_description(&mut self) -> (Option<String>, Option<String>) {
        let element = match self.page.query(DESCRIPTION).await {
            Ok(Some(element)) => element,
            Ok(None) => return (None, None),
            Err(e) => {
                warn!(job_id = %self.job_id, "Failed to locate description: {}", e);
                self.errors.push(format!("description: {}", e));
                return (None, None);
            }
        };
        let html = match self.page.inner_html(element).await {
            Ok(html) => non_empty(&html),
            Err(e) => {
                self.errors.push(format!("description_html: {}", e));
                None
            }
        };
        let text = match self.page.inner_text(element).await {
            Ok(text) => non_empty(&text),
            Err(e) => {
                self.errors.push(format!("description: {}", e));
                None
            }
        };
        (text, html)
    }
}

/// Read every field of the currently displayed detail pane for `card`.
pub async fn extract_detail(page: &dyn Page, card: &JobCard) -> DetailExtraction {
    let mut reader = FieldReader {
        page,
        job_id: &card.job_id,
        errors: Vec::new(),
    };

    let title = reader
        .read("title", TITLE)
        .await
        .and_then(|t| clean_title(&t))
        .or_else(|| card.title.clone());
    let company = reader.read("company", COMPANY).await;
    let location = reader.read("location", LOCATION).await;
    let pay = reader.read("pay", PAY).await;
    let job_type = match reader.read("job_type", PAY_AND_TYPE_LINE).await {
        Some(line) => job_type_from_combo(&line, pay.as_deref()),
        None => None,
    };
    let job_type = match job_type {
        Some(job_type) => Some(job_type),
        None => reader.read("job_type", JOB_TYPE).await,
    };
    let shift_and_schedule = reader.read("shift_and_schedule", SHIFT_AND_SCHEDULE).await;
    let benefits = reader.read("benefits", BENEFITS).await;
    let (description, description_html) = reader.read_description().await;

    debug!(
        job_id = %card.job_id,
        "Extracted title={:?} company={:?} location={:?}",
        title, company, location
    );

    let mut job = NewJob::new(card.job_id.clone());
    job.title = title;
    job.company = company;
    job.location = location;
    job.url = card.url.clone();
    job.pay = pay;
    job.job_type = job_type;
    job.shift_and_schedule = shift_and_schedule;
    job.benefits = benefits;
    job.description = description;
    job.description_html = description_html;

    DetailExtraction {
        job,
        errors: reader.errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title_strips_job_post_suffix() {
        assert_eq!(
            clean_title("Senior Rust Engineer - job post"),
            Some("Senior Rust Engineer".to_string())
        );
        assert_eq!(
            clean_title("  Data Analyst\n-job post "),
            Some("Data Analyst".to_string())
        );
        assert_eq!(clean_title("Postman"), Some("Postman".to_string()));
        assert_eq!(clean_title("- job post"), None);
    }

    #[test]
    fn test_job_type_from_combo_with_known_pay() {
        assert_eq!(
            job_type_from_combo("$70,000–$85,000 a year - Full-time", Some("$70,000–$85,000 a year")),
            Some("Full-time".to_string())
        );
    }

    #[test]
    fn test_job_type_from_combo_without_pay() {
        assert_eq!(
            job_type_from_combo("$25 an hour - Part-time", None),
            Some("Part-time".to_string())
        );
        assert_eq!(job_type_from_combo("$25 an hour", None), None);
        assert_eq!(
            job_type_from_combo("$25-$30 an hour - Contract", None),
            Some("Contract".to_string())
        );
        assert_eq!(job_type_from_combo("$25-$30 an hour", None), None);
    }

    #[test]
    fn test_job_type_from_combo_keeps_hyphenated_types() {
        assert_eq!(
            job_type_from_combo("Full-time", None),
            Some("Full-time".to_string())
        );
        assert_eq!(
            job_type_from_combo(" Part-time ", None),
            Some("Part-time".to_string())
        );
        assert_eq!(
            job_type_from_combo("$18–$22 an hour - Part-time", Some("$18–$22 an hour")),
            Some("Part-time".to_string())
        );
    }

    #[test]
    fn test_job_type_from_combo_pay_only() {
        assert_eq!(job_type_from_combo("$25 an hour", Some("$25 an hour")), None);
        // Line does not start with the pay text
        assert_eq!(job_type_from_combo("Contract", Some("$25 an hour")), None);
    }

    #[test]
    fn test_join_unique_keeps_order() {
        let items = vec![
            "Monday to Friday".to_string(),
            " 8 hour shift ".to_string(),
            "Monday to Friday".to_string(),
            "".to_string(),
        ];
        assert_eq!(
            join_unique(items),
            Some("Monday to Friday, 8 hour shift".to_string())
        );
        assert_eq!(join_unique(Vec::<String>::new()), None);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  \n "), None);
        assert_eq!(non_empty(" Acme "), Some("Acme".to_string()));
    }
}
