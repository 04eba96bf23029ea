//! Fixture data: stores, listing-site HTML and scoring replies.

use super::constants::{results_url, BASE_URL};
use super::fixture_page::FixturePage;
use jobscout::job_store::NewJob;
use jobscout::SqliteJobStore;
use std::sync::Arc;
use tempfile::TempDir;

/// A fresh store in its own temporary directory. Keep the `TempDir` alive.
pub fn temp_store() -> (TempDir, Arc<SqliteJobStore>) {
    let dir = TempDir::new().unwrap();
    let store = SqliteJobStore::new(dir.path().join("db").join("jobs.sqlite")).unwrap();
    (dir, Arc::new(store))
}

/// A record with a description, ready to be scored.
pub fn new_job(job_id: &str, description: &str) -> NewJob {
    let mut job = NewJob::new(job_id);
    job.title = Some(format!("Engineer {}", job_id));
    job.company = Some("Acme".to_string());
    job.url = Some(format!("{}viewjob?jk={}", BASE_URL, job_id));
    job.description = Some(description.to_string());
    job
}

pub fn score_json(match_score: u8, likelihood_score: u8) -> String {
    format!(
        r#"{{"match_score": {}, "likelihood_score": {}, "match_reason": "Strong Rust background", "likelihood_reason": "Seniority fits"}}"#,
        match_score, likelihood_score
    )
}

/// One posting as it appears on the listing site.
#[derive(Debug, Clone)]
pub struct JobFixture {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub pay: String,
    pub job_type: String,
    pub description: String,
}

impl JobFixture {
    pub fn numbered(n: usize) -> Self {
        Self {
            job_id: format!("{:016x}", 0xabcd_0000_0000_0000u64 + n as u64),
            title: format!("Rust Developer {}", n),
            company: format!("Company {}", n),
            location: "Toronto, ON".to_string(),
            pay: "$100,000–$120,000 a year".to_string(),
            job_type: "Full-time".to_string(),
            description: format!("Build reliable services in Rust. Posting {}.", n),
        }
    }

    pub fn card_html(&self) -> String {
        format!(
            r#"<li><div class="cardOutline tapItem job_{id}"><h2 class="jobTitle"><a class="jcs-JobTitle" data-jk="{id}" href="/rc/clk?jk={id}" data-pane="{id}"><span title="{title}">{title}</span></a></h2><span class="companyName">{company}</span></div></li>"#,
            id = self.job_id,
            title = self.title,
            company = self.company,
        )
    }

    pub fn pane_html(&self) -> String {
        format!(
            r#"<h2 class="jobsearch-JobInfoHeader-title" data-testid="jobsearch-JobInfoHeader-title"><span>{title} - job post</span></h2>
<div data-testid="inlineHeader-companyName"><a href="/cmp/x">{company}</a></div>
<div data-testid="inlineHeader-companyLocation"><div>{location}</div></div>
<div id="salaryInfoAndJobType"><span>{pay}</span> - {job_type}</div>
<div id="benefits" data-testid="benefits-test"><ul><li>Dental care</li><li>Paid time off</li><li>Dental care</li></ul></div>
<div id="jobDescriptionText"><p>{description}</p></div>"#,
            title = self.title,
            company = self.company,
            location = self.location,
            pay = self.pay,
            job_type = self.job_type,
            description = self.description,
        )
    }
}

pub fn search_form_html() -> String {
    format!(
        r#"<form id="jobsearch"><input name="q" type="text"><input name="l" type="text"><button type="submit" data-goto="{}">Find jobs</button></form>"#,
        results_url(1)
    )
}

pub fn results_html(cards: &[JobFixture], next: Option<&str>) -> String {
    let items: String = cards.iter().map(JobFixture::card_html).collect();
    let pagination = match next {
        Some(url) => format!(
            r#"<nav><a data-testid="pagination-page-next" data-goto="{}">Next</a></nav>"#,
            url
        ),
        None => String::new(),
    };
    format!(
        r#"<div id="mosaic-provider-jobcards"><ul>{}</ul></div>{}"#,
        items, pagination
    )
}

/// Date posted, pay and job type filter controls. Every choice reloads
/// `target`.
pub fn filter_controls_html(target: &str) -> String {
    format!(
        r#"<div class="filters">
<button id="fromAge_filter_button">Date posted</button>
<div role="menu" aria-labelledby="fromAge_filter_button"><a aria-label="Last 24 hours" data-goto="{t}">Last 24 hours</a><a aria-label="Last 3 days" data-goto="{t}">Last 3 days</a></div>
<button id="salaryType_filter_button">Pay</button>
<div role="menu" aria-labelledby="salaryType_filter_button"><a aria-label="$60,000+" data-goto="{t}">$60,000+</a><a aria-label="$80,000+" data-goto="{t}">$80,000+</a></div>
<button id="filter-jobtype1">Job type</button>
<div role="dialog" aria-label="Edit Job type filter selection"><form id="filter-jobtype1-menu"><input type="checkbox" id="filter-jobtype1-0"><input type="checkbox" id="filter-jobtype1-5"></form><button type="submit" form="filter-jobtype1-menu" data-goto="{t}">Update</button></div>
</div>"#,
        t = target
    )
}

/// Search form at the base URL followed by one results page per slice,
/// linked by pagination, with a detail pane for every posting.
pub fn listing_site(pages: &[Vec<JobFixture>]) -> FixturePage {
    let mut site = FixturePage::new().with_page(BASE_URL, search_form_html());
    for (idx, cards) in pages.iter().enumerate() {
        let next = if idx + 1 < pages.len() {
            Some(results_url(idx + 2))
        } else {
            None
        };
        site = site.with_page(&results_url(idx + 1), results_html(cards, next.as_deref()));
        for job in cards {
            site = site.with_pane(&job.job_id, job.pane_html());
        }
    }
    site
}
