//! Extraction run loop.
//!
//! ## Per (title, location) pair
//!
//! ```text
//! open search form → submit → apply filters (best effort)
//!   → for each results page: cards → dedup → click → detail pane → persist
//!   → next page until the pagination control disappears
//! ```
//!
//! Failures are contained at the smallest level that makes sense: a field
//! becomes `None`, a card is skipped, a pair is abandoned. Nothing is retried.

use super::cards::{collect_cards, read_card, JobCard, RESULTS_CONTAINER};
use super::criteria::{job_type_checkbox_id, salary_menu_label, LocationFilter, SearchCriteria};
use super::fields::{extract_detail, PANE_TITLE};
use super::pacing::{DelayBand, Pacer};
use crate::browser::{DriverError, ElementHandle, Page, WaitState};
use crate::job_store::JobStore;
use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const SEARCH_FORM: &str = "form#jobsearch";
const QUERY_INPUT: &str = "input[name='q']";
const LOCATION_INPUT: &str = "input[name='l']";
const SUBMIT_BUTTON: &str = "form#jobsearch button[type='submit']";
const NEXT_PAGE: &str = "a[data-testid='pagination-page-next']";

const JOB_TYPE_BUTTON: &str = "button#filter-jobtype1";
const JOB_TYPE_DIALOG: &str =
    "div[role='dialog'][aria-label='Edit Job type filter selection']:not([hidden])";
const JOB_TYPE_UPDATE: &str = "button[type='submit'][form='filter-jobtype1-menu']";

const FORM_TIMEOUT: Duration = Duration::from_secs(15);
const RESULTS_TIMEOUT: Duration = Duration::from_secs(20);
const FILTER_TIMEOUT: Duration = Duration::from_secs(10);
const PANE_TIMEOUT: Duration = Duration::from_secs(5);
const CLICK_TIMEOUT: Duration = Duration::from_secs(10);
const SCROLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Counters for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSummary {
    pub pairs_searched: usize,
    pub pairs_failed: usize,
    pub cards_seen: usize,
    pub skipped_no_id: usize,
    pub skipped_known: usize,
    pub persisted: usize,
    /// Persisted records where at least one field hit a driver error.
    pub partial: usize,
    pub failed: usize,
}

/// Drives one browser page through every configured search.
pub struct JobSearcher {
    page: Arc<dyn Page>,
    store: Arc<dyn JobStore>,
    criteria: SearchCriteria,
    base_url: String,
    pacer: Pacer,
}

async fn bounded<T>(
    what: &str,
    timeout: Duration,
    fut: impl Future<Output = Result<T, DriverError>>,
) -> Result<T, DriverError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout {
            selector: what.to_string(),
            timeout,
        }),
    }
}

impl JobSearcher {
    pub fn new(
        page: Arc<dyn Page>,
        store: Arc<dyn JobStore>,
        criteria: SearchCriteria,
        base_url: impl Into<String>,
        pacer: Pacer,
    ) -> Self {
        Self {
            page,
            store,
            criteria,
            base_url: base_url.into(),
            pacer,
        }
    }

    /// Run every (title, location) search once.
    pub async fn run(&self) -> SearchSummary {
        let mut summary = SearchSummary::default();
        let mut seen: HashSet<String> = HashSet::new();

        info!(
            "Starting extraction: {} titles x {} locations",
            self.criteria.job_titles.len(),
            self.criteria.locations.len()
        );

        for title in &self.criteria.job_titles {
            for location in &self.criteria.locations {
                match self
                    .search_pair(title, location, &mut seen, &mut summary)
                    .await
                {
                    Ok(()) => summary.pairs_searched += 1,
                    Err(e) => {
                        error!(
                            "Search for '{}' in '{}' abandoned: {:#}",
                            title, location.location, e
                        );
                        summary.pairs_failed += 1;
                    }
                }
                self.pacer.pause(DelayBand::Long).await;
            }
        }

        info!(
            "Extraction complete: {} cards seen, {} persisted ({} partial), {} already known, {} without id, {} failed",
            summary.cards_seen,
            summary.persisted,
            summary.partial,
            summary.skipped_known,
            summary.skipped_no_id,
            summary.failed
        );
        summary
    }

    async fn search_pair(
        &self,
        title: &str,
        location: &LocationFilter,
        seen: &mut HashSet<String>,
        summary: &mut SearchSummary,
    ) -> Result<()> {
        info!(
            "Searching for '{}' in '{}' (date posted: {})",
            title, location.location, location.date_posted
        );

        self.submit_search(title, &location.location).await?;
        self.apply_filters(location).await;

        info!(
            "Results loaded, extracting '{}' in '{}'",
            title, location.location
        );

        loop {
            let cards = collect_cards(self.page.as_ref())
                .await
                .context("Failed to collect result cards")?;
            if cards.is_empty() {
                warn!(
                    "No job cards found for '{}' in '{}'",
                    title, location.location
                );
                break;
            }
            info!("Found {} job cards on page", cards.len());

            for (i, card) in cards.iter().enumerate() {
                self.process_card(i + 1, cards.len(), *card, seen, summary)
                    .await;
            }

            if !self.next_page().await {
                break;
            }
        }
        Ok(())
    }

    async fn require(&self, selector: &str) -> Result<ElementHandle> {
        self.page
            .query(selector)
            .await?
            .ok_or_else(|| anyhow!("Search form has no element matching '{}'", selector))
    }

    async fn submit_search(&self, title: &str, location: &str) -> Result<()> {
        let page = self.page.as_ref();
        page.goto(&self.base_url)
            .await
            .with_context(|| format!("Failed to open {}", self.base_url))?;
        page.wait_for_selector(SEARCH_FORM, FORM_TIMEOUT, WaitState::Attached)
            .await
            .context("Search form did not load")?;

        let query = self.require(QUERY_INPUT).await?;
        page.fill(query, title).await?;
        let where_input = self.require(LOCATION_INPUT).await?;
        page.fill(where_input, location).await?;
        let submit = self.require(SUBMIT_BUTTON).await?;
        page.click_and_navigate(submit, RESULTS_TIMEOUT)
            .await
            .context("Search did not load a results page")?;

        page.wait_for_selector(RESULTS_CONTAINER, RESULTS_TIMEOUT, WaitState::Attached)
            .await
            .context("Search results did not load")?;
        Ok(())
    }

    async fn apply_filters(&self, location: &LocationFilter) {
        if let Some(label) = location.recency().menu_label() {
            info!("Applying '{}' date posted filter", label);
            if let Err(e) = self.apply_menu_filter("fromAge_filter_button", label).await {
                warn!("Date posted filter not applied: {}", e);
            }
        }

        if let Some(salary_min) = self.criteria.salary_min {
            match salary_menu_label(salary_min) {
                Some(label) => {
                    info!("Applying '{}' pay filter", label);
                    if let Err(e) = self.apply_menu_filter("salaryType_filter_button", label).await
                    {
                        warn!("Pay filter not applied: {}", e);
                    }
                }
                None => warn!("No pay filter matches salary floor {}", salary_min),
            }
        }

        let checkbox_ids: Vec<&'static str> = self
            .criteria
            .job_types
            .iter()
            .filter_map(|job_type| {
                let id = job_type_checkbox_id(job_type);
                if id.is_none() {
                    warn!("Unknown job type filter '{}' ignored", job_type);
                }
                id
            })
            .collect();
        if !checkbox_ids.is_empty() {
            info!("Applying job type filter: {}", checkbox_ids.join(", "));
            if let Err(e) = self.apply_job_type_filter(&checkbox_ids).await {
                warn!("Job type filter not applied: {}", e);
            }
        }
    }

    async fn apply_menu_filter(&self, button_id: &str, label: &str) -> Result<(), DriverError> {
        let page = self.page.as_ref();
        let button = page
            .wait_for_selector(
                &format!("button#{}", button_id),
                FILTER_TIMEOUT,
                WaitState::Attached,
            )
            .await?;
        page.click(button).await?;
        self.pacer.pause(DelayBand::Short).await;

        page.wait_for_selector(
            &format!(
                "div[role='menu'][aria-labelledby='{}']:not([hidden])",
                button_id
            ),
            FILTER_TIMEOUT,
            WaitState::Attached,
        )
        .await?;
        let option = page
            .wait_for_selector(
                &format!("a[aria-label='{}']", label),
                FILTER_TIMEOUT,
                WaitState::Attached,
            )
            .await?;
        page.click_and_navigate(option, RESULTS_TIMEOUT).await?;

        page.wait_for_selector(RESULTS_CONTAINER, RESULTS_TIMEOUT, WaitState::Attached)
            .await?;
        info!("'{}' filter applied", label);
        self.pacer.pause(DelayBand::Short).await;
        Ok(())
    }

    async fn apply_job_type_filter(&self, checkbox_ids: &[&str]) -> Result<(), DriverError> {
        let page = self.page.as_ref();
        let button = page
            .wait_for_selector(JOB_TYPE_BUTTON, FILTER_TIMEOUT, WaitState::Attached)
            .await?;
        page.click(button).await?;
        self.pacer.pause(DelayBand::Short).await;
        page.wait_for_selector(JOB_TYPE_DIALOG, FILTER_TIMEOUT, WaitState::Attached)
            .await?;

        for id in checkbox_ids {
            match page.query(&format!("input#{}", id)).await? {
                Some(checkbox) => {
                    if !page.is_checked(checkbox).await? {
                        page.click(checkbox).await?;
                        self.pacer.settle(200).await;
                    }
                    debug!("Selected job type checkbox {}", id);
                }
                None => warn!("Job type checkbox '{}' not found", id),
            }
        }

        match page.query(JOB_TYPE_UPDATE).await? {
            Some(update) => {
                page.click_and_navigate(update, RESULTS_TIMEOUT).await?;
                page.wait_for_selector(RESULTS_CONTAINER, RESULTS_TIMEOUT, WaitState::Attached)
                    .await?;
                info!("Job type filter applied");
            }
            None => warn!("Job type filter has no update button"),
        }
        self.pacer.pause(DelayBand::Short).await;
        Ok(())
    }

    fn is_known(&self, job_id: &str, seen: &HashSet<String>) -> Result<bool> {
        if seen.contains(job_id) {
            return Ok(true);
        }
        self.store.exists(job_id)
    }

    async fn process_card(
        &self,
        position: usize,
        total: usize,
        card: ElementHandle,
        seen: &mut HashSet<String>,
        summary: &mut SearchSummary,
    ) {
        let page = self.page.as_ref();
        summary.cards_seen += 1;

        let job_card: JobCard = match read_card(page, card, &self.base_url).await {
            Ok(Some(job_card)) => job_card,
            Ok(None) => {
                warn!("Card {}: could not determine job id, skipping", position);
                summary.skipped_no_id += 1;
                return;
            }
            Err(e) => {
                warn!("Card {}: failed to read card: {}", position, e);
                summary.failed += 1;
                return;
            }
        };
        let job_id = job_card.job_id.clone();
        let label = job_card.title.clone().unwrap_or_default();

        match self.is_known(&job_id, seen) {
            Ok(true) => {
                debug!(job_id = %job_id, "Card {}: '{}' already processed", position, label);
                summary.skipped_known += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                error!(job_id = %job_id, "Card {}: dedup lookup failed: {:#}", position, e);
                summary.failed += 1;
                return;
            }
        }

        info!(job_id = %job_id, "Processing card {}/{}: '{}'", position, total, label);

        let activated = async {
            bounded(
                "scroll to card",
                SCROLL_TIMEOUT,
                page.scroll_into_view(job_card.target),
            )
            .await?;
            self.pacer.settle(200).await;
            bounded("click card", CLICK_TIMEOUT, page.click(job_card.target)).await
        };
        if let Err(e) = activated.await {
            error!(job_id = %job_id, "Failed to click job card '{}': {}", label, e);
            summary.failed += 1;
            return;
        }

        match page
            .wait_for_selector(PANE_TITLE, PANE_TIMEOUT, WaitState::Visible)
            .await
        {
            Ok(_) => self.pacer.settle(1_200).await,
            Err(e) => warn!(
                job_id = %job_id,
                "Detail pane did not finish loading ({}), extracting what is there", e
            ),
        }

        let detail = extract_detail(page, &job_card).await;
        seen.insert(job_id.clone());
        if detail.is_partial() {
            warn!(
                job_id = %job_id,
                "Partial extraction {:?}, errors: {}",
                detail.job,
                detail.errors.join("; ")
            );
        }

        match self.store.insert_or_ignore(&detail.job) {
            Ok(true) => {
                info!(job_id = %job_id, "Stored '{}'", detail.job.title.as_deref().unwrap_or(""));
                summary.persisted += 1;
                if detail.is_partial() {
                    summary.partial += 1;
                }
            }
            Ok(false) => {
                debug!(job_id = %job_id, "Already stored by another run");
                summary.skipped_known += 1;
            }
            Err(e) => {
                error!(job_id = %job_id, "Failed to store job: {:#}", e);
                summary.failed += 1;
            }
        }

        self.pacer.pause(DelayBand::Medium).await;
    }

    /// Follow the pagination control. False when there is no further page.
    async fn next_page(&self) -> bool {
        match self.try_next_page().await {
            Ok(advanced) => advanced,
            Err(e) => {
                warn!("Error moving to next page: {}", e);
                false
            }
        }
    }

    async fn try_next_page(&self) -> Result<bool, DriverError> {
        let page = self.page.as_ref();
        let Some(next) = page.query(NEXT_PAGE).await? else {
            info!("No next page, pagination complete");
            return Ok(false);
        };
        if !page.is_visible(next).await? {
            info!("Next page control hidden, pagination complete");
            return Ok(false);
        }

        info!("Moving to next results page");
        bounded("scroll to next page", SCROLL_TIMEOUT, page.scroll_into_view(next)).await?;
        self.pacer.settle(500).await;
        page.click_and_navigate(next, RESULTS_TIMEOUT).await?;
        page.wait_for_selector(RESULTS_CONTAINER, RESULTS_TIMEOUT, WaitState::Attached)
            .await?;
        self.pacer.pause(DelayBand::Medium).await;
        Ok(true)
    }
}
