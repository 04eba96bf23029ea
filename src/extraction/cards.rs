//! Result card discovery and job identifier derivation.

use super::fields::non_empty;
use crate::browser::{DriverError, ElementHandle, Page};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use tracing::warn;

/// Container that holds the rendered result list.
pub const RESULTS_CONTAINER: &str = "div#mosaic-provider-jobcards ul";

const CARD_ITEMS: &str = "div#mosaic-provider-jobcards ul > li";
const CARD_OUTLINE: &str = "div.cardOutline";
const CARD_FALLBACK: &str = "div.job_seen_beacon";
const CARD_ANCHOR: &str = "h2.jobTitle a[data-jk], a.jcs-JobTitle[data-jk]";
const ANCHOR_TITLE: &str = "span[title]";
const OUTLINE_TITLE_ATTR: &str = "h2.jobTitle span[title], h2.jobTitle a span[title]";
const OUTLINE_TITLE_TEXT: &str = "h2.jobTitle span, h2.jobTitle a";

lazy_static! {
    static ref JOB_CLASS: Regex =
        Regex::new(r"\bjob_([a-f0-9]{16})\b").expect("valid job class regex");
}

/// A result card whose job identifier could be derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCard {
    pub job_id: String,
    /// Title as shown on the card, used when the detail pane has none.
    pub title: Option<String>,
    pub url: Option<String>,
    /// Element to click to load the detail pane.
    pub target: ElementHandle,
}

/// Identifier embedded in a card's class list (`job_<16 hex digits>`).
pub fn job_id_from_class(classes: &str) -> Option<String> {
    JOB_CLASS
        .captures(classes)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Absolute posting URL for a card link.
pub fn resolve_url(base_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(String::from)
}

/// Every result card on the current page, in display order.
pub async fn collect_cards(page: &dyn Page) -> Result<Vec<ElementHandle>, DriverError> {
    let mut cards = Vec::new();
    for item in page.query_all(CARD_ITEMS).await? {
        if page.query_within(item, CARD_OUTLINE).await?.is_some() {
            cards.push(item);
        }
    }
    if cards.is_empty() {
        cards = page.query_all(CARD_FALLBACK).await?;
        warn!(
            "Primary card selector found nothing, fallback found {} cards",
            cards.len()
        );
    }
    Ok(cards)
}

/// Derive identifier, title and link for one card.
///
/// Returns `Ok(None)` when no identifier strategy matched.
pub async fn read_card(
    page: &dyn Page,
    card: ElementHandle,
    base_url: &str,
) -> Result<Option<JobCard>, DriverError> {
    if let Some(anchor) = page.query_within(card, CARD_ANCHOR).await? {
        if let Some(job_id) = page
            .attribute(anchor, "data-jk")
            .await?
            .and_then(|id| non_empty(&id))
        {
            let title = match page.query_within(anchor, ANCHOR_TITLE).await? {
                Some(span) => page.attribute(span, "title").await?,
                None => Some(page.inner_text(anchor).await?),
            };
            let url = page
                .attribute(anchor, "href")
                .await?
                .and_then(|href| resolve_url(base_url, &href));
            return Ok(Some(JobCard {
                job_id,
                title: title.and_then(|t| non_empty(&t)),
                url,
                target: anchor,
            }));
        }
    }

    // Fallback cards may themselves be the outline
    let outline = page.query_within(card, CARD_OUTLINE).await?.unwrap_or(card);

    let job_id = match page
        .attribute(outline, "data-jk")
        .await?
        .and_then(|id| non_empty(&id))
    {
        Some(job_id) => Some(job_id),
        None => page
            .attribute(outline, "class")
            .await?
            .and_then(|classes| job_id_from_class(&classes)),
    };
    let Some(job_id) = job_id else {
        return Ok(None);
    };

    let title = match page.query_within(outline, OUTLINE_TITLE_ATTR).await? {
        Some(span) => page.attribute(span, "title").await?,
        None => match page.query_within(outline, OUTLINE_TITLE_TEXT).await? {
            Some(element) => Some(page.inner_text(element).await?),
            None => None,
        },
    };

    Ok(Some(JobCard {
        job_id,
        title: title.and_then(|t| non_empty(&t)),
        url: None,
        target: outline,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_from_class() {
        assert_eq!(
            job_id_from_class("cardOutline tapItem job_0123456789abcdef result"),
            Some("0123456789abcdef".to_string())
        );
        assert_eq!(job_id_from_class("cardOutline job_0123"), None);
        // Uppercase hex is not the site's format
        assert_eq!(job_id_from_class("job_0123456789ABCDEF"), None);
        assert_eq!(job_id_from_class("myjob_0123456789abcdef"), None);
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("https://ca.indeed.com", "/rc/clk?jk=abc&from=serp"),
            Some("https://ca.indeed.com/rc/clk?jk=abc&from=serp".to_string())
        );
        assert_eq!(
            resolve_url("https://ca.indeed.com/jobs?q=rust", "https://example.org/x"),
            Some("https://example.org/x".to_string())
        );
        assert_eq!(resolve_url("not a url", "/x"), None);
    }
}
