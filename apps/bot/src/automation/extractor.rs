//! Posting Extractor — reads a focused posting view into a `Posting`.
//!
//! Every field read is guarded on its own. Only a missing title or URL makes
//! the posting unusable; a missing company or description degrades to an empty
//! string so cover-letter quality drops instead of the posting being lost.

use std::time::Duration;

use reqwest::Url;
use thiserror::Error;
use tracing::debug;

use crate::browser::{BrowserDriver, DriverError, ElementHandle, Locator, WaitCondition};
use crate::models::posting::job_id_of;
use crate::models::Posting;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Posting has no readable title")]
    MissingTitle,

    #[error("Posting has no resolvable URL")]
    MissingUrl,

    #[error("Driver error while extracting posting: {0}")]
    Driver(#[from] DriverError),
}

/// Where a platform shows the fields of the focused posting.
#[derive(Debug, Clone, Copy)]
pub struct PostingSelectors {
    pub title: Locator,
    pub company: Locator,
    pub description: Locator,
    /// Link inside a search result card, used when the page URL says nothing.
    pub card_link: Locator,
    /// Canonical job URL with an `{id}` placeholder.
    pub canonical_url: Option<&'static str>,
}

/// Focuses `card` and reads the posting it opens.
pub async fn extract(
    driver: &dyn BrowserDriver,
    selectors: &PostingSelectors,
    card: &ElementHandle,
    wait: Duration,
) -> Result<Posting, ExtractionError> {
    match driver.click(card).await {
        Ok(()) => {}
        Err(e) if e.is_absence() || matches!(e, DriverError::StaleElement) => {
            debug!("Posting card not clickable ({e}); reading current view");
        }
        Err(e) => return Err(e.into()),
    }

    let title = match driver
        .wait_for(selectors.title, WaitCondition::Present, wait)
        .await
    {
        Ok(el) => guarded_text(driver, &el).await?,
        Err(e) if e.is_absence() => String::new(),
        Err(e) => return Err(e.into()),
    };
    if title.is_empty() {
        return Err(ExtractionError::MissingTitle);
    }

    let company = read_optional(driver, selectors.company, "company").await?;
    let description = read_optional(driver, selectors.description, "description").await?;

    let url = resolve_url(driver, selectors, card).await?;

    Ok(Posting::new(
        title,
        company,
        description,
        &url,
        selectors.canonical_url,
    ))
}

async fn guarded_text(
    driver: &dyn BrowserDriver,
    element: &ElementHandle,
) -> Result<String, ExtractionError> {
    match driver.text(element).await {
        Ok(text) => Ok(text.trim().to_string()),
        Err(DriverError::StaleElement) => Ok(String::new()),
        Err(e) if e.is_absence() => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

async fn read_optional(
    driver: &dyn BrowserDriver,
    locator: Locator,
    field: &str,
) -> Result<String, ExtractionError> {
    match driver.find(locator).await {
        Ok(el) => guarded_text(driver, &el).await,
        Err(e) if e.is_absence() || matches!(e, DriverError::StaleElement) => {
            debug!("Posting {field} not present; continuing without it");
            Ok(String::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// The posting URL must name a job. A page still showing search results (the
/// card click was tolerated but did not focus the posting) falls back to the
/// card's own link.
async fn resolve_url(
    driver: &dyn BrowserDriver,
    selectors: &PostingSelectors,
    card: &ElementHandle,
) -> Result<String, ExtractionError> {
    let current = driver.current_url().await?;
    if job_id_of(&current).is_some() {
        return Ok(current);
    }

    let links = driver.find_in(card, selectors.card_link).await?;
    for link in links {
        let Ok(Some(href)) = driver.attribute(&link, "href").await else {
            continue;
        };
        if let Some(url) = absolute_url(&current, &href) {
            if job_id_of(&url).is_some() {
                return Ok(url);
            }
        }
    }
    debug!("No job id in page URL {current} or card link");
    Err(ExtractionError::MissingUrl)
}

/// Resolves a possibly relative `href` against the page URL.
fn absolute_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if let Ok(url) = Url::parse(href) {
        return Some(url.to_string());
    }
    Url::parse(base).ok()?.join(href).ok().map(|u| u.to_string())
}
