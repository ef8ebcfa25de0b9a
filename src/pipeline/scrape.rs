// src/pipeline/scrape.rs

//! Sequential walk over the listing pages.

use std::time::Duration;

use crate::models::RawPosting;
use crate::services::{ListingSource, PostingExtractor};

/// Summary of a scrape.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    /// Raw records of all pages, in page then presentation order
    pub records: Vec<RawPosting>,
    pub page_total: usize,
    /// Pages whose fetch failed and contributed nothing
    pub failed_pages: Vec<u32>,
    /// Pages with listing items of which none parsed; selectors likely drifted
    pub unparsed_pages: Vec<u32>,
}

/// Fetch and extract pages `from..=to`, one after another.
///
/// A failed page is logged and skipped. `delay` is slept after every page,
/// failed or not, except when it is zero.
pub async fn scrape_pages(
    source: &dyn ListingSource,
    extractor: &PostingExtractor,
    from: u32,
    to: u32,
    delay: Duration,
) -> ScrapeOutcome {
    let mut outcome = ScrapeOutcome::default();

    for page in from..=to {
        outcome.page_total += 1;
        match source.fetch_page(page).await {
            Ok(html) => {
                let records = extractor.extract(&html);
                if records.is_empty() {
                    match extractor.count_items(&html) {
                        0 => log::warn!("Page {}: no listing items found", page),
                        items => {
                            log::warn!("Page {}: {} listing items but none parsed", page, items);
                            outcome.unparsed_pages.push(page);
                        }
                    }
                } else {
                    log::info!("Page {}: {} postings", page, records.len());
                }
                outcome.records.extend(records);
            }
            Err(error) => {
                log::warn!("Page {} failed: {}", page, error);
                outcome.failed_pages.push(page);
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    outcome
}
