// src/services/extract.rs

//! Listing markup → raw posting records.
//!
//! Field lookups are driven by the CSS selectors in `SelectorConfig`; an item
//! without a title anchor is not a posting and is skipped.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{RawPosting, SourceConfig};
use crate::utils::normalize_whitespace;
use crate::utils::url::{query_param, resolve};

/// Extracts postings from a listing page.
pub struct PostingExtractor {
    base_url: String,
    item: Selector,
    title: Selector,
    organizer: Selector,
    day: Selector,
    status: Selector,
    views: Selector,
    category: Selector,
    skip_class: String,
    id_param: String,
    closed_label: String,
    day_pattern: Regex,
}

impl PostingExtractor {
    /// Compile the configured selectors.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let sel = &config.selectors;
        Ok(Self {
            base_url: config.base_url.clone(),
            item: Self::parse_selector(&sel.item)?,
            title: Self::parse_selector(&sel.title)?,
            organizer: Self::parse_selector(&sel.organizer)?,
            day: Self::parse_selector(&sel.day)?,
            status: Self::parse_selector(&sel.status)?,
            views: Self::parse_selector(&sel.views)?,
            category: Self::parse_selector(&sel.category)?,
            skip_class: sel.skip_class.clone(),
            id_param: sel.id_param.clone(),
            closed_label: sel.closed_label.clone(),
            day_pattern: Regex::new(r"D-?\s*(\d+)")
                .map_err(|e| AppError::config(format!("day pattern: {e}")))?,
        })
    }

    /// All postings on the page, in presentation order.
    pub fn extract(&self, html: &str) -> Vec<RawPosting> {
        let document = Html::parse_document(html);
        document
            .select(&self.item)
            .filter(|li| !self.is_skipped(li))
            .filter_map(|li| self.parse_item(&li))
            .collect()
    }

    /// Number of listing items on the page, skipped ones excluded.
    pub fn count_items(&self, html: &str) -> usize {
        let document = Html::parse_document(html);
        document
            .select(&self.item)
            .filter(|li| !self.is_skipped(li))
            .count()
    }

    fn is_skipped(&self, li: &ElementRef) -> bool {
        !self.skip_class.is_empty() && li.value().classes().any(|c| c == self.skip_class)
    }

    fn parse_item(&self, li: &ElementRef) -> Option<RawPosting> {
        let anchor = li.select(&self.title).next()?;
        let title = compact_text(&anchor);
        let href = anchor.value().attr("href").unwrap_or("");
        let url = resolve(&self.base_url, href);
        let id = query_param(&url, &self.id_param);

        let organizer = li
            .select(&self.organizer)
            .next()
            .map(|el| compact_text(&el))
            .filter(|s| !s.is_empty());

        let (days_remaining, status) = self.parse_day_and_status(li);

        let views = li
            .select(&self.views)
            .next()
            .and_then(|el| crate::utils::parse_int(&compact_text(&el)))
            .and_then(|n| u64::try_from(n).ok());

        let category = li.select(&self.category).next().map(|el| {
            let text = spaced_text(&el);
            match text.split_once(':') {
                Some((_, rest)) => rest.trim().to_string(),
                None => text,
            }
        });

        Some(RawPosting {
            id,
            title,
            url: Some(url),
            organizer,
            days_remaining,
            status,
            views,
            category,
            ..RawPosting::default()
        })
    }

    fn parse_day_and_status(&self, li: &ElementRef) -> (Option<i64>, Option<String>) {
        let Some(day) = li.select(&self.day).next() else {
            return (None, None);
        };
        let text = spaced_text(&day);

        let days = self
            .day_pattern
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());

        let status = match day.select(&self.status).next() {
            Some(badge) => Some(compact_text(&badge)),
            None if !self.closed_label.is_empty() && text.contains(&self.closed_label) => {
                Some(self.closed_label.clone())
            }
            None => None,
        };

        (days, status)
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

/// Text nodes trimmed and concatenated.
fn compact_text(el: &ElementRef) -> String {
    el.text().map(str::trim).collect::<String>()
}

/// Text nodes joined by single spaces.
fn spaced_text(el: &ElementRef) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <div class="ms-list">
          <ul class="list">
            <li class="top">
              <div class="tit"><a href="?c=find&s=1&gub=1&cidx=25&ix=1">스폰서 광고</a></div>
            </li>
            <li>
              <div class="tit">
                <a href="?c=find&s=1&gub=1&cidx=25&ix=97001">
                  브랜드 네이밍 공모전
                </a>
                <div class="sub-tit">분야 : 네이밍/슬로건</div>
              </div>
              <div class="organ"> 한국관광공사 </div>
              <div class="day">D-12 <span class="dday">접수중</span></div>
              <div class="read">조회 1,234</div>
            </li>
            <li>
              <div class="tit"><a href="/detail/without-ix">슬로건 공모</a></div>
              <div class="day">마감</div>
            </li>
            <li><div class="organ">no title anchor</div></li>
          </ul>
        </div>
        </body></html>
    "#;

    fn extractor() -> PostingExtractor {
        PostingExtractor::new(&SourceConfig::default()).unwrap()
    }

    #[test]
    fn test_extract_fields() {
        let records = extractor().extract(PAGE);
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.id.as_deref(), Some("97001"));
        assert_eq!(first.title, "브랜드 네이밍 공모전");
        assert_eq!(
            first.url.as_deref(),
            Some("https://www.wevity.com/?c=find&s=1&gub=1&cidx=25&ix=97001")
        );
        assert_eq!(first.organizer.as_deref(), Some("한국관광공사"));
        assert_eq!(first.days_remaining, Some(12));
        assert_eq!(first.status.as_deref(), Some("접수중"));
        assert_eq!(first.views, Some(1234));
        assert_eq!(first.category.as_deref(), Some("네이밍/슬로건"));
        assert_eq!(first.added_at, None);
    }

    #[test]
    fn test_missing_id_keeps_link() {
        let records = extractor().extract(PAGE);
        let second = &records[1];

        assert_eq!(second.id, None);
        assert_eq!(
            second.url.as_deref(),
            Some("https://www.wevity.com/detail/without-ix")
        );
        assert_eq!(second.resolve_id().as_deref(), second.url.as_deref());
        assert_eq!(second.days_remaining, None);
        assert_eq!(second.status.as_deref(), Some("마감"));
        assert_eq!(second.organizer, None);
        assert_eq!(second.views, None);
    }

    #[test]
    fn test_count_skips_promoted() {
        assert_eq!(extractor().count_items(PAGE), 3);
    }

    #[test]
    fn test_page_without_list() {
        assert!(extractor().extract("<html><body>blocked</body></html>").is_empty());
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let mut config = SourceConfig::default();
        config.selectors.item = "[[invalid".to_string();
        assert!(PostingExtractor::new(&config).is_err());
    }
}
