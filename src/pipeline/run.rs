// src/pipeline/run.rs

//! One watch run: read → scrape → merge → write → announce.

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Config, Posting, VersionToken, to_kst};
use crate::notify::Notifier;
use crate::pipeline::merge::MergeEngine;
use crate::pipeline::order::order_for_notification;
use crate::pipeline::scrape::scrape_pages;
use crate::services::{ListingSource, PostingExtractor};
use crate::storage::ListStore;

/// Per-invocation switches layered over the configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Merge and preview, but neither write nor notify
    pub dry_run: bool,
    /// Refresh known postings; `config.merge.update_existing` also enables it
    pub update_existing: bool,
    /// Page range overriding `config.source`
    pub pages: Option<(u32, u32)>,
}

/// What a run did.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Raw records extracted across all pages
    pub scraped: usize,
    pub failed_pages: Vec<u32>,
    /// Pages whose items no longer match the selectors
    pub unparsed_pages: Vec<u32>,
    /// New postings in notification order
    pub new_records: Vec<Posting>,
    pub updated: usize,
    pub skipped: usize,
    /// Size of the merged list
    pub total: usize,
    pub written: bool,
    /// Version after the write, if one happened
    pub version: Option<VersionToken>,
    /// Messages delivered
    pub announced: usize,
}

impl RunSummary {
    pub fn new_count(&self) -> usize {
        self.new_records.len()
    }
}

/// Commit message recorded with every write.
pub fn commit_message(new_count: usize, total: usize, now: DateTime<Utc>) -> String {
    format!(
        "chore: upsert {} new items, total {} @ {}",
        new_count,
        total,
        now.to_rfc3339()
    )
}

/// Run the pipeline once.
///
/// Nothing is written when the store has no list yet, when the scrape comes
/// back empty, or when no posting is new. The write is committed before any
/// notification goes out, so a failed notification never loses the list.
pub async fn run_once(
    config: &Config,
    source: &dyn ListingSource,
    store: &dyn ListStore,
    notifier: &mut Notifier,
    options: &RunOptions,
    now: DateTime<Utc>,
) -> Result<RunSummary> {
    let (from, to) = options
        .pages
        .unwrap_or((config.source.page_from, config.source.page_to));
    let extractor = PostingExtractor::new(&config.source)?;

    let (version, persisted) = store.read().await?;
    log::info!(
        "Loaded {} postings from {} ({})",
        persisted.len(),
        store.location(),
        version
    );

    let scrape = scrape_pages(source, &extractor, from, to, config.source.page_delay()).await;
    if scrape.records.is_empty() {
        return Err(AppError::EmptyScrape { from, to });
    }

    let engine =
        MergeEngine::with_update_existing(options.update_existing || config.merge.update_existing);
    let merge = engine.merge(&persisted, &scrape.records, to_kst(now));

    let mut summary = RunSummary {
        scraped: scrape.records.len(),
        failed_pages: scrape.failed_pages,
        unparsed_pages: scrape.unparsed_pages,
        new_records: order_for_notification(&merge.new_records),
        updated: merge.updated.len(),
        skipped: merge.skipped,
        total: merge.merged.len(),
        ..RunSummary::default()
    };

    log::info!(
        "Scraped {} records: {} new, {} updated, {} skipped, {} total",
        summary.scraped,
        summary.new_count(),
        summary.updated,
        summary.skipped,
        summary.total
    );

    if !merge.has_new() {
        log::info!("No new postings; nothing to commit");
        return Ok(summary);
    }

    if options.dry_run {
        log::info!("Dry run: skipping write and notifications");
        Notifier::console().announce(&summary.new_records).await?;
        return Ok(summary);
    }

    let message = commit_message(summary.new_count(), summary.total, now);
    let new_version = store.write(&merge.merged, &version, &message).await?;
    log::info!("Committed to {} ({})", store.location(), new_version);
    summary.written = true;
    summary.version = Some(new_version);

    summary.announced = notifier
        .announce(&summary.new_records)
        .await
        .inspect_err(|e| log::error!("List committed but notification failed: {}", e))?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::models::{PostingList, RawPosting};
    use crate::notify::recording::{Recording, SendLog, sent_ids};
    use crate::pipeline::scrape::tests::{FakeSource, listing};
    use crate::storage::memory::MemoryStore;

    fn config() -> Config {
        let mut config = Config::default();
        config.source.page_delay_ms = 0;
        config.source.page_to = 2;
        config
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn stored(items: &[(&str, &str)]) -> PostingList {
        items
            .iter()
            .map(|(id, title)| {
                RawPosting {
                    id: Some(id.to_string()),
                    title: title.to_string(),
                    ..RawPosting::default()
                }
                .normalize()
                .unwrap()
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn recorder(log: &SendLog) -> Notifier {
        Notifier::new().with(Box::new(Recording::new("chat", log)))
    }

    #[tokio::test]
    async fn test_first_run_writes_and_announces_oldest_first() {
        let store = MemoryStore::with_list(PostingList::default());
        let source = FakeSource::default()
            .with_page(1, listing(&[("97003", "셋"), ("97001", "하나")]))
            .with_page(2, listing(&[("97002", "둘")]));
        let log = SendLog::default();

        let summary = run_once(
            &config(),
            &source,
            &store,
            &mut recorder(&log),
            &RunOptions::default(),
            now(),
        )
        .await
        .unwrap();

        assert_eq!(summary.scraped, 3);
        assert_eq!(summary.new_count(), 3);
        assert!(summary.written);
        assert_eq!(summary.announced, 3);
        assert_eq!(sent_ids(&log, None), vec!["97001", "97002", "97003"]);

        let list = store.list().unwrap();
        assert_eq!(list.ids(), vec!["97003", "97001", "97002"]);
        let stamp = list.as_slice()[0].added_at.unwrap();
        assert_eq!(stamp.to_rfc3339(), "2024-03-01T09:00:00+09:00");

        assert_eq!(
            store.write_messages(),
            vec!["chore: upsert 3 new items, total 3 @ 2024-03-01T00:00:00+00:00"]
        );
    }

    #[tokio::test]
    async fn test_nothing_new_skips_write_and_notify() {
        let store = MemoryStore::with_list(stored(&[("1", "하나")]));
        let source = FakeSource::default().with_page(1, listing(&[("1", "하나")]));
        let log = SendLog::default();

        let summary = run_once(
            &config(),
            &source,
            &store,
            &mut recorder(&log),
            &RunOptions::default(),
            now(),
        )
        .await
        .unwrap();

        assert_eq!(summary.new_count(), 0);
        assert!(!summary.written);
        assert!(store.write_messages().is_empty());
        assert!(sent_ids(&log, None).is_empty());
    }

    #[tokio::test]
    async fn test_uninitialized_store_aborts_before_scrape() {
        let store = MemoryStore::default();
        let source = FakeSource::default().with_page(1, listing(&[("1", "하나")]));
        let log = SendLog::default();

        let err = run_once(
            &config(),
            &source,
            &store,
            &mut recorder(&log),
            &RunOptions::default(),
            now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::NotInitialized { .. }));
        assert!(source.requested().is_empty());
        assert!(sent_ids(&log, None).is_empty());
    }

    #[tokio::test]
    async fn test_empty_scrape_aborts() {
        let store = MemoryStore::with_list(stored(&[("1", "하나")]));
        let source = FakeSource::default();
        let log = SendLog::default();

        let err = run_once(
            &config(),
            &source,
            &store,
            &mut recorder(&log),
            &RunOptions::default(),
            now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::EmptyScrape { from: 1, to: 2 }));
        assert!(store.write_messages().is_empty());
        assert_eq!(store.list().unwrap().ids(), vec!["1"]);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_store_untouched() {
        let store = MemoryStore::with_list(PostingList::default());
        let source = FakeSource::default().with_page(1, listing(&[("7", "일곱")]));
        let log = SendLog::default();
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };

        let summary = run_once(&config(), &source, &store, &mut recorder(&log), &options, now())
            .await
            .unwrap();

        assert_eq!(summary.new_count(), 1);
        assert!(!summary.written);
        assert!(store.list().unwrap().is_empty());
        assert!(sent_ids(&log, None).is_empty());
    }

    #[tokio::test]
    async fn test_page_override() {
        let store = MemoryStore::with_list(PostingList::default());
        let source = FakeSource::default()
            .with_page(1, listing(&[("1", "하나")]))
            .with_page(5, listing(&[("5", "다섯")]));
        let options = RunOptions {
            pages: Some((5, 5)),
            ..RunOptions::default()
        };

        let summary = run_once(
            &config(),
            &source,
            &store,
            &mut Notifier::new(),
            &options,
            now(),
        )
        .await
        .unwrap();

        assert_eq!(source.requested(), vec![5]);
        assert_eq!(summary.total, 1);
    }

    /// Commits a competing version while the page is being fetched.
    struct RacingSource {
        inner: FakeSource,
        store: Arc<MemoryStore>,
    }

    #[async_trait]
    impl ListingSource for RacingSource {
        async fn fetch_page(&self, page: u32) -> Result<String> {
            self.store.bump_version();
            self.inner.fetch_page(page).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_write_conflicts() {
        let store = Arc::new(MemoryStore::with_list(PostingList::default()));
        let source = RacingSource {
            inner: FakeSource::default().with_page(1, listing(&[("1", "하나")])),
            store: Arc::clone(&store),
        };
        let log = SendLog::default();

        let err = run_once(
            &config(),
            &source,
            store.as_ref(),
            &mut recorder(&log),
            &RunOptions::default(),
            now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
        assert!(err.is_retryable());
        assert!(store.list().unwrap().is_empty());
        assert!(sent_ids(&log, None).is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_commit() {
        let store = MemoryStore::with_list(PostingList::default());
        let source = FakeSource::default().with_page(1, listing(&[("2", "둘"), ("1", "하나")]));
        let log = SendLog::default();
        let mut notifier =
            Notifier::new().with(Box::new(Recording::new("chat", &log).failing_on("2")));

        let err = run_once(
            &config(),
            &source,
            &store,
            &mut notifier,
            &RunOptions::default(),
            now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::RateLimited { .. }));
        assert_eq!(store.list().unwrap().ids(), vec!["2", "1"]);
        assert_eq!(sent_ids(&log, None), vec!["1"]);
    }

    #[tokio::test]
    async fn test_update_existing_refreshes_and_keeps_stamp() {
        let mut old = RawPosting {
            id: Some("1".into()),
            title: "옛 제목".into(),
            ..RawPosting::default()
        }
        .normalize()
        .unwrap();
        let first_seen = to_kst(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        old.added_at = Some(first_seen);

        let store = MemoryStore::with_list(vec![old].into());
        let source = FakeSource::default()
            .with_page(1, listing(&[("2", "새 공모"), ("1", "새 제목")]));
        let options = RunOptions {
            update_existing: true,
            ..RunOptions::default()
        };

        let summary = run_once(
            &config(),
            &source,
            &store,
            &mut Notifier::new(),
            &options,
            now(),
        )
        .await
        .unwrap();

        assert_eq!(summary.new_count(), 1);
        assert_eq!(summary.updated, 1);

        let list = store.list().unwrap();
        let refreshed = list.iter().find(|p| p.id == "1").unwrap();
        assert_eq!(refreshed.title, "새 제목");
        assert_eq!(refreshed.added_at, Some(first_seen));
    }

    #[test]
    fn test_commit_message() {
        assert_eq!(
            commit_message(2, 40, now()),
            "chore: upsert 2 new items, total 40 @ 2024-03-01T00:00:00+00:00"
        );
    }
}
