//! Merge of a fresh scrape into the persisted list.
//!
//! The merged list is `head ++ tail`:
//!
//! - **head**: every id of the scrape, once, in first-occurrence order, with
//!   its current value (new, refreshed or untouched)
//! - **tail**: persisted records the scrape did not mention, in their old order
//!
//! Nothing is ever dropped from the persisted list, and a record's `added_at`
//! is written once, when it is first seen.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset};

use crate::models::{Posting, PostingList, RawPosting};

/// Result of a merge.
#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    /// The list to persist
    pub merged: PostingList,
    /// Postings seen for the first time, in scrape order
    pub new_records: Vec<Posting>,
    /// Ids refreshed in update mode
    pub updated: Vec<String>,
    /// Scraped records dropped for lack of a key
    pub skipped: usize,
}

impl MergeResult {
    pub fn has_new(&self) -> bool {
        !self.new_records.is_empty()
    }
}

/// Merges scrapes into the persisted list.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    /// Refresh descriptive fields of already-known postings
    update_existing: bool,
}

impl MergeEngine {
    /// Engine that only adds new postings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that also refreshes known postings from the scrape.
    pub fn updating_existing() -> Self {
        Self {
            update_existing: true,
        }
    }

    pub fn with_update_existing(update_existing: bool) -> Self {
        Self { update_existing }
    }

    /// Merge `scraped` into `persisted`.
    pub fn merge(
        &self,
        persisted: &PostingList,
        scraped: &[RawPosting],
        added_at_stamp: DateTime<FixedOffset>,
    ) -> MergeResult {
        let mut skipped = 0;
        let scraped: Vec<Posting> = scraped
            .iter()
            .cloned()
            .filter_map(|raw| match raw.normalize() {
                Ok(posting) => Some(posting),
                Err(e) => {
                    log::warn!("Skipping scraped record: {}", e);
                    skipped += 1;
                    None
                }
            })
            .collect();

        // 1. Lookup of persisted records; the first copy of a duplicated id wins.
        let mut lookup: HashMap<&str, Posting> = HashMap::with_capacity(persisted.len());
        for posting in persisted {
            lookup
                .entry(posting.id.as_str())
                .or_insert_with(|| posting.clone());
        }

        // 2. Classify each scraped record.
        let mut new_records = Vec::new();
        let mut new_ids: HashSet<&str> = HashSet::new();
        let mut updated = Vec::new();
        for posting in &scraped {
            let id = posting.id.as_str();
            match lookup.get_mut(id) {
                None => {
                    let mut fresh = posting.clone();
                    if fresh.added_at.is_none() {
                        fresh.added_at = Some(added_at_stamp);
                    }
                    new_records.push(fresh.clone());
                    new_ids.insert(id);
                    lookup.insert(id, fresh);
                }
                Some(existing) if self.update_existing => {
                    existing.absorb(posting.clone());
                    if !new_ids.contains(id) && !updated.contains(&posting.id) {
                        updated.push(posting.id.clone());
                    }
                }
                Some(_) => {}
            }
        }

        // 3. Head: scrape order, first occurrence of each id.
        let mut seen: HashSet<&str> = HashSet::with_capacity(scraped.len());
        let mut merged = Vec::with_capacity(persisted.len() + new_records.len());
        for posting in &scraped {
            if seen.insert(posting.id.as_str()) {
                if let Some(current) = lookup.get(posting.id.as_str()) {
                    merged.push(current.clone());
                }
            }
        }

        // 4. Tail: persisted records the scrape did not mention.
        for posting in persisted {
            if seen.insert(posting.id.as_str()) {
                merged.push(posting.clone());
            }
        }

        MergeResult {
            merged: merged.into(),
            new_records,
            updated,
            skipped,
        }
    }
}

/// Convenience function for an add-only merge.
pub fn merge_postings(
    persisted: &PostingList,
    scraped: &[RawPosting],
    added_at_stamp: DateTime<FixedOffset>,
) -> MergeResult {
    MergeEngine::new().merge(persisted, scraped, added_at_stamp)
}
