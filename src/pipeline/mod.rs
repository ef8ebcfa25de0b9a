//! Pipeline entry points.
//!
//! - `run_once`: read the stored list, scrape, merge, write, announce
//! - `scrape_pages`: fetch and extract a page range
//! - `MergeEngine`: fold a scrape into the stored list

pub mod merge;
pub mod order;
pub mod run;
pub mod scrape;

pub use merge::{MergeEngine, MergeResult, merge_postings};
pub use order::order_for_notification;
pub use run::{RunOptions, RunSummary, commit_message, run_once};
pub use scrape::{ScrapeOutcome, scrape_pages};
