// src/models/mod.rs

//! Domain models for contest-watch.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod posting;
mod version;

// Re-export all public types
pub use config::{
    Config, GithubStoreConfig, LocalStoreConfig, LoggingConfig, MergeConfig, NotifyConfig,
    S3StoreConfig, SelectorConfig, SourceConfig, StoreBackend, StoreConfig, TelegramConfig,
};
pub use posting::{KST_OFFSET_SECS, Posting, PostingList, RawPosting, to_kst};
pub use version::VersionToken;
