//! Storage backends for the posting list.
//!
//! The whole state of the system is one JSON array. Every backend hands out a
//! `VersionToken` on read and refuses a write whose token is stale, so two
//! overlapping runs cannot silently overwrite each other.
//!
//! | Backend  | Version token              | Conflict signal             |
//! |----------|----------------------------|-----------------------------|
//! | `github` | blob SHA of the file       | HTTP 409 / 412 on PUT       |
//! | `local`  | SHA-256 of the file bytes  | hash mismatch before rename |
//! | `s3`     | object ETag                | HTTP 412 on conditional PUT |

pub mod github;
pub mod local;
#[cfg(test)]
pub(crate) mod memory;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Config, PostingList, StoreBackend, VersionToken};

pub use github::GithubStore;
pub use local::LocalStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

/// A remote list with optimistic concurrency.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Current list and its version.
    ///
    /// Fails with `AppError::NotInitialized` if no list was ever stored.
    async fn read(&self) -> Result<(VersionToken, PostingList)>;

    /// Replace the list if it is still at `expected`.
    ///
    /// Fails with `AppError::Conflict` when `expected` is stale.
    async fn write(
        &self,
        list: &PostingList,
        expected: &VersionToken,
        message: &str,
    ) -> Result<VersionToken>;

    /// Create an empty list. Fails with `AppError::Conflict` if one exists.
    async fn init(&self) -> Result<VersionToken>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}

/// Build the backend selected in `config.store`.
pub async fn from_config(config: &Config) -> Result<Box<dyn ListStore>> {
    match config.store.backend {
        StoreBackend::Github => Ok(Box::new(GithubStore::new(&config.store.github)?)),
        StoreBackend::Local => Ok(Box::new(LocalStore::new(&config.store.local.path))),
        #[cfg(feature = "s3")]
        StoreBackend::S3 => Ok(Box::new(S3Store::from_config(&config.store.s3).await)),
        #[cfg(not(feature = "s3"))]
        StoreBackend::S3 => Err(crate::error::AppError::config(
            "store.backend = \"s3\" requires the `s3` feature",
        )),
    }
}
