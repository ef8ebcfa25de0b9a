//! Local filesystem store.
//!
//! Keeps the list in a single JSON file. The version token is the SHA-256 of
//! the file bytes, so any edit between read and write (another run, a person
//! with an editor) is detected.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{PostingList, VersionToken};
use crate::storage::ListStore;

/// File-backed list store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn version_of(bytes: &[u8]) -> VersionToken {
        VersionToken::new(hex::encode(Sha256::digest(bytes)))
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn not_initialized(&self) -> AppError {
        AppError::NotInitialized {
            location: self.location(),
        }
    }
}

#[async_trait]
impl ListStore for LocalStore {
    async fn read(&self) -> Result<(VersionToken, PostingList)> {
        let bytes = self.read_bytes().await?.ok_or_else(|| self.not_initialized())?;
        let list = PostingList::from_json_slice(&bytes)?;
        Ok((Self::version_of(&bytes), list))
    }

    async fn write(
        &self,
        list: &PostingList,
        expected: &VersionToken,
        message: &str,
    ) -> Result<VersionToken> {
        let current = self.read_bytes().await?.ok_or_else(|| self.not_initialized())?;
        if Self::version_of(&current) != *expected {
            return Err(AppError::Conflict {
                location: self.location(),
            });
        }

        let bytes = list.to_json_pretty()?;
        self.write_bytes(&bytes).await?;
        log::info!("{} ({})", message, self.path.display());
        Ok(Self::version_of(&bytes))
    }

    async fn init(&self) -> Result<VersionToken> {
        if self.read_bytes().await?.is_some() {
            return Err(AppError::Conflict {
                location: self.location(),
            });
        }
        let bytes = PostingList::default().to_json_pretty()?;
        self.write_bytes(&bytes).await?;
        Ok(Self::version_of(&bytes))
    }

    fn location(&self) -> String {
        format!("local:{}", self.path.display())
    }
}
