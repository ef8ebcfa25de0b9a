//! In-memory store for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{PostingList, VersionToken};
use crate::storage::ListStore;

/// Keeps the list in memory; versions count writes.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Option<(u64, PostingList)>>,
    writes: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn with_list(list: PostingList) -> Self {
        Self {
            state: Mutex::new(Some((1, list))),
            writes: Mutex::default(),
        }
    }

    pub fn list(&self) -> Option<PostingList> {
        self.state.lock().unwrap().as_ref().map(|(_, l)| l.clone())
    }

    /// Commit messages of every successful write.
    pub fn write_messages(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    /// Simulate a parallel run committing in between.
    pub fn bump_version(&self) {
        if let Some((version, _)) = self.state.lock().unwrap().as_mut() {
            *version += 1;
        }
    }

    fn token(version: u64) -> VersionToken {
        VersionToken::new(format!("v{version}"))
    }
}

#[async_trait]
impl ListStore for MemoryStore {
    async fn read(&self) -> Result<(VersionToken, PostingList)> {
        match self.state.lock().unwrap().as_ref() {
            Some((version, list)) => Ok((Self::token(*version), list.clone())),
            None => Err(AppError::NotInitialized {
                location: self.location(),
            }),
        }
    }

    async fn write(
        &self,
        list: &PostingList,
        expected: &VersionToken,
        message: &str,
    ) -> Result<VersionToken> {
        let mut state = self.state.lock().unwrap();
        let Some((version, stored)) = state.as_mut() else {
            return Err(AppError::NotInitialized {
                location: self.location(),
            });
        };
        if Self::token(*version) != *expected {
            return Err(AppError::Conflict {
                location: self.location(),
            });
        }
        *version += 1;
        *stored = list.clone();
        self.writes.lock().unwrap().push(message.to_string());
        Ok(Self::token(*version))
    }

    async fn init(&self) -> Result<VersionToken> {
        let mut state = self.state.lock().unwrap();
        if state.is_some() {
            return Err(AppError::Conflict {
                location: self.location(),
            });
        }
        *state = Some((1, PostingList::default()));
        Ok(Self::token(1))
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
