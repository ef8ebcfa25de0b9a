//! Optimistic-concurrency token handed out by list stores.

use std::fmt;

/// Opaque marker of the stored list's state at read time.
///
/// Stores mint it on read and demand it back on write; everything in between
/// only carries it along.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
