//! Destination that records sends, for tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::Posting;
use crate::notify::Destination;

/// One recorded send.
#[derive(Debug, Clone)]
pub struct Sent {
    pub destination: String,
    pub id: String,
    pub at: Instant,
}

/// Shared log of sends across destinations.
pub type SendLog = Arc<Mutex<Vec<Sent>>>;

/// Records every posting it is handed.
pub struct Recording {
    name: String,
    interval: Duration,
    log: SendLog,
    /// Fail with a rate limit on this id
    fail_on: Option<String>,
}

impl Recording {
    pub fn new(name: &str, log: &SendLog) -> Self {
        Self {
            name: name.to_string(),
            interval: Duration::ZERO,
            log: Arc::clone(log),
            fail_on: None,
        }
    }

    pub fn spaced(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.fail_on = Some(id.to_string());
        self
    }
}

#[async_trait]
impl Destination for Recording {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_interval(&self) -> Duration {
        self.interval
    }

    async fn send(&self, posting: &Posting) -> Result<()> {
        if self.fail_on.as_deref() == Some(posting.id.as_str()) {
            return Err(AppError::RateLimited {
                destination: self.name.clone(),
                attempts: 6,
            });
        }
        self.log.lock().unwrap().push(Sent {
            destination: self.name.clone(),
            id: posting.id.clone(),
            at: Instant::now(),
        });
        Ok(())
    }
}

/// Ids in send order, optionally for one destination.
pub fn sent_ids(log: &SendLog, destination: Option<&str>) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|s| destination.is_none_or(|d| s.destination == d))
        .map(|s| s.id.clone())
        .collect()
}
