//! Announcing new postings.
//!
//! The `Notifier` walks postings one by one and hands each to every
//! destination in turn. Each destination declares a minimum spacing between
//! its own sends, enforced here no matter how the destination fares with
//! rate limits.

pub mod console;
pub mod message;
#[cfg(test)]
pub(crate) mod recording;
pub mod telegram;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::Result;
use crate::models::{NotifyConfig, Posting};

pub use console::Console;
pub use telegram::TelegramChat;

/// Somewhere a posting can be announced.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Minimum time between the end of one send and the start of the next.
    fn min_interval(&self) -> Duration {
        Duration::ZERO
    }

    /// Deliver one message for `posting`.
    async fn send(&self, posting: &Posting) -> Result<()>;
}

/// Enforces a minimum spacing between consecutive sends.
#[derive(Debug)]
struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    async fn ready(&self) {
        if let Some(last) = self.last {
            let wait = self.interval.saturating_sub(last.elapsed());
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
    }

    fn mark(&mut self) {
        self.last = Some(Instant::now());
    }
}

struct Lane {
    destination: Box<dyn Destination>,
    pacer: Pacer,
}

/// Fans postings out to the configured destinations.
#[derive(Default)]
pub struct Notifier {
    lanes: Vec<Lane>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Console preview only.
    pub fn console() -> Self {
        Self::new().with(Box::new(Console))
    }

    /// Destinations enabled in `config`.
    ///
    /// Telegram is left out, with a log line, when token or chat ids are missing.
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        let mut notifier = Self::new();
        if config.console {
            notifier = notifier.with(Box::new(Console));
        }

        if config.telegram.is_configured() {
            for chat in TelegramChat::from_config(&config.telegram)? {
                notifier = notifier.with(Box::new(chat));
            }
        } else {
            log::info!("Telegram token or chat ids not set; skipping Telegram");
        }
        Ok(notifier)
    }

    /// Add a destination after the existing ones.
    pub fn with(mut self, destination: Box<dyn Destination>) -> Self {
        let pacer = Pacer::new(destination.min_interval());
        self.lanes.push(Lane { destination, pacer });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn destination_names(&self) -> Vec<&str> {
        self.lanes.iter().map(|l| l.destination.name()).collect()
    }

    /// Announce `postings` in the given order.
    ///
    /// Stops at the first failed send. Returns the number of messages sent.
    pub async fn announce(&mut self, postings: &[Posting]) -> Result<usize> {
        let mut sent = 0;
        for posting in postings {
            for lane in &mut self.lanes {
                lane.pacer.ready().await;
                let result = lane.destination.send(posting).await;
                lane.pacer.mark();
                result?;
                log::debug!("Sent {} to {}", posting.id, lane.destination.name());
                sent += 1;
            }
        }
        Ok(sent)
    }
}
