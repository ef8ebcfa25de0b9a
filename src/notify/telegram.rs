// src/notify/telegram.rs

//! Telegram Bot API destination.
//!
//! Each chat is its own destination, so the per-chat spacing applies to every
//! chat independently. Flood control (HTTP 429) is answered by waiting the
//! `retry_after` the API hands back.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Posting, TelegramConfig};
use crate::notify::{Destination, message};
use crate::utils::http::create_api_client;

/// Wait used when a 429 carries no usable `retry_after`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 3;
/// Added on top of every server-specified wait.
const RETRY_PADDING: Duration = Duration::from_millis(500);
const TIMEOUT_SECS: u64 = 20;
const USER_AGENT: &str = concat!("contest-watch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Outcome of a single delivery attempt.
#[derive(Debug)]
pub(crate) enum Attempt<T> {
    Done(T),
    RetryAfter(Duration),
}

/// Server-requested wait from a 429 body, falling back to the default.
fn parse_retry_after(body: &str) -> Duration {
    let secs = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.parameters)
        .and_then(|p| p.retry_after)
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
    Duration::from_secs(secs)
}

/// Run `attempt` until it is done, sleeping through rate limits.
///
/// Gives up with `AppError::RateLimited` after `max_attempts` rate-limited
/// tries. Any error from `attempt` ends the loop at once.
pub(crate) async fn with_rate_limit<T, F, Fut>(
    destination: &str,
    max_attempts: u32,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>>>,
{
    let max_attempts = max_attempts.max(1);
    for n in 1..=max_attempts {
        match attempt().await? {
            Attempt::Done(value) => return Ok(value),
            Attempt::RetryAfter(wait) => {
                log::warn!(
                    "{}: 429 Too Many Requests, waiting {:?} (attempt {}/{})",
                    destination,
                    wait,
                    n,
                    max_attempts
                );
                if n < max_attempts {
                    tokio::time::sleep(wait.saturating_add(RETRY_PADDING)).await;
                }
            }
        }
    }

    Err(AppError::RateLimited {
        destination: destination.to_string(),
        attempts: max_attempts,
    })
}

/// One Telegram chat.
pub struct TelegramChat {
    client: Client,
    endpoint: String,
    chat_id: String,
    name: String,
    disable_preview: bool,
    max_attempts: u32,
    interval: Duration,
}

impl TelegramChat {
    /// A destination per configured chat id, sharing one client.
    pub fn from_config(config: &TelegramConfig) -> Result<Vec<Self>> {
        let client = create_api_client(USER_AGENT, TIMEOUT_SECS)?;
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );

        Ok(config
            .chat_ids
            .iter()
            .map(|chat_id| chat_id.trim())
            .filter(|chat_id| !chat_id.is_empty())
            .map(|chat_id| Self {
                client: client.clone(),
                endpoint: endpoint.clone(),
                chat_id: chat_id.to_string(),
                name: format!("telegram:{chat_id}"),
                disable_preview: config.disable_preview,
                max_attempts: config.max_attempts,
                interval: config.per_chat_interval(),
            })
            .collect())
    }

    async fn try_send(&self, text: &str) -> Result<Attempt<()>> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: self.disable_preview,
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(Attempt::Done(()));
        }

        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(Attempt::RetryAfter(parse_retry_after(&text)));
        }

        let description = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.description)
            .unwrap_or(text);
        Err(AppError::notify(&self.name, format!("HTTP {status}: {description}")))
    }
}

#[async_trait]
impl Destination for TelegramChat {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_interval(&self) -> Duration {
        self.interval
    }

    async fn send(&self, posting: &Posting) -> Result<()> {
        let text = message::telegram_html(posting);
        with_rate_limit(&self.name, self.max_attempts, || self.try_send(&text)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_parse_retry_after() {
        let body = r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 7","parameters":{"retry_after":7}}"#;
        assert_eq!(parse_retry_after(body), Duration::from_secs(7));
    }

    #[test]
    fn test_parse_retry_after_defaults() {
        assert_eq!(parse_retry_after(r#"{"ok":false}"#), Duration::from_secs(3));
        assert_eq!(parse_retry_after("<html>"), Duration::from_secs(3));
        assert_eq!(parse_retry_after(""), Duration::from_secs(3));
    }

    #[test]
    fn test_one_destination_per_chat() {
        let config = TelegramConfig {
            bot_token: "123:abc".into(),
            chat_ids: vec!["-100200".into(), " ".into(), "42".into()],
            ..TelegramConfig::default()
        };
        let chats = TelegramChat::from_config(&config).unwrap();

        let names: Vec<&str> = chats.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["telegram:-100200", "telegram:42"]);
        assert_eq!(
            chats[0].endpoint,
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
        assert_eq!(chats[0].min_interval(), Duration::from_millis(3200));
    }

    #[test]
    fn test_payload_shape() {
        let body = SendMessage {
            chat_id: "42",
            text: "<b>x</b>",
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["parse_mode"], "HTML");
        assert_eq!(json["disable_web_page_preview"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_after_server_delay() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = with_rate_limit("telegram:42", 6, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Ok(Attempt::RetryAfter(Duration::from_secs(1)))
                } else {
                    Ok(Attempt::Done(n))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhausted() {
        let calls = AtomicU32::new(0);

        let err = with_rate_limit("telegram:42", 6, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, AppError>(Attempt::<()>::RetryAfter(Duration::from_secs(3))) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert!(matches!(err, AppError::RateLimited { attempts: 6, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_hard_error_stops_immediately() {
        let calls = AtomicU32::new(0);

        let err = with_rate_limit("telegram:42", 6, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<Attempt<()>, _>(AppError::notify("telegram:42", "HTTP 400")) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, AppError::Notify { .. }));
    }
}
