// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::error::{AppError, Result};
use crate::models::SourceConfig;

/// Create the browser-like client used for listing pages.
pub fn create_source_client(config: &SourceConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header_value("source.accept_language", &config.accept_language)?,
    );
    headers.insert(header::REFERER, header_value("source.base_url", &config.base_url)?);

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Create a plain API client (GitHub, Telegram).
pub fn create_api_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| AppError::config(format!("{name}: {e}")))
}

/// Whether a status is worth retrying after a pause.
pub fn is_transient(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Exponential backoff: `base * 2^attempt`.
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1u64 << attempt.min(16)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient() {
        assert!(is_transient(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_transient(reqwest::StatusCode::NOT_FOUND));
        assert!(!is_transient(reqwest::StatusCode::OK));
    }

    #[test]
    fn test_backoff_delay_doubles() {
        assert_eq!(backoff_delay(700, 0), Duration::from_millis(700));
        assert_eq!(backoff_delay(700, 1), Duration::from_millis(1400));
        assert_eq!(backoff_delay(700, 2), Duration::from_millis(2800));
    }

    #[test]
    fn test_source_client_builds_with_defaults() {
        assert!(create_source_client(&SourceConfig::default()).is_ok());
    }
}
