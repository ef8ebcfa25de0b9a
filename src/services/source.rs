// src/services/source.rs

//! Listing page fetcher.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::SourceConfig;
use crate::utils::http::{backoff_delay, create_source_client, is_transient};

/// Anything that can hand out the markup of a listing page.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Markup of page `page`, or an error if it could not be obtained.
    async fn fetch_page(&self, page: u32) -> Result<String>;
}

/// Fetches listing pages over HTTP.
pub struct HttpListingSource {
    config: SourceConfig,
    client: Client,
}

impl HttpListingSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            client: create_source_client(config)?,
        })
    }

    /// GET with bounded retry on 429/5xx and transport errors.
    async fn get_with_retry(&self, url: &str) -> Result<String> {
        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            let can_retry = attempt < max_retries;
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.text().await?);
                    }
                    if !(is_transient(status) && can_retry) {
                        return Err(AppError::fetch(url, format!("HTTP {status}")));
                    }
                    log::warn!("HTTP {} @ {}; retrying", status, url);
                }
                Err(e) if can_retry => {
                    log::warn!("Request to {} failed: {}; retrying", url, e);
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(backoff_delay(self.config.retry_backoff_ms, attempt)).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_page(&self, page: u32) -> Result<String> {
        let url = self.config.page_url(page)?;
        log::debug!("Fetching {}", url);

        let html = self.get_with_retry(&url).await?;

        // Block and challenge pages come back 200 without the listing.
        if !self.config.page_marker.is_empty() && !html.contains(&self.config.page_marker) {
            return Err(AppError::fetch(
                &url,
                format!("page marker '{}' not found", self.config.page_marker),
            ));
        }
        Ok(html)
    }
}
