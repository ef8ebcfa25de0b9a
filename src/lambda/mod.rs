// src/lambda/mod.rs

//! AWS Lambda handler.
//!
//! One invocation is one watch run, typically fired by a schedule rule:
//! 1. Loads the configuration (bundled file, then environment overrides)
//! 2. Reads the stored list and scrapes the listing pages
//! 3. Commits the merged list when something is new
//! 4. Announces the new postings

use std::time::Instant;

use chrono::Utc;
use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::models::Config;
use crate::notify::Notifier;
use crate::pipeline::{RunOptions, RunSummary, run_once};
use crate::services::HttpListingSource;
use crate::storage;

/// Config file bundled with the function, overridable by `CONFIG_PATH`.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Lambda invocation payload.
#[derive(Debug, Default, Deserialize)]
pub struct WatchRequest {
    /// Merge and log, but neither write nor notify
    #[serde(default)]
    pub dry_run: bool,

    /// Refresh fields of postings already in the list
    #[serde(default)]
    pub update_existing: bool,
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
pub struct WatchResponse {
    pub success: bool,

    /// Raw records scraped across all pages
    pub scraped: usize,

    pub new_items: usize,

    /// Size of the list after the merge
    pub total: usize,

    /// Whether the list was committed
    pub written: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub execution_time_ms: u64,
}

impl From<&RunSummary> for WatchResponse {
    fn from(summary: &RunSummary) -> Self {
        Self {
            success: true,
            scraped: summary.scraped,
            new_items: summary.new_count(),
            total: summary.total,
            written: summary.written,
            error: None,
            execution_time_ms: 0,
        }
    }
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<WatchRequest>,
) -> std::result::Result<WatchResponse, LambdaError> {
    let start = Instant::now();
    let (request, _context) = event.into_parts();

    info!(
        "Starting run: dry_run={}, update_existing={}",
        request.dry_run, request.update_existing
    );

    match run_watch(&request).await {
        Ok(summary) => {
            let response = WatchResponse {
                execution_time_ms: start.elapsed().as_millis() as u64,
                ..WatchResponse::from(&summary)
            };
            info!(
                "Run completed: {} scraped, {} new, {} total in {}ms",
                response.scraped, response.new_items, response.total, response.execution_time_ms
            );
            Ok(response)
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Ok(WatchResponse {
                success: false,
                error: Some(e.to_string()),
                execution_time_ms: start.elapsed().as_millis() as u64,
                ..WatchResponse::default()
            })
        }
    }
}

/// Configuration for the Lambda environment.
fn load_lambda_config() -> Result<Config> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = Config::load_or_default(&path);
    config.apply_env();
    config.validate()?;
    Ok(config)
}

async fn run_watch(request: &WatchRequest) -> Result<RunSummary> {
    let config = load_lambda_config()?;

    let store = storage::from_config(&config).await?;
    let source = HttpListingSource::new(&config.source)?;
    let mut notifier = Notifier::from_config(&config.notify)?;
    let options = RunOptions {
        dry_run: request.dry_run,
        update_existing: request.update_existing,
        pages: None,
    };

    run_once(
        &config,
        &source,
        store.as_ref(),
        &mut notifier,
        &options,
        Utc::now(),
    )
    .await
}
