//! contest-watch CLI
//!
//! Local execution entry point. For AWS Lambda, use `contest-watch-lambda`.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use contest_watch::{
    error::{AppError, Result},
    models::Config,
    notify::Notifier,
    pipeline::{self, RunOptions},
    services::{HttpListingSource, PostingExtractor},
    storage,
};

/// contest-watch - naming contest watcher
#[derive(Parser, Debug)]
#[command(
    name = "contest-watch",
    version,
    about = "Watches wevity.com naming contests and announces new ones"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape, merge, commit and announce new postings
    Run {
        /// Merge and preview only; no write, no notifications
        #[arg(long)]
        dry_run: bool,

        /// Refresh fields of postings already in the list
        #[arg(long)]
        update_existing: bool,

        /// Page range, e.g. `1-3` or `2`
        #[arg(long, value_parser = parse_pages)]
        pages: Option<(u32, u32)>,
    },

    /// Print the scraped records as JSON without touching the store
    Scrape {
        /// Page range, e.g. `1-3` or `2`
        #[arg(long, value_parser = parse_pages)]
        pages: Option<(u32, u32)>,
    },

    /// Create an empty list in the configured store
    Init,

    /// Show store location, version and list size
    Info,

    /// Validate the configuration
    Validate,
}

/// Parse `A-B` or a single page `A`.
fn parse_pages(s: &str) -> std::result::Result<(u32, u32), String> {
    let (from, to) = s.split_once('-').unwrap_or((s, s));
    let parse = |p: &str| {
        p.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid page '{p}': {e}"))
    };
    let (from, to) = (parse(from)?, parse(to)?);
    if from == 0 || from > to {
        return Err(format!("empty page range {from}-{to}"));
    }
    Ok((from, to))
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };
    config.apply_env();
    init_logging(cli.verbose, &config.logging.level);

    if cli.config.exists() {
        log::info!("Loaded configuration from {}", cli.config.display());
    } else {
        log::warn!("{} not found, using defaults", cli.config.display());
    }

    match cli.command {
        Command::Run {
            dry_run,
            update_existing,
            pages,
        } => {
            config.validate()?;
            let store = storage::from_config(&config).await?;
            let source = HttpListingSource::new(&config.source)?;
            let mut notifier = Notifier::from_config(&config.notify)?;
            log::info!(
                "Store: {}; destinations: {:?}",
                store.location(),
                notifier.destination_names()
            );

            let options = RunOptions {
                dry_run,
                update_existing,
                pages,
            };
            let summary = pipeline::run_once(
                &config,
                &source,
                store.as_ref(),
                &mut notifier,
                &options,
                Utc::now(),
            )
            .await?;

            if !summary.failed_pages.is_empty() {
                log::warn!("Failed pages: {:?}", summary.failed_pages);
            }
            if !summary.unparsed_pages.is_empty() {
                log::warn!(
                    "Pages with unparsed items (check selectors): {:?}",
                    summary.unparsed_pages
                );
            }
            match &summary.version {
                Some(version) => log::info!(
                    "Committed {} new of {} total at {}; {} messages sent",
                    summary.new_count(),
                    summary.total,
                    version,
                    summary.announced
                ),
                None if summary.new_count() > 0 => {
                    log::info!("{} new postings previewed (dry run)", summary.new_count())
                }
                None => log::info!("No new postings (no commit)"),
            }
        }

        Command::Scrape { pages } => {
            let (from, to) = pages.unwrap_or((config.source.page_from, config.source.page_to));
            let source = HttpListingSource::new(&config.source)?;
            let extractor = PostingExtractor::new(&config.source)?;

            let outcome =
                pipeline::scrape_pages(&source, &extractor, from, to, config.source.page_delay())
                    .await;
            log::info!(
                "Scraped {} records from {} pages ({} failed)",
                outcome.records.len(),
                outcome.page_total,
                outcome.failed_pages.len()
            );
            println!("{}", serde_json::to_string_pretty(&outcome.records)?);
        }

        Command::Init => {
            config.validate()?;
            let store = storage::from_config(&config).await?;
            match store.init().await {
                Ok(version) => log::info!("Created empty list at {} ({})", store.location(), version),
                Err(AppError::Conflict { location }) => {
                    log::warn!("A list already exists at {}; leaving it alone", location);
                }
                Err(e) => return Err(e),
            }
        }

        Command::Info => {
            let store = storage::from_config(&config).await?;
            log::info!("Store: {}", store.location());
            log::info!(
                "Pages: {}..={} every {}ms",
                config.source.page_from,
                config.source.page_to,
                config.source.page_delay_ms
            );

            match store.read().await {
                Ok((version, list)) => {
                    log::info!("Version: {}", version);
                    log::info!("Postings: {}", list.len());
                    if let Some(latest) = list.iter().filter_map(|p| p.added_at).max() {
                        log::info!("Last added: {}", latest.to_rfc3339());
                    }
                }
                Err(AppError::NotInitialized { .. }) => {
                    log::info!("No list found yet. Run `contest-watch init`.");
                }
                Err(e) => return Err(e),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            PostingExtractor::new(&config.source)?;
            log::info!("✓ Config OK (selectors compile)");
        }
    }

    log::info!("Done!");

    Ok(())
}
