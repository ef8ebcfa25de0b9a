//! AWS Lambda entry point for contest-watch.
//!
//! Build with `cargo lambda build --release --features lambda`.
//!
//! ## Environment Variables
//!
//! - `CONFIG_PATH`: bundled config file (default: `config.toml`)
//! - `STORE_BACKEND`: `github`, `local` or `s3`
//! - `GH_PAT` / `GITHUB_TOKEN`: GitHub token for the `github` store
//! - `S3_BUCKET`, `S3_KEY`: object holding the list for the `s3` store
//! - `TG_BOT_TOKEN`, `TG_CHAT_IDS`: Telegram bot and comma separated chats
//! - `RUST_LOG`: Log level (e.g., `info`, `debug`)

use lambda_runtime::service_fn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("contest-watch Lambda starting...");
    lambda_runtime::run(service_fn(contest_watch::lambda::handler)).await
}
