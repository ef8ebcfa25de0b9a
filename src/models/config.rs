//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Upper bound for the per-chat spacing (one hour).
pub const MAX_PER_CHAT_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listing pages to scrape and how to fetch them
    #[serde(default)]
    pub source: SourceConfig,

    /// Merge behavior
    #[serde(default)]
    pub merge: MergeConfig,

    /// Where the posting list lives
    #[serde(default)]
    pub store: StoreConfig,

    /// Notification destinations
    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Overlay secrets and deployment knobs from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`; empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(token) = get("GH_PAT").or_else(|| get("GITHUB_TOKEN")) {
            self.store.github.token = token;
        }
        if let Some(backend) = get("STORE_BACKEND") {
            match backend.parse() {
                Ok(backend) => self.store.backend = backend,
                Err(e) => log::warn!("Ignoring STORE_BACKEND: {}", e),
            }
        }
        if let Some(bucket) = get("S3_BUCKET") {
            self.store.s3.bucket = bucket;
        }
        if let Some(key) = get("S3_KEY") {
            self.store.s3.key = key;
        }
        if let Some(token) = get("TG_BOT_TOKEN") {
            self.notify.telegram.bot_token = token;
        }
        if let Some(ids) = get("TG_CHAT_IDS") {
            self.notify.telegram.chat_ids = ids
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(secs) = get("TG_PER_CHAT_INTERVAL_SEC") {
            match secs.parse::<f64>() {
                Ok(secs) if secs.is_finite() && secs >= 0.0 => {
                    self.notify.telegram.per_chat_interval_ms = (secs * 1000.0).round() as u64;
                }
                _ => log::warn!("Ignoring TG_PER_CHAT_INTERVAL_SEC={:?}", secs),
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if self.source.page_from == 0 || self.source.page_from > self.source.page_to {
            return Err(AppError::validation(format!(
                "source page range {}..={} is empty",
                self.source.page_from, self.source.page_to
            )));
        }
        if !self.source.list_query.contains("{page}") {
            return Err(AppError::validation(
                "source.list_query must contain a {page} placeholder",
            ));
        }
        url::Url::parse(&self.source.base_url)
            .map_err(|e| AppError::validation(format!("source.base_url: {e}")))?;

        match self.store.backend {
            StoreBackend::Github => {
                let gh = &self.store.github;
                if gh.owner.trim().is_empty() || gh.repo.trim().is_empty() {
                    return Err(AppError::validation(
                        "store.github.owner and store.github.repo are required",
                    ));
                }
                if gh.path.trim().is_empty() {
                    return Err(AppError::validation("store.github.path is empty"));
                }
            }
            StoreBackend::Local => {
                if self.store.local.path.trim().is_empty() {
                    return Err(AppError::validation("store.local.path is empty"));
                }
            }
            StoreBackend::S3 => {
                if self.store.s3.bucket.trim().is_empty() || self.store.s3.key.trim().is_empty() {
                    return Err(AppError::validation(
                        "store.s3.bucket and store.s3.key are required",
                    ));
                }
            }
        }

        if self.notify.telegram.max_attempts == 0 {
            return Err(AppError::validation(
                "notify.telegram.max_attempts must be > 0",
            ));
        }
        if self.notify.telegram.per_chat_interval_ms > MAX_PER_CHAT_INTERVAL_MS {
            return Err(AppError::validation(format!(
                "notify.telegram.per_chat_interval_ms must be <= {MAX_PER_CHAT_INTERVAL_MS}"
            )));
        }
        Ok(())
    }
}

/// HTTP fetching and page range settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site root; relative links resolve against it
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Listing query, `{page}` is replaced by the page number
    #[serde(default = "defaults::list_query")]
    pub list_query: String,

    #[serde(default = "defaults::page_from")]
    pub page_from: u32,

    #[serde(default = "defaults::page_to")]
    pub page_to: u32,

    /// Delay after every page fetch, failed or not
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt on 429/5xx/transport errors
    #[serde(default = "defaults::fetch_retries")]
    pub max_retries: u32,

    /// Base of the exponential retry backoff
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Text a real listing page always contains
    #[serde(default = "defaults::page_marker")]
    pub page_marker: String,

    #[serde(default)]
    pub selectors: SelectorConfig,
}

impl SourceConfig {
    /// Absolute URL of a listing page.
    pub fn page_url(&self, page: u32) -> Result<String> {
        let base = url::Url::parse(&self.base_url)?;
        let query = self.list_query.replace("{page}", &page.to_string());
        Ok(base.join(&query)?.to_string())
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            list_query: defaults::list_query(),
            page_from: defaults::page_from(),
            page_to: defaults::page_to(),
            page_delay_ms: defaults::page_delay(),
            user_agent: defaults::user_agent(),
            accept_language: defaults::accept_language(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::fetch_retries(),
            retry_backoff_ms: defaults::retry_backoff(),
            page_marker: defaults::page_marker(),
            selectors: SelectorConfig::default(),
        }
    }
}

/// CSS selectors for the listing markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// One element per posting
    #[serde(default = "defaults::item_selector")]
    pub item: String,

    /// Items carrying this class are promoted ads and get skipped
    #[serde(default = "defaults::skip_class")]
    pub skip_class: String,

    /// Anchor holding title and link
    #[serde(default = "defaults::title_selector")]
    pub title: String,

    #[serde(default = "defaults::organizer_selector")]
    pub organizer: String,

    #[serde(default = "defaults::day_selector")]
    pub day: String,

    /// Status badge, looked up inside `day`
    #[serde(default = "defaults::status_selector")]
    pub status: String,

    #[serde(default = "defaults::views_selector")]
    pub views: String,

    #[serde(default = "defaults::category_selector")]
    pub category: String,

    /// Query parameter of the link carrying the posting id
    #[serde(default = "defaults::id_param")]
    pub id_param: String,

    /// Status used when `day` mentions it but has no badge
    #[serde(default = "defaults::closed_label")]
    pub closed_label: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            item: defaults::item_selector(),
            skip_class: defaults::skip_class(),
            title: defaults::title_selector(),
            organizer: defaults::organizer_selector(),
            day: defaults::day_selector(),
            status: defaults::status_selector(),
            views: defaults::views_selector(),
            category: defaults::category_selector(),
            id_param: defaults::id_param(),
            closed_label: defaults::closed_label(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Refresh descriptive fields of already-known postings
    #[serde(default)]
    pub update_existing: bool,
}

/// Which store backend holds the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Github,
    Local,
    S3,
}

impl std::str::FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "github" => Ok(Self::Github),
            "local" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            other => Err(AppError::config(format!("unknown store backend '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default)]
    pub github: GithubStoreConfig,

    #[serde(default)]
    pub local: LocalStoreConfig,

    #[serde(default)]
    pub s3: S3StoreConfig,
}

/// GitHub Contents API location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubStoreConfig {
    #[serde(default = "defaults::github_api")]
    pub api_base: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,

    #[serde(default = "defaults::list_path")]
    pub path: String,

    /// Empty means the repository's default branch
    #[serde(default = "defaults::branch")]
    pub branch: String,

    /// Taken from `GH_PAT` / `GITHUB_TOKEN`; never written back out
    #[serde(default, skip_serializing)]
    pub token: String,
}

impl Default for GithubStoreConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::github_api(),
            owner: String::new(),
            repo: String::new(),
            path: defaults::list_path(),
            branch: defaults::branch(),
            token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStoreConfig {
    #[serde(default = "defaults::list_path")]
    pub path: String,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            path: defaults::list_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StoreConfig {
    #[serde(default)]
    pub bucket: String,

    #[serde(default = "defaults::list_path")]
    pub key: String,
}

impl Default for S3StoreConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            key: defaults::list_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Print a plain-text preview of every new posting
    #[serde(default = "defaults::enabled")]
    pub console: bool,

    #[serde(default)]
    pub telegram: TelegramConfig,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            console: true,
            telegram: TelegramConfig::default(),
        }
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "defaults::telegram_api")]
    pub api_base: String,

    /// Taken from `TG_BOT_TOKEN`; never written back out
    #[serde(default, skip_serializing)]
    pub bot_token: String,

    #[serde(default)]
    pub chat_ids: Vec<String>,

    /// Minimum spacing between two sends to the same chat
    #[serde(default = "defaults::per_chat_interval")]
    pub per_chat_interval_ms: u64,

    #[serde(default)]
    pub disable_preview: bool,

    /// Total send attempts per message while rate limited
    #[serde(default = "defaults::telegram_attempts")]
    pub max_attempts: u32,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_ids.is_empty()
    }

    pub fn per_chat_interval(&self) -> Duration {
        Duration::from_millis(self.per_chat_interval_ms)
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::telegram_api(),
            bot_token: String::new(),
            chat_ids: Vec::new(),
            per_chat_interval_ms: defaults::per_chat_interval(),
            disable_preview: false,
            max_attempts: defaults::telegram_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Source defaults
    pub fn base_url() -> String {
        "https://www.wevity.com/".into()
    }
    pub fn list_query() -> String {
        "?c=find&s=1&gub=1&cidx=25&gp={page}".into()
    }
    pub fn page_from() -> u32 {
        1
    }
    pub fn page_to() -> u32 {
        3
    }
    pub fn page_delay() -> u64 {
        1600
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
            .into()
    }
    pub fn accept_language() -> String {
        "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7".into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn fetch_retries() -> u32 {
        3
    }
    pub fn retry_backoff() -> u64 {
        700
    }
    pub fn page_marker() -> String {
        "ms-list".into()
    }

    // Selector defaults
    pub fn item_selector() -> String {
        "div.ms-list ul.list > li".into()
    }
    pub fn skip_class() -> String {
        "top".into()
    }
    pub fn title_selector() -> String {
        "div.tit a".into()
    }
    pub fn organizer_selector() -> String {
        "div.organ".into()
    }
    pub fn day_selector() -> String {
        "div.day".into()
    }
    pub fn status_selector() -> String {
        "span.dday".into()
    }
    pub fn views_selector() -> String {
        "div.read".into()
    }
    pub fn category_selector() -> String {
        "div.sub-tit".into()
    }
    pub fn id_param() -> String {
        "ix".into()
    }
    pub fn closed_label() -> String {
        "마감".into()
    }

    // Store defaults
    pub fn github_api() -> String {
        "https://api.github.com".into()
    }
    pub fn list_path() -> String {
        "data/wevity_naming.json".into()
    }
    pub fn branch() -> String {
        "main".into()
    }

    // Notify defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn telegram_api() -> String {
        "https://api.telegram.org".into()
    }
    pub fn per_chat_interval() -> u64 {
        3200
    }
    pub fn telegram_attempts() -> u32 {
        6
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
