// src/error.rs

//! Unified error handling for contest-watch.

use std::fmt;

use thiserror::Error;

/// Result type alias for contest-watch operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Stored content was not valid base64
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A listing page could not be fetched
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// A raw record had neither an identifier nor a link
    #[error("Record has no 'id' or 'url' to key on (title: {title:?})")]
    MissingId { title: String },

    /// The store has never been initialized with a list
    #[error("No list found at {location}; run `init` or store '[]' there first")]
    NotInitialized { location: String },

    /// The version token presented on write is stale
    #[error("Write conflict at {location}: list changed since it was read")]
    Conflict { location: String },

    /// Any other store backend failure
    #[error("Store error at {location}: {message}")]
    Store { location: String, message: String },

    /// No records were extracted across all pages
    #[error("Scrape returned no records from pages {from}..={to}")]
    EmptyScrape { from: u32, to: u32 },

    /// A notification destination kept answering 429
    #[error("Rate limited by {destination} after {attempts} attempts")]
    RateLimited { destination: String, attempts: u32 },

    /// A notification destination rejected a message
    #[error("Notification to {destination} failed: {message}")]
    Notify {
        destination: String,
        message: String,
    },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error with the page URL as context.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a generic store error with its location.
    pub fn store(location: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Store {
            location: location.into(),
            message: message.to_string(),
        }
    }

    /// Create a notification error for a destination.
    pub fn notify(destination: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Notify {
            destination: destination.into(),
            message: message.to_string(),
        }
    }

    /// Whether re-invoking the whole run may succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_retryable() {
        let err = AppError::Conflict {
            location: "github:o/r/data.json".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn not_initialized_is_not_retryable() {
        let err = AppError::NotInitialized {
            location: "local:data.json".into(),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("local:data.json"));
    }
}
