//! Utility functions and helpers.

pub mod http;
pub mod url;

use std::sync::OnceLock;

use regex::Regex;

/// First integer in `text`, ignoring thousands separators.
pub fn parse_int(text: &str) -> Option<i64> {
    static INT: OnceLock<Regex> = OnceLock::new();
    let re = INT.get_or_init(|| Regex::new(r"-?\d+").expect("valid integer pattern"));

    let cleaned = text.replace(',', "");
    re.find(cleaned.trim())
        .and_then(|m| m.as_str().parse().ok())
}

/// Format `n` with `,` every three digits.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text for use inside a double-quoted HTML attribute.
pub fn escape_attr(text: &str) -> String {
    escape_html(text)
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
