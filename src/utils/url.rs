// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Resolve a potentially relative href against a base URL.
///
/// Unparseable input comes back unchanged.
///
/// # Examples
/// ```
/// use contest_watch::utils::url::resolve;
///
/// assert_eq!(
///     resolve("https://www.wevity.com/", "?c=find&s=1&ix=97001"),
///     "https://www.wevity.com/?c=find&s=1&ix=97001"
/// );
/// ```
pub fn resolve(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// First non-empty value of query parameter `key`.
///
/// # Examples
/// ```
/// use contest_watch::utils::url::query_param;
///
/// assert_eq!(
///     query_param("https://www.wevity.com/?c=find&ix=97001", "ix"),
///     Some("97001".to_string())
/// );
/// ```
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_url() {
        assert_eq!(
            resolve("https://www.wevity.com/", "https://other.com/page"),
            "https://other.com/page"
        );
    }

    #[test]
    fn test_resolve_query_only() {
        assert_eq!(
            resolve("https://www.wevity.com/index.php", "?c=find&ix=1"),
            "https://www.wevity.com/index.php?c=find&ix=1"
        );
    }

    #[test]
    fn test_resolve_bad_base_returns_href() {
        assert_eq!(resolve("not a url", "?ix=1"), "?ix=1");
    }

    #[test]
    fn test_query_param_missing_or_empty() {
        assert_eq!(query_param("https://x.test/?ix=&gp=2", "ix"), None);
        assert_eq!(query_param("https://x.test/?gp=2", "ix"), None);
        assert_eq!(query_param("relative?ix=3", "ix"), None);
    }
}
