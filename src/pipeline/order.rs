//! Delivery order of notifications.
//!
//! Source ids grow with posting time, so ascending id order announces the
//! oldest posting first and leaves the newest at the bottom of a chat.

use crate::models::Posting;

/// Sort key: numeric ids ascending, everything else after them.
fn rank(posting: &Posting) -> (bool, u128) {
    match posting.numeric_id() {
        Some(n) => (false, n),
        None => (true, 0),
    }
}

/// Order postings for notification.
///
/// Non-numeric ids keep their relative input order at the end.
pub fn order_for_notification(postings: &[Posting]) -> Vec<Posting> {
    let mut ordered = postings.to_vec();
    ordered.sort_by_key(rank);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawPosting;

    fn posting(id: &str) -> Posting {
        RawPosting {
            id: Some(id.to_string()),
            title: id.to_string(),
            ..RawPosting::default()
        }
        .normalize()
        .unwrap()
    }

    fn ids(postings: &[Posting]) -> Vec<&str> {
        postings.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_numeric_ascending() {
        let input = vec![posting("97010"), posting("2"), posting("97001")];
        assert_eq!(ids(&order_for_notification(&input)), vec!["2", "97001", "97010"]);
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        let input = vec![posting("10"), posting("9")];
        assert_eq!(ids(&order_for_notification(&input)), vec!["9", "10"]);
    }

    #[test]
    fn test_non_numeric_last_in_input_order() {
        let input = vec![
            posting("https://x.test/b"),
            posting("5"),
            posting("https://x.test/a"),
            posting("1"),
        ];
        assert_eq!(
            ids(&order_for_notification(&input)),
            vec!["1", "5", "https://x.test/b", "https://x.test/a"]
        );
    }

    #[test]
    fn test_empty() {
        assert!(order_for_notification(&[]).is_empty());
    }
}
