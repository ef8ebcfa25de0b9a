//! Message bodies per destination.

use crate::models::Posting;
use crate::utils::{escape_attr, escape_html};

/// Width of the console separator line.
const RULE_WIDTH: usize = 60;

/// Telegram message in HTML parse mode.
pub fn telegram_html(posting: &Posting) -> String {
    format!(
        "📣 <b>{title}</b>\n\n\
         주최: {organizer}\n\
         상태: {days} • {status} • 조회 {views}\n\n\
         🔗 <a href=\"{url}\">공고 바로가기</a>",
        title = escape_html(&posting.title),
        organizer = escape_html(posting.organizer_label()),
        days = posting.days_label(),
        status = escape_html(posting.status_label()),
        views = posting.views_label(),
        url = escape_attr(&posting.url),
    )
}

/// Plain-text preview block.
pub fn console_text(posting: &Posting) -> String {
    format!(
        "[신규] {title}\n  • 주최: {organizer}\n  • 상태: {days} • {status} • 조회 {views}\n  • 링크: {url}\n{rule}",
        title = posting.title,
        organizer = posting.organizer_label(),
        days = posting.days_label(),
        status = posting.status_label(),
        views = posting.views_label(),
        url = posting.url,
        rule = "-".repeat(RULE_WIDTH),
    )
}
