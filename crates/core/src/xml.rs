//! Overlay XML rendering.
//!
//! Output shape:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <i chatserver="chat.bilibili.com" ts="1700000000"><d p="12.35,1,25,FFFFFF,1700000000,0,,0">text</d></i>
//! ```
//!
//! Children keep catalog order. Output is a pure function of the comments and `ts`.

use std::borrow::Cow;
use std::fmt::Write;

use crate::Comment;

/// Origin marker carried on the root element.
pub const CHAT_SERVER: &str = "chat.bilibili.com";

/// Render comments into the overlay document.
pub fn render(comments: &[Comment], ts: i64) -> String {
    let mut out = String::with_capacity(96 + comments.len() * 96);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = write!(out, "<i chatserver=\"{CHAT_SERVER}\" ts=\"{ts}\">");

    for comment in comments {
        let _ = write!(
            out,
            "<d p=\"{}\">{}</d>",
            html_escape::encode_double_quoted_attribute(&attributes(comment, ts)),
            html_escape::encode_text(&xml_chars(&comment.text))
        );
    }

    out.push_str("</i>\n");
    out
}

/// The eight comma-joined fields of the `p` attribute.
fn attributes(comment: &Comment, ts: i64) -> String {
    format!(
        "{},{},{},{:06X},{},0,{},{}",
        format_time(comment.time),
        comment.mode,
        comment.size,
        comment.color,
        ts,
        xml_chars(&comment.user_id_hash),
        comment.id
    )
}

/// Drop code points XML 1.0 does not allow in a document.
fn xml_chars(s: &str) -> Cow<'_, str> {
    fn allowed(c: char) -> bool {
        matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
    }

    if s.chars().all(allowed) { Cow::Borrowed(s) } else { Cow::Owned(s.chars().filter(|&c| allowed(c)).collect()) }
}

/// Round to 2 decimals and print without trailing zeros (`3`, `12.5`, `7.25`).
fn format_time(time: f64) -> String {
    let rounded = (time * 100.0).round() / 100.0;
    if rounded == 0.0 {
        // collapses -0
        return "0".to_string();
    }
    format!("{rounded}")
}
