//! HTML text helpers.

/// Escape text for use in HTML content and double-quoted attributes.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Text safe to embed inside an HTML comment.
pub(crate) fn comment_text(s: &str) -> String {
    s.replace("--", "- -")
}

/// Whether `url` points outside the site (has a scheme or is protocol-relative).
pub(crate) fn is_absolute_url(url: &str) -> bool {
    url.starts_with("//") || url.contains("://") || url.starts_with("mailto:")
}
