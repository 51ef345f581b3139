use std::sync::OnceLock;

use regex::Regex;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*?>").expect("valid tag regex"))
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://\S+").expect("valid url regex"))
}

/// Normalizes scraped page text before it is sent to the model:
/// leftover markup and URLs are dropped, control characters removed,
/// and all whitespace runs collapsed to a single space.
pub fn clean_text(text: &str) -> String {
    let without_tags = tag_pattern().replace_all(text, " ");
    let without_urls = url_pattern().replace_all(&without_tags, " ");

    without_urls
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
