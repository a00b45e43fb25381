//! Utility functions and helpers.

pub mod cache;
pub mod fs;
pub mod http;
pub mod progress;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Normalize scraped text: newlines become spaces, surrounding whitespace is trimmed.
pub fn normalize_text(text: &str) -> String {
    text.replace('\r', "").replace('\n', " ").trim().to_string()
}
