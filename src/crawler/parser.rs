//! HTML parser for extracting links, text and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from <a> tags)
//! - The normalized page title
//! - Visible body text, from which emails and keyword counts are derived

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// Longest title kept on a page result (in characters)
pub const MAX_TITLE_CHARS: usize = 180;

/// Title used when a page has none
pub const UNTITLED: &str = "Untitled";

/// Most distinct emails taken from a single page
pub const MAX_EMAILS_PER_PAGE_SCAN: usize = 50;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
});

/// Elements whose text is never part of the page body
const HIDDEN_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Whitespace-collapsed title, truncated, or `Untitled`
    pub title: String,

    /// Whitespace-collapsed visible text
    pub text: String,

    /// All links found on the page (absolute URLs, document order)
    pub links: Vec<String>,
}

/// Parses HTML content and extracts links, title and text
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
/// - Anything that does not resolve to http/https with a host
///
/// # Example
///
/// ```
/// use shadowgraph::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title> Test </title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        text: extract_text(&document),
        links: extract_links(&document, base_url),
    }
}

/// Collapses runs of whitespace to single spaces and trims the ends
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Counts whitespace-separated tokens
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Finds email addresses in text
///
/// Returns distinct matches in sorted order, at most `MAX_EMAILS_PER_PAGE_SCAN`.
pub fn extract_emails(text: &str) -> Vec<String> {
    EMAIL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(MAX_EMAILS_PER_PAGE_SCAN)
        .collect()
}

/// Counts non-overlapping, case-insensitive occurrences of each keyword
///
/// Keywords are expected to be lowercased already. Every keyword gets an entry,
/// including those with no matches.
pub fn count_keywords(text: &str, keywords: &[String]) -> BTreeMap<String, usize> {
    let lowered = text.to_lowercase();
    keywords
        .iter()
        .map(|keyword| (keyword.clone(), lowered.matches(keyword.as_str()).count()))
        .collect()
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    let title = Selector::parse("title").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .map(|element| normalize_text(&element.text().collect::<String>()))
    });

    match title {
        Some(title) if !title.is_empty() => title.chars().take(MAX_TITLE_CHARS).collect(),
        _ => UNTITLED.to_string(),
    }
}

/// Extracts visible text, skipping script, style and noscript content
fn extract_text(document: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|element| HIDDEN_ELEMENTS.contains(&element.name()))
                .unwrap_or(false)
        });

        if !hidden {
            parts.push(&**text);
        }
    }

    normalize_text(&parts.join(" "))
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    let http = absolute_url.scheme() == "http" || absolute_url.scheme() == "https";
    if http && absolute_url.host_str().is_some() {
        Some(absolute_url.to_string())
    } else {
        None
    }
}
