//! Crawler module for bounded breadth-first crawls
//!
//! This module contains the crawl pipeline, including:
//! - Request validation and keyword normalization
//! - HTTP fetching with a fixed identity and timeout
//! - HTML parsing, text, email and link extraction
//! - The frontier and the crawl loop that drives it

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod request;

pub use coordinator::{CrawlExecutor, Crawler};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use frontier::Frontier;
pub use parser::{count_keywords, extract_emails, normalize_text, parse_html, ParsedPage};
pub use request::{CrawlRequest, SeedPolicy, MAX_KEYWORDS, MAX_PAGES, MAX_SEED_URLS, MIN_PAGES};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Outcome of visiting one URL: the HTTP status, or `error` when nothing came back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Http(u16),
    Error,
}

impl Serialize for PageStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Http(code) => serializer.serialize_u16(*code),
            Self::Error => serializer.serialize_str("error"),
        }
    }
}

impl<'de> Deserialize<'de> for PageStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u16),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Ok(Self::Http(code)),
            Repr::Text(text) if text == "error" => Ok(Self::Error),
            Repr::Text(other) => Err(serde::de::Error::custom(format!(
                "unknown page status '{}'",
                other
            ))),
        }
    }
}

/// One visited page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub status: PageStatus,
    pub title: String,
    pub word_count: usize,
    pub emails_found: Vec<String>,
    pub keyword_hits: BTreeMap<String, usize>,
}

impl PageResult {
    pub(crate) fn fetched(
        url: String,
        status_code: u16,
        title: String,
        word_count: usize,
        emails_found: Vec<String>,
        keyword_hits: BTreeMap<String, usize>,
    ) -> Self {
        Self {
            url,
            status: PageStatus::Http(status_code),
            title,
            word_count,
            emails_found,
            keyword_hits,
        }
    }

    /// Result for a URL whose fetch failed at the transport level
    pub(crate) fn unavailable(url: String) -> Self {
        Self {
            url,
            status: PageStatus::Error,
            title: "Unavailable".to_string(),
            word_count: 0,
            emails_found: Vec::new(),
            keyword_hits: BTreeMap::new(),
        }
    }
}

/// Totals across every page of a crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlAggregates {
    pub pages_scraped: usize,
    /// Distinct links seen on any page, followed or not
    pub unique_links: usize,
    pub emails_found: Vec<String>,
    /// Every requested keyword, including those matched zero times
    pub keyword_totals: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    Scraped,
}

/// Complete result of one crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub seed_urls: Vec<String>,
    /// Pages in visit order
    pub pages: Vec<PageResult>,
    pub aggregates: CrawlAggregates,
    pub status: CrawlStatus,
}

impl CrawlResult {
    pub(crate) fn scraped(
        seed_urls: Vec<String>,
        pages: Vec<PageResult>,
        aggregates: CrawlAggregates,
    ) -> Self {
        Self {
            seed_urls,
            pages,
            aggregates,
            status: CrawlStatus::Scraped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_status_serialization() {
        assert_eq!(serde_json::to_string(&PageStatus::Http(200)).unwrap(), "200");
        assert_eq!(serde_json::to_string(&PageStatus::Error).unwrap(), "\"error\"");
        assert_eq!(
            serde_json::from_str::<PageStatus>("\"error\"").unwrap(),
            PageStatus::Error
        );
        assert_eq!(
            serde_json::from_str::<PageStatus>("404").unwrap(),
            PageStatus::Http(404)
        );
        assert!(serde_json::from_str::<PageStatus>("\"ok\"").is_err());
    }

    #[test]
    fn test_unavailable_page_shape() {
        let page = PageResult::unavailable("https://down.example.com/".to_string());
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["title"], "Unavailable");
        assert_eq!(value["keyword_hits"], serde_json::json!({}));
    }
}
