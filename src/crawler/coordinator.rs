//! Crawler coordinator - the breadth-first crawl loop
//!
//! Drives the frontier, fetches each page in turn, extracts what the page
//! offers, and folds per-page results into the crawl aggregates.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchResult};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::{count_keywords, extract_emails, parse_html, word_count};
use crate::crawler::{CrawlAggregates, CrawlRequest, CrawlResult, PageResult};
use crate::url::{extract_authority, seed_authorities};
use crate::ShadowError;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use url::Url;

/// Most emails kept on a single page result
const MAX_EMAILS_PER_PAGE: usize = 10;

/// Most emails kept in the crawl aggregate
const MAX_EMAILS_TOTAL: usize = 100;

/// Something that can run a crawl request to completion
///
/// The job orchestrator depends on this rather than on `Crawler` directly, so
/// execution failures can be exercised without a network.
#[async_trait]
pub trait CrawlExecutor: Send + Sync {
    async fn execute(&self, request: &CrawlRequest) -> crate::Result<CrawlResult>;
}

/// Bounded breadth-first web crawler
#[derive(Debug, Clone)]
pub struct Crawler {
    client: Client,
}

impl Crawler {
    /// Creates a crawler with an HTTP client built from configuration
    pub fn new(config: &CrawlerConfig) -> Result<Self, ShadowError> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Creates a crawler around an existing HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Runs a crawl to completion
    ///
    /// Per-page failures are recorded as `error` pages; this never fails as a whole.
    /// The request is expected to be validated already.
    pub async fn crawl(&self, request: &CrawlRequest) -> CrawlResult {
        let keywords = request.normalized_keywords();
        let root_authorities = seed_authorities(&request.seed_urls);
        let max_pages = request.max_pages as usize;

        tracing::info!(
            "Starting crawl: {} seed(s), budget {} page(s), same_domain_only={}",
            request.seed_urls.len(),
            max_pages,
            request.same_domain_only
        );

        let mut frontier = Frontier::new(max_pages);
        for seed in &request.seed_urls {
            frontier.seed(seed.as_str());
        }

        let mut pages = Vec::new();
        let mut discovered_links: HashSet<String> = HashSet::new();
        let mut discovered_emails: BTreeSet<String> = BTreeSet::new();

        while let Some(current_url) = frontier.next_url() {
            tracing::debug!("Fetching {}", current_url);

            let (final_url, status_code, body) = match fetch_url(&self.client, &current_url).await {
                FetchResult::Page {
                    final_url,
                    status_code,
                    body,
                } => (final_url, status_code, body),
                FetchResult::Failed { error } => {
                    tracing::warn!("Failed to fetch {}: {}", current_url, error);
                    pages.push(PageResult::unavailable(current_url));
                    continue;
                }
            };

            let parsed = parse_html(&body, &final_url);
            let emails = extract_emails(&parsed.text);
            discovered_emails.extend(emails.iter().cloned());

            let mut enqueued = 0;
            for link in &parsed.links {
                discovered_links.insert(link.clone());

                if request.same_domain_only && !in_scope(link, &root_authorities) {
                    continue;
                }

                if frontier.offer(link) {
                    enqueued += 1;
                }
            }

            tracing::debug!(
                "Page {} returned {} with {} link(s), {} enqueued",
                current_url,
                status_code,
                parsed.links.len(),
                enqueued
            );

            pages.push(PageResult::fetched(
                current_url,
                status_code,
                parsed.title,
                word_count(&parsed.text),
                emails.into_iter().take(MAX_EMAILS_PER_PAGE).collect(),
                count_keywords(&parsed.text, &keywords),
            ));
        }

        let mut keyword_totals: BTreeMap<String, usize> =
            keywords.iter().map(|k| (k.clone(), 0)).collect();
        for page in &pages {
            for (keyword, count) in &page.keyword_hits {
                *keyword_totals.entry(keyword.clone()).or_insert(0) += count;
            }
        }

        let aggregates = CrawlAggregates {
            pages_scraped: pages.len(),
            unique_links: discovered_links.len(),
            emails_found: discovered_emails.into_iter().take(MAX_EMAILS_TOTAL).collect(),
            keyword_totals,
        };

        tracing::info!(
            "Crawl finished: {} page(s) visited, {} unique link(s), {} email(s)",
            aggregates.pages_scraped,
            aggregates.unique_links,
            aggregates.emails_found.len()
        );

        CrawlResult::scraped(request.seed_urls.clone(), pages, aggregates)
    }
}

#[async_trait]
impl CrawlExecutor for Crawler {
    async fn execute(&self, request: &CrawlRequest) -> crate::Result<CrawlResult> {
        Ok(self.crawl(request).await)
    }
}

/// Returns true if `link` is on one of the seed authorities
fn in_scope(link: &str, root_authorities: &HashSet<String>) -> bool {
    Url::parse(link)
        .ok()
        .and_then(|url| extract_authority(&url))
        .map(|authority| root_authorities.contains(&authority))
        .unwrap_or(false)
}
