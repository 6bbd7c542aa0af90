//! HTTP fetcher implementation
//!
//! Builds the crawler's HTTP client and turns a single GET into a `FetchResult`.
//! Transport failures never escape as errors; they come back as `FetchResult::Failed`.

use crate::config::CrawlerConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Most redirects followed for a single page
const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The server answered, whatever the status
    Page {
        /// Final URL after redirects
        final_url: Url,
        /// HTTP status code
        status_code: u16,
        /// Response body; empty for status codes of 400 and above
        body: String,
    },

    /// Network error (connection refused, timeout, body read failure, etc.)
    Failed {
        /// Error description
        error: String,
    },
}

/// Builds an HTTP client with the crawler's identity and limits
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use shadowgraph::config::CrawlerConfig;
/// use shadowgraph::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    Client::builder()
        .user_agent(config.user_agent())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL
///
/// | Condition | Result |
/// |-----------|--------|
/// | Status < 400 | `Page` with the body text |
/// | Status >= 400 | `Page` with an empty body |
/// | Timeout, connect error, redirect overflow | `Failed` |
/// | Body read failure | `Failed` |
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection refused".to_string()
            } else if e.is_redirect() {
                "Too many redirects".to_string()
            } else {
                e.to_string()
            };
            return FetchResult::Failed { error };
        }
    };

    let status_code = response.status().as_u16();
    let final_url = response.url().clone();

    if status_code >= 400 {
        return FetchResult::Page {
            final_url,
            status_code,
            body: String::new(),
        };
    }

    match response.text().await {
        Ok(body) => FetchResult::Page {
            final_url,
            status_code,
            body,
        },
        Err(e) => FetchResult::Failed {
            error: e.to_string(),
        },
    }
}
