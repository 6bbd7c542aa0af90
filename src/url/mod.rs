//! URL handling module for ShadowGraph
//!
//! Seed validation and host-scope helpers shared by request validation and the
//! crawler's same-domain filter.

mod domain;

use crate::{UrlError, UrlResult};
use url::Url;

pub use domain::{extract_authority, seed_authorities};

/// Parses an absolute http/https URL that carries a host
///
/// Surrounding whitespace is ignored.
///
/// # Examples
///
/// ```
/// use shadowgraph::url::parse_http_url;
///
/// assert!(parse_http_url(" https://example.com/about ").is_ok());
/// assert!(parse_http_url("ftp://example.com/").is_err());
/// assert!(parse_http_url("/relative/path").is_err());
/// ```
pub fn parse_http_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingDomain),
    }
}
